//! Weighted label sampling for personas and languages.

use std::collections::HashMap;

use rand::Rng;

use pulsewire_common::PulseWireError;

/// Immutable weighted distribution over string labels.
///
/// Weights are clamped at zero and normalized once at construction. When the
/// clamped total is zero the distribution degrades to uniform rather than
/// failing. Entries are ordered by label so a seeded RNG draws the same
/// sequence every run.
#[derive(Debug, Clone)]
pub struct WeightedSampler {
    entries: Vec<(String, f64)>,
}

impl WeightedSampler {
    pub fn new(weights: &HashMap<String, f64>) -> Result<Self, PulseWireError> {
        if weights.is_empty() {
            return Err(PulseWireError::InvalidDistribution(
                "weight map is empty".to_string(),
            ));
        }

        let mut entries: Vec<(String, f64)> = weights
            .iter()
            .map(|(label, weight)| {
                let clamped = if weight.is_finite() && *weight > 0.0 {
                    *weight
                } else {
                    0.0
                };
                (label.clone(), clamped)
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let total: f64 = entries.iter().map(|(_, weight)| weight).sum();
        if total <= 0.0 {
            let uniform = 1.0 / entries.len() as f64;
            for entry in &mut entries {
                entry.1 = uniform;
            }
        } else {
            for entry in &mut entries {
                entry.1 /= total;
            }
        }

        Ok(Self { entries })
    }

    /// Draw one label. A cumulative scan over the normalized weights; the
    /// last label absorbs any floating-point shortfall.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        let roll: f64 = rng.random();
        let mut cumulative = 0.0;
        for (label, weight) in &self.entries {
            cumulative += weight;
            if roll <= cumulative {
                return label;
            }
        }
        self.entries
            .last()
            .map(|(label, _)| label.as_str())
            .unwrap_or_default()
    }
}
