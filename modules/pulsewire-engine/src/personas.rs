//! Persona catalog: voice descriptors for the post composer.

use std::collections::HashMap;

use tokio::sync::RwLock;

/// Style used for personas the catalog has never seen.
pub const DEFAULT_STYLE: &str = "everyday voice, plain wording";

/// Append-only persona catalog. Sampling an unseen persona registers it with
/// the default style, so later draws of the same persona stay consistent for
/// the lifetime of the registry.
#[derive(Debug)]
pub struct PersonaRegistry {
    styles: RwLock<HashMap<String, String>>,
}

impl PersonaRegistry {
    /// Empty catalog. Every persona picks up the default style on first use.
    pub fn new() -> Self {
        Self {
            styles: RwLock::new(HashMap::new()),
        }
    }

    /// Catalog seeded with the stock personas.
    pub fn with_defaults() -> Self {
        let styles = HashMap::from([
            (
                "college student".to_string(),
                "casual slang, hashtags where they fit".to_string(),
            ),
            (
                "commuter".to_string(),
                "short and tidy, sparing with emoji".to_string(),
            ),
            (
                "street vendor".to_string(),
                "concrete on-the-ground detail, short sentences".to_string(),
            ),
            (
                "neighborhood rep".to_string(),
                "urges caution, practical guidance for neighbors".to_string(),
            ),
            (
                "reporter tone".to_string(),
                "clipped factual statements".to_string(),
            ),
            (
                "chronically online".to_string(),
                "vivid, a little exaggerated, heavy emoji".to_string(),
            ),
        ]);
        Self {
            styles: RwLock::new(styles),
        }
    }

    /// Catalog seeded with caller-provided styles. Still grows on unseen
    /// personas.
    pub fn from_styles(styles: HashMap<String, String>) -> Self {
        Self {
            styles: RwLock::new(styles),
        }
    }

    /// Style for `persona`, registering it with the default style first if
    /// the catalog has never seen it.
    pub async fn style_for(&self, persona: &str) -> String {
        {
            let styles = self.styles.read().await;
            if let Some(style) = styles.get(persona) {
                return style.clone();
            }
        }

        let mut styles = self.styles.write().await;
        styles
            .entry(persona.to_string())
            .or_insert_with(|| DEFAULT_STYLE.to_string())
            .clone()
    }

    pub async fn contains(&self, persona: &str) -> bool {
        self.styles.read().await.contains_key(persona)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unseen_persona_registers_with_the_default_style() {
        let registry = PersonaRegistry::new();
        assert!(!registry.contains("night owl").await);

        let style = registry.style_for("night owl").await;

        assert_eq!(style, DEFAULT_STYLE);
        assert!(registry.contains("night owl").await);
    }

    #[tokio::test]
    async fn registered_persona_keeps_its_style_across_calls() {
        let registry = PersonaRegistry::from_styles(HashMap::from([(
            "skeptic".to_string(),
            "doubts everything, asks questions".to_string(),
        )]));

        for _ in 0..3 {
            let style = registry.style_for("skeptic").await;
            assert_eq!(style, "doubts everything, asks questions");
        }
    }

    #[tokio::test]
    async fn stock_catalog_carries_the_six_default_personas() {
        let registry = PersonaRegistry::with_defaults();

        for persona in [
            "college student",
            "commuter",
            "street vendor",
            "neighborhood rep",
            "reporter tone",
            "chronically online",
        ] {
            assert!(registry.contains(persona).await, "missing {persona}");
        }
    }

    #[tokio::test]
    async fn concurrent_first_touch_registers_once() {
        let registry = PersonaRegistry::new();

        let (first, second) =
            tokio::join!(registry.style_for("new voice"), registry.style_for("new voice"));

        assert_eq!(first, DEFAULT_STYLE);
        assert_eq!(second, DEFAULT_STYLE);
        assert!(registry.contains("new voice").await);
    }
}
