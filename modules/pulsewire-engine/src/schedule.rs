//! Emission pacing as a Poisson point process.

use rand::Rng;

/// Floor on the mean wait so degenerate window parameters cannot collapse the
/// rate computation.
const MIN_MEAN_SECS: f64 = 0.001;

/// How a generation job spreads its emissions over time. The two modes are
/// mutually exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pacing {
    /// Target emission rate in posts per minute. Must be positive; the
    /// config layer only selects this mode for rates above zero.
    Rate(f64),
    /// Spread the whole job across a window of this many minutes.
    Window(f64),
}

/// Exponential inter-arrival sampler for one job.
#[derive(Debug, Clone, Copy)]
pub struct PointProcess {
    lambda: f64,
}

impl PointProcess {
    /// Pacing resolved against the job size. Window mode needs the count to
    /// compute its mean wait; rate mode ignores it.
    pub fn for_job(pacing: Pacing, count: usize) -> Self {
        match pacing {
            Pacing::Rate(per_minute) => Self::with_mean_secs(60.0 / per_minute),
            Pacing::Window(minutes) => Self::with_mean_secs(minutes * 60.0 / count.max(1) as f64),
        }
    }

    fn with_mean_secs(mean: f64) -> Self {
        Self {
            lambda: 1.0 / mean.max(MIN_MEAN_SECS),
        }
    }

    /// One exponential wait in seconds. Inverse CDF over a uniform draw;
    /// `1 - u` stays in (0, 1], so the result is finite and non-negative.
    pub fn sample_wait<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let u: f64 = rng.random();
        -(1.0 - u).ln() / self.lambda
    }

    /// Independent waits for `count` emissions. Zero count, zero waits.
    pub fn draw_waits<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<f64> {
        (0..count).map(|_| self.sample_wait(rng)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn mean_of(waits: &[f64]) -> f64 {
        waits.iter().sum::<f64>() / waits.len() as f64
    }

    #[test]
    fn rate_mode_mean_wait_tracks_sixty_over_rate() {
        // 30 posts per minute means a 2s mean wait.
        let process = PointProcess::for_job(Pacing::Rate(30.0), 0);
        let mut rng = StdRng::seed_from_u64(17);

        let mean = mean_of(&process.draw_waits(20_000, &mut rng));

        assert!((mean - 2.0).abs() < 0.1, "mean wait {mean}, wanted ~2.0");
    }

    #[test]
    fn window_mode_mean_wait_tracks_window_over_count() {
        // 2 minutes across 60 posts also means a 2s mean wait.
        let process = PointProcess::for_job(Pacing::Window(2.0), 60);
        let mut rng = StdRng::seed_from_u64(23);

        let mean = mean_of(&process.draw_waits(20_000, &mut rng));

        assert!((mean - 2.0).abs() < 0.1, "mean wait {mean}, wanted ~2.0");
    }

    #[test]
    fn zero_count_job_draws_no_waits() {
        let process = PointProcess::for_job(Pacing::Window(20.0), 0);
        let mut rng = StdRng::seed_from_u64(5);

        assert!(process.draw_waits(0, &mut rng).is_empty());
    }

    #[test]
    fn waits_are_finite_and_non_negative() {
        let process = PointProcess::for_job(Pacing::Rate(120.0), 0);
        let mut rng = StdRng::seed_from_u64(99);

        for wait in process.draw_waits(5_000, &mut rng) {
            assert!(wait >= 0.0, "negative wait {wait}");
            assert!(wait.is_finite(), "non-finite wait {wait}");
        }
    }

    #[test]
    fn degenerate_window_still_produces_finite_waits() {
        let process = PointProcess::for_job(Pacing::Window(0.0), 10);
        let mut rng = StdRng::seed_from_u64(31);

        for wait in process.draw_waits(100, &mut rng) {
            assert!(wait.is_finite() && wait >= 0.0);
        }
    }

    #[test]
    fn window_mode_survives_a_zero_count() {
        let process = PointProcess::for_job(Pacing::Window(1.0), 0);
        let mut rng = StdRng::seed_from_u64(13);

        assert!(process.sample_wait(&mut rng).is_finite());
    }
}
