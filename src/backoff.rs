use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

// Exponents beyond this saturate at max_delay anyway.
const MAX_EXPONENT: u32 = 24;

/// Bounded exponential backoff parameters for a probing cycle.
///
/// `delay_for` is a pure function of the attempt index so schedules can be
/// asserted in tests without timing; jitter is sampled separately by the
/// caller through [`JitterMode::apply`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
            multiplier: multiplier.clamp(1.1, 10.0),
        }
    }

    /// Delay scheduled after the failed attempt at `attempt_index` (0-based):
    /// `min(base_delay * multiplier^attempt_index, max_delay)`.
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        let exponent = attempt_index.min(MAX_EXPONENT);
        let factor = self.multiplier.powi(exponent as i32);
        let secs = (self.base_delay.as_secs_f64() * factor).min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// Linear ramp used between business-request attempts:
    /// `base_delay * attempt_number`, capped at `max_delay`.
    pub fn linear_delay(&self, attempt_number: u32) -> Duration {
        self.base_delay
            .saturating_mul(attempt_number.max(1))
            .min(self.max_delay)
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JitterMode {
    #[default]
    None,
    Equal,
    Full,
}

impl JitterMode {
    pub fn apply(self, delay: Duration) -> Duration {
        match self {
            JitterMode::None => delay,
            JitterMode::Equal => jitter_between(delay.mul_f64(0.5), delay),
            JitterMode::Full => jitter_between(Duration::ZERO, delay),
        }
    }
}

pub fn jitter_between(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let mut rng = rand::thread_rng();
    let min_secs = min.as_secs_f64();
    let span = max.as_secs_f64() - min_secs;
    let sample = rng.gen::<f64>() * span + min_secs;
    Duration::from_secs_f64(sample)
}
