use crate::error::{check_sample_rate, check_time_constant, Result};
use libm::{expf, logf};

/// Asymmetric attack/release follower
///
/// Time constants are in milliseconds and describe how long the follower takes
/// to get within 1% of a new target. The coefficients depend on how often
/// `process` is called, so callers that smooth once per FFT frame pass the
/// frame rate rather than the audio sample rate.
#[derive(Debug, Clone)]
pub struct EnvelopeWalker {
    attack_ms: f32,
    release_ms: f32,
    sample_rate: f32,
    attack_coeff: f32,
    release_coeff: f32,
    current: f32,
}

impl EnvelopeWalker {
    pub fn new(attack_ms: f32, release_ms: f32, sample_rate: f32) -> Result<Self> {
        let mut walker = Self {
            attack_ms: check_time_constant(attack_ms)?,
            release_ms: check_time_constant(release_ms)?,
            sample_rate: check_sample_rate(sample_rate)?,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            current: 0.0,
        };
        walker.recalculate();
        Ok(walker)
    }

    pub fn set_attack_speed(&mut self, attack_ms: f32) -> Result<()> {
        self.attack_ms = check_time_constant(attack_ms)?;
        self.attack_coeff = Self::calculate_coeff(self.attack_ms, self.sample_rate);
        Ok(())
    }

    pub fn set_release_speed(&mut self, release_ms: f32) -> Result<()> {
        self.release_ms = check_time_constant(release_ms)?;
        self.release_coeff = Self::calculate_coeff(self.release_ms, self.sample_rate);
        Ok(())
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) -> Result<()> {
        self.sample_rate = check_sample_rate(sample_rate)?;
        self.recalculate();
        Ok(())
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn attack_coeff(&self) -> f32 {
        self.attack_coeff
    }

    pub fn release_coeff(&self) -> f32 {
        self.release_coeff
    }

    pub fn current_value(&self) -> f32 {
        self.current
    }

    pub fn reset(&mut self) {
        self.current = 0.0;
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        Self::static_process(input, &mut self.current, self.attack_coeff, self.release_coeff)
    }

    /// Stateless step: moves `state` towards `input` and returns the new value
    #[inline]
    pub fn static_process(input: f32, state: &mut f32, attack_coeff: f32, release_coeff: f32) -> f32 {
        let coeff = if input > *state {
            attack_coeff
        } else {
            release_coeff
        };
        *state = coeff * (*state - input) + input;
        *state
    }

    /// Converts a time constant to a per-step retention coefficient
    ///
    /// 0.0 follows the input instantly, 1.0 never moves. Infinite time
    /// constants give exactly 1.0.
    pub fn calculate_coeff(time_ms: f32, rate: f32) -> f32 {
        if time_ms <= 0.0 || rate <= 0.0 {
            return 0.0;
        }
        if time_ms.is_infinite() {
            return 1.0;
        }

        let steps = time_ms * 0.001 * rate;
        expf(logf(0.01) / steps)
    }

    fn recalculate(&mut self) {
        self.attack_coeff = Self::calculate_coeff(self.attack_ms, self.sample_rate);
        self.release_coeff = Self::calculate_coeff(self.release_ms, self.sample_rate);
    }
}
