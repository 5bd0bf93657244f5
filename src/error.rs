use thiserror::Error;

/// Configuration contract violations
///
/// Raised by constructors and reconfiguration calls only. The audio-thread
/// entry points never return errors: a frame is either complete or absent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("transform length {0} is not a power of two >= 2")]
    NotPowerOfTwo(usize),

    #[error("sample rate {0} must be finite and positive")]
    InvalidSampleRate(f32),

    #[error("bin count must be non-zero")]
    ZeroBinCount,

    #[error("channel count must be non-zero")]
    ZeroChannels,

    #[error("window length must be non-zero")]
    EmptyWindow,

    #[error("segment length must be non-zero")]
    ZeroSegmentLength,

    #[error("invalid axis bounds [{low}, {high}]")]
    InvalidBounds { low: f32, high: f32 },

    #[error("time constant {0} ms must not be negative or NaN")]
    InvalidTimeConstant(f32),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Reject zero, negative and non-finite sample rates
pub(crate) fn check_sample_rate(sample_rate: f32) -> Result<f32> {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        Ok(sample_rate)
    } else {
        Err(ConfigError::InvalidSampleRate(sample_rate))
    }
}

/// Time constants may be zero (instant) or infinite (hold), never negative
pub(crate) fn check_time_constant(time_ms: f32) -> Result<f32> {
    if time_ms.is_nan() || time_ms < 0.0 {
        Err(ConfigError::InvalidTimeConstant(time_ms))
    } else {
        Ok(time_ms)
    }
}
