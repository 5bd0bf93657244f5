use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Closed axis range in value space (Hz or dB)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub low: f32,
    pub high: f32,
}

impl Bounds {
    pub const fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }

    pub fn span(&self) -> f32 {
        self.high - self.low
    }

    /// Inclusive on both ends
    pub fn contains(&self, value: f32) -> bool {
        value >= self.low && value <= self.high
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.low, self.high)
    }

    /// Finite and strictly increasing
    pub fn validate(&self) -> Result<()> {
        if self.low.is_finite() && self.high.is_finite() && self.low < self.high {
            Ok(())
        } else {
            Err(self.invalid())
        }
    }

    /// As `validate`, and the low end must be positive for a log axis
    pub fn validate_log(&self) -> Result<()> {
        self.validate()?;
        if self.low > 0.0 {
            Ok(())
        } else {
            Err(self.invalid())
        }
    }

    fn invalid(&self) -> ConfigError {
        ConfigError::InvalidBounds {
            low: self.low,
            high: self.high,
        }
    }
}

/// Frequency range on x, magnitude range on y
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds2D {
    pub x: Bounds,
    pub y: Bounds,
}

/// Maps axis values onto `[0, extent - 1]` pixels and back
pub trait Scale {
    fn scale(&self, extent: usize, bounds: Bounds, value: f32, clamp: bool) -> f32;
    fn unscale(&self, extent: usize, bounds: Bounds, pixel: f32, clamp: bool) -> f32;
}

fn pixel_span(extent: usize) -> f32 {
    extent.saturating_sub(1) as f32
}

fn clamp_pixel(extent: usize, pixel: f32, clamp: bool) -> f32 {
    if clamp {
        pixel.clamp(0.0, pixel_span(extent))
    } else {
        pixel
    }
}

/// Linear axis, used for dB which is already logarithmic
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearScale;

impl Scale for LinearScale {
    fn scale(&self, extent: usize, bounds: Bounds, value: f32, clamp: bool) -> f32 {
        let value = if clamp { bounds.clamp(value) } else { value };
        (value - bounds.low) / bounds.span() * pixel_span(extent)
    }

    fn unscale(&self, extent: usize, bounds: Bounds, pixel: f32, clamp: bool) -> f32 {
        let span = pixel_span(extent);
        if span == 0.0 {
            return bounds.low;
        }
        let pixel = clamp_pixel(extent, pixel, clamp);
        bounds.low + pixel / span * bounds.span()
    }
}

/// Logarithmic axis for frequency, equal distance per octave
#[derive(Debug, Clone, Copy, Default)]
pub struct LogScale;

impl Scale for LogScale {
    fn scale(&self, extent: usize, bounds: Bounds, value: f32, clamp: bool) -> f32 {
        let value = if clamp { bounds.clamp(value) } else { value };
        let octaves = (value / bounds.low).log2();
        let range = (bounds.high / bounds.low).log2();
        octaves / range * pixel_span(extent)
    }

    fn unscale(&self, extent: usize, bounds: Bounds, pixel: f32, clamp: bool) -> f32 {
        let span = pixel_span(extent);
        if span == 0.0 {
            return bounds.low;
        }
        let pixel = clamp_pixel(extent, pixel, clamp);
        bounds.low * (bounds.high / bounds.low).powf(pixel / span)
    }
}
