//! Analyser configuration
//!
//! Everything here is supplied by the host (sample rate, channel layout,
//! display geometry) or by the user's display preferences. Values are
//! validated once, before any audio-thread state is built from them.

use serde::{Deserialize, Serialize};

use crate::audio::window_functions::{SymmetryMode, WindowShape};
use crate::error::{check_sample_rate, check_time_constant, ConfigError, Result};
use crate::ui::scale::{Bounds, Bounds2D};

/// Default FFT size, 46.9Hz resolution at 48kHz
pub const DEFAULT_FFT_SIZE: usize = 1024;
pub const DEFAULT_SAMPLE_RATE: f32 = 48000.0;
pub const DEFAULT_SEGMENT_LENGTH: usize = 512;

/// Spectrum analyser speed presets for temporal smoothing
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum SpectrumSpeed {
    VerySlow,
    Slow,
    #[default]
    Medium,
    Fast,
    VeryFast,
    /// Bins rise with the signal and never fall
    PeakHold,
    Custom {
        attack_ms: f32,
        release_ms: f32,
    },
}

impl SpectrumSpeed {
    /// Get attack and release time constants in milliseconds
    pub fn time_constants_ms(&self) -> (f32, f32) {
        match *self {
            Self::VerySlow => (100.0, 2000.0), // Very slow, smooth display
            Self::Slow => (50.0, 1000.0),      // Slow, good for overall monitoring
            Self::Medium => (20.0, 400.0),     // Medium, balanced response
            Self::Fast => (5.0, 100.0),        // Fast, good for transients
            Self::VeryFast => (1.0, 20.0),     // Very fast, immediate response
            Self::PeakHold => (0.0, f32::INFINITY),
            Self::Custom {
                attack_ms,
                release_ms,
            } => (attack_ms, release_ms),
        }
    }
}

/// Spectrum analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    /// Power of two, at least 2
    pub fft_size: usize,
    pub window: WindowShape,
    pub symmetry: SymmetryMode,
    pub speed: SpectrumSpeed,
    /// Tag carried on every snapshot so several analysers can share a display
    pub stream_index: usize,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            fft_size: DEFAULT_FFT_SIZE,
            window: WindowShape::BlackmanHarris,
            symmetry: SymmetryMode::Symmetric,
            speed: SpectrumSpeed::default(),
            stream_index: 0,
        }
    }
}

/// Stereo image (goniometer) settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoniometerConfig {
    /// Points per published segment
    pub segment_length: usize,
    /// Auto-gain envelope attack, milliseconds
    pub attack_ms: f32,
    /// Auto-gain envelope release, milliseconds
    pub release_ms: f32,
}

impl Default for GoniometerConfig {
    fn default() -> Self {
        Self {
            segment_length: DEFAULT_SEGMENT_LENGTH,
            attack_ms: 0.01,
            release_ms: 5000.0,
        }
    }
}

/// Spectrum display geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Unzoomed axis range: Hz on x, dB on y
    pub full_bounds: Bounds2D,
    pub width: usize,
    pub height: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            full_bounds: Bounds2D {
                x: Bounds::new(20.0, 20000.0),
                y: Bounds::new(-60.0, 0.0),
            },
            width: 800,
            height: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyserConfig {
    pub sample_rate: f32,
    pub channel_count: usize,
    pub spectrum: SpectrumConfig,
    pub goniometer: GoniometerConfig,
    pub grid: GridConfig,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channel_count: 2,
            spectrum: SpectrumConfig::default(),
            goniometer: GoniometerConfig::default(),
            grid: GridConfig::default(),
        }
    }
}

impl AnalyserConfig {
    /// Check every construction-time contract up front
    pub fn validate(&self) -> Result<()> {
        check_sample_rate(self.sample_rate)?;
        if self.channel_count == 0 {
            return Err(ConfigError::ZeroChannels);
        }

        let fft_size = self.spectrum.fft_size;
        if fft_size < 2 || !fft_size.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo(fft_size));
        }
        let (attack_ms, release_ms) = self.spectrum.speed.time_constants_ms();
        check_time_constant(attack_ms)?;
        check_time_constant(release_ms)?;

        if self.goniometer.segment_length == 0 {
            return Err(ConfigError::ZeroSegmentLength);
        }
        check_time_constant(self.goniometer.attack_ms)?;
        check_time_constant(self.goniometer.release_ms)?;

        self.grid.full_bounds.x.validate_log()?;
        self.grid.full_bounds.y.validate()?;
        Ok(())
    }
}
