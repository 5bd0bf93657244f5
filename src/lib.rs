//! Real-time spectrum and stereo image analysis
//!
//! The audio thread owns an [`AnalyserProcessor`], which turns host audio
//! into smoothed magnitude spectra and goniometer point segments. Finished
//! results cross to the render thread through lock-free handoffs
//! ([`AnalyserHandles`]), where a [`FrequencyGrid`] places them on screen.

pub mod audio;
pub mod config;
pub mod error;
pub mod ui;

pub use audio::{AnalyserHandles, AnalyserProcessor};
pub use config::{AnalyserConfig, GoniometerConfig, GridConfig, SpectrumConfig, SpectrumSpeed};
pub use error::{ConfigError, Result};
pub use ui::FrequencyGrid;
