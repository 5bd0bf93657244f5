pub mod constants;
pub mod coord;
pub mod envelope;
pub mod fft_engine;
pub mod handoff;
pub mod processor;
pub mod spectrum;
pub mod stereo_image;
pub mod window_functions;

pub use envelope::EnvelopeWalker;
pub use fft_engine::WindowedFft;
pub use processor::{AnalyserHandles, AnalyserProcessor};
pub use spectrum::{SpectrumAggregator, SpectrumFrame, SpectrumSnapshot};
pub use stereo_image::{PolarSegment, ScaleReadout, StereoImageCalculator};
pub use window_functions::{SymmetryMode, WindowFunction, WindowShape};
