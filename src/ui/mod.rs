pub mod frequency_grid;
pub mod scale;

pub use frequency_grid::{FrequencyGrid, GridLine};
pub use scale::{Bounds, Bounds2D, LinearScale, LogScale, Scale};
