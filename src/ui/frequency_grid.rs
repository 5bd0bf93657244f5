use crate::audio::constants::{self, FREQUENCY_MARKERS};
use crate::config::GridConfig;
use crate::error::{check_sample_rate, ConfigError, Result};
use crate::ui::scale::{Bounds2D, LinearScale, LogScale, Scale};

/// One labelled gridline
#[derive(Debug, Clone, PartialEq)]
pub struct GridLine {
    /// Pixel x for frequency lines, pixel y for magnitude lines
    pub location: f32,
    /// Hz or dB
    pub value: f32,
    pub label: String,
}

/// Upper limit on cached slots, enough for 384 kHz material
const MAX_CACHE_SLOTS: usize = 384_000;

/// Frequency to x-pixel lookup, one slot per whole Hz up to the sample rate
/// (at most [`MAX_CACHE_SLOTS`], higher frequencies are computed directly)
///
/// Filled lazily and thrown away as a whole whenever the sample rate, the
/// width or the visible frequency range changes.
#[derive(Debug, Default)]
struct FrequencyCache {
    slots: Vec<f32>,
    generation: u64,
}

impl FrequencyCache {
    fn rebuild(&mut self, sample_rate: f32) {
        self.slots.clear();
        let slots = (sample_rate.ceil() as usize).min(MAX_CACHE_SLOTS);
        self.slots.resize(slots, f32::NAN);
        self.generation += 1;
    }
}

/// Maps spectrum data onto a pixel grid with a log frequency axis and a
/// linear dB axis, and keeps the gridlines for the current view
///
/// Lives on the render thread. `bounds` is the current (possibly zoomed)
/// view, `full_bounds` the unzoomed range used for absolute readouts.
#[derive(Debug)]
pub struct FrequencyGrid {
    freq_scale: LogScale,
    magnitude_scale: LinearScale,
    bounds: Bounds2D,
    full_bounds: Bounds2D,
    freq_cache: FrequencyCache,
    sample_rate: f32,
    bin_count: usize,
    width: usize,
    height: usize,
    freq_lines: Vec<GridLine>,
    magnitude_lines: Vec<GridLine>,
    grid_generation: u64,
}

impl FrequencyGrid {
    pub fn new(
        full_bounds: Bounds2D,
        sample_rate: f32,
        bin_count: usize,
        width: usize,
        height: usize,
    ) -> Result<Self> {
        validate_bounds(&full_bounds)?;
        check_sample_rate(sample_rate)?;
        if bin_count == 0 {
            return Err(ConfigError::ZeroBinCount);
        }

        let mut grid = Self {
            freq_scale: LogScale,
            magnitude_scale: LinearScale,
            bounds: full_bounds,
            full_bounds,
            freq_cache: FrequencyCache::default(),
            sample_rate,
            bin_count,
            width,
            height,
            freq_lines: Vec::new(),
            magnitude_lines: Vec::new(),
            grid_generation: 0,
        };
        grid.freq_cache.rebuild(sample_rate);
        grid.regenerate_grid();

        log::info!(
            "Frequency grid {}x{}, {:.0}-{:.0} Hz, {:.0}..{:.0} dB",
            width,
            height,
            full_bounds.x.low,
            full_bounds.x.high,
            full_bounds.y.low,
            full_bounds.y.high
        );
        Ok(grid)
    }

    pub fn from_config(config: &GridConfig, sample_rate: f32, bin_count: usize) -> Result<Self> {
        Self::new(
            config.full_bounds,
            sample_rate,
            bin_count,
            config.width,
            config.height,
        )
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    pub fn bounds(&self) -> Bounds2D {
        self.bounds
    }

    pub fn full_bounds(&self) -> Bounds2D {
        self.full_bounds
    }

    pub fn freq_lines(&self) -> &[GridLine] {
        &self.freq_lines
    }

    pub fn magnitude_lines(&self) -> &[GridLine] {
        &self.magnitude_lines
    }

    /// Bumped every time the gridlines are regenerated
    pub fn grid_generation(&self) -> u64 {
        self.grid_generation
    }

    /// Bumped every time the frequency cache is thrown away
    pub fn cache_generation(&self) -> u64 {
        self.freq_cache.generation
    }

    /// Returns `true` if the size changed
    pub fn update_size(&mut self, width: usize, height: usize) -> bool {
        if width == self.width && height == self.height {
            return false;
        }

        self.width = width;
        self.height = height;
        self.freq_cache.rebuild(self.sample_rate);
        self.regenerate_grid();
        log::debug!("Frequency grid resized to {}x{}", width, height);
        true
    }

    /// Returns `true` if the sample rate changed
    pub fn update_sample_rate(&mut self, sample_rate: f32) -> Result<bool> {
        check_sample_rate(sample_rate)?;
        if sample_rate == self.sample_rate {
            return Ok(false);
        }

        self.sample_rate = sample_rate;
        self.freq_cache.rebuild(sample_rate);
        log::debug!("Frequency grid sample rate {} Hz", sample_rate);
        Ok(true)
    }

    /// Replace the visible bounds; returns `true` if they changed
    pub fn update_bounds(&mut self, bounds: Bounds2D) -> Result<bool> {
        validate_bounds(&bounds)?;
        if bounds == self.bounds {
            return Ok(false);
        }

        self.bounds = bounds;
        self.freq_cache.rebuild(self.sample_rate);
        self.regenerate_grid();
        log::debug!(
            "Frequency grid view {:.0}-{:.0} Hz, {:.0}..{:.0} dB",
            bounds.x.low,
            bounds.x.high,
            bounds.y.low,
            bounds.y.high
        );
        Ok(true)
    }

    /// Returns `true` if the bin count changed
    pub fn update_bin_count(&mut self, bin_count: usize) -> Result<bool> {
        if bin_count == 0 {
            return Err(ConfigError::ZeroBinCount);
        }
        if bin_count == self.bin_count {
            return Ok(false);
        }
        self.bin_count = bin_count;
        Ok(true)
    }

    pub fn is_frequency_visible(&self, freq: f32) -> bool {
        self.bounds.x.contains(freq)
    }

    /// Centre frequency of a (possibly fractional) bin
    ///
    /// The transform length is twice the half-spectrum bin count.
    pub fn bin_index_to_frequency(&self, bin: f32) -> f32 {
        bin * self.sample_rate / (self.bin_count * 2) as f32
    }

    pub fn bin_to_pixel(&mut self, bin: f32) -> f32 {
        self.freq_to_pixel(self.bin_index_to_frequency(bin))
    }

    /// X pixel for a frequency in the current view
    ///
    /// Frequencies inside the cache share the slot of their whole-Hz value.
    pub fn freq_to_pixel(&mut self, freq: f32) -> f32 {
        if freq >= 0.0 {
            let key = freq as usize;
            if let Some(slot) = self.freq_cache.slots.get_mut(key) {
                if slot.is_nan() {
                    *slot = self
                        .freq_scale
                        .scale(self.width, self.bounds.x, key as f32, true);
                }
                return *slot;
            }
        }

        self.freq_scale.scale(self.width, self.bounds.x, freq, true)
    }

    pub fn pixel_to_freq(&self, x: f32) -> f32 {
        self.freq_scale.unscale(self.width, self.bounds.x, x, true)
    }

    /// Y pixel for a dB value, 0 at the top
    pub fn db_to_pixel(&self, db: f32) -> f32 {
        self.bottom() - self.magnitude_scale.scale(self.height, self.bounds.y, db, true)
    }

    /// Y pixel for a linear amplitude, such as a snapshot bin
    pub fn magnitude_to_pixel(&self, magnitude: f32) -> f32 {
        self.db_to_pixel(constants::gain_to_db(magnitude))
    }

    pub fn pixel_to_db(&self, y: f32) -> f32 {
        self.magnitude_scale
            .unscale(self.height, self.bounds.y, self.bottom() - y, true)
    }

    /// dB under a pixel in the unzoomed view, for absolute readouts
    pub fn full_scale_pixel_to_db(&self, y: f32) -> f32 {
        self.magnitude_scale
            .unscale(self.height, self.full_bounds.y, self.bottom() - y, true)
    }

    /// Frequency under a pixel in the unzoomed view, for absolute readouts
    pub fn full_scale_pixel_to_freq(&self, x: f32) -> f32 {
        self.freq_scale
            .unscale(self.width, self.full_bounds.x, x, true)
    }

    pub fn freq_label(freq: f32) -> String {
        let hz = freq as i32;
        if hz >= 1000 {
            format!("{}k", hz / 1000)
        } else {
            format!("{}", hz)
        }
    }

    pub fn db_label(db: f32) -> String {
        format!("{:+}", db as i32)
    }

    fn bottom(&self) -> f32 {
        self.height.saturating_sub(1) as f32
    }

    fn regenerate_grid(&mut self) {
        self.freq_lines.clear();
        self.magnitude_lines.clear();

        for freq in FREQUENCY_MARKERS {
            if self.is_frequency_visible(freq) {
                let location = self.freq_to_pixel(freq);
                self.freq_lines.push(GridLine {
                    location,
                    value: freq,
                    label: Self::freq_label(freq),
                });
            }
        }

        let y = self.bounds.y;
        let step = constants::db_grid_step(y.low, y.high);
        let mut db = y.low.ceil();
        while db <= y.high {
            self.magnitude_lines.push(GridLine {
                location: self.db_to_pixel(db),
                value: db,
                label: Self::db_label(db),
            });
            db += step;
        }

        self.grid_generation += 1;
    }
}

fn validate_bounds(bounds: &Bounds2D) -> Result<()> {
    bounds.x.validate_log()?;
    bounds.y.validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::scale::Bounds;

    fn full() -> Bounds2D {
        Bounds2D {
            x: Bounds::new(20.0, 20000.0),
            y: Bounds::new(-60.0, 0.0),
        }
    }

    fn grid() -> FrequencyGrid {
        FrequencyGrid::new(full(), 48000.0, 512, 800, 600).unwrap()
    }

    #[test]
    fn rejects_invalid_construction() {
        assert_eq!(
            FrequencyGrid::new(full(), 48000.0, 0, 800, 600).unwrap_err(),
            ConfigError::ZeroBinCount
        );
        assert!(FrequencyGrid::new(full(), 0.0, 512, 800, 600).is_err());
        let mut bad = full();
        bad.x.low = 0.0;
        assert!(FrequencyGrid::new(bad, 48000.0, 512, 800, 600).is_err());
    }

    #[test]
    fn bin_index_uses_twice_the_bin_count() {
        let grid = grid();
        assert_eq!(grid.bin_index_to_frequency(0.0), 0.0);
        assert!((grid.bin_index_to_frequency(1.0) - 46.875).abs() < 1e-4);
        assert!((grid.bin_index_to_frequency(512.0) - 24000.0).abs() < 1e-2);
    }

    #[test]
    fn frequency_axis_is_monotonic() {
        let mut grid = grid();
        let mut previous = f32::NEG_INFINITY;
        let mut freq = 20.0;
        while freq <= 20000.0 {
            let x = grid.freq_to_pixel(freq);
            assert!(x >= previous, "{} Hz went backwards", freq);
            previous = x;
            freq *= 1.01;
        }
        assert_eq!(grid.freq_to_pixel(20.0), 0.0);
        assert!((grid.freq_to_pixel(20000.0) - 799.0).abs() < 1e-2);
        // Below the view clamps to the left edge
        assert_eq!(grid.freq_to_pixel(5.0), 0.0);
    }

    #[test]
    fn cached_lookup_matches_direct_scale() {
        let mut grid = grid();
        let first = grid.freq_to_pixel(1000.0);
        let second = grid.freq_to_pixel(1000.0);
        assert_eq!(first, second);
        let direct = LogScale.scale(800, full().x, 1000.0, true);
        assert_eq!(first, direct);
        // Above the cache range the scale is evaluated directly
        assert_eq!(grid.freq_to_pixel(60000.0), 799.0);
    }

    #[test]
    fn db_round_trip_and_orientation() {
        let grid = grid();
        assert_eq!(grid.db_to_pixel(0.0), 0.0);
        assert_eq!(grid.db_to_pixel(-60.0), 599.0);
        for db in [-60.0, -45.5, -12.0, -0.25, 0.0] {
            let y = grid.db_to_pixel(db);
            assert!((grid.pixel_to_db(y) - db).abs() < 1e-3, "{} dB", db);
        }
        assert_eq!(grid.magnitude_to_pixel(1.0), 0.0);
    }

    #[test]
    fn full_scale_readouts_ignore_zoom() {
        let mut grid = grid();
        let zoomed = Bounds2D {
            x: Bounds::new(100.0, 1000.0),
            y: Bounds::new(-20.0, 0.0),
        };
        assert!(grid.update_bounds(zoomed).unwrap());

        assert!((grid.pixel_to_db(599.0) + 20.0).abs() < 1e-3);
        assert!((grid.full_scale_pixel_to_db(599.0) + 60.0).abs() < 1e-3);
        assert!((grid.pixel_to_freq(0.0) - 100.0).abs() < 1e-2);
        assert!((grid.full_scale_pixel_to_freq(0.0) - 20.0).abs() < 1e-3);
        assert!((grid.full_scale_pixel_to_freq(799.0) - 20000.0).abs() < 1.0);
    }

    #[test]
    fn frequency_lines_follow_visible_bounds() {
        let grid = grid();
        let values: Vec<f32> = grid.freq_lines().iter().map(|l| l.value).collect();
        assert_eq!(
            values,
            vec![20.0, 50.0, 100.0, 200.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0, 20000.0]
        );
        let labels: Vec<&str> = grid.freq_lines().iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels[4], "500");
        assert_eq!(labels[5], "1k");
        assert_eq!(labels[9], "20k");
        assert!(grid
            .freq_lines()
            .windows(2)
            .all(|w| w[1].location > w[0].location));
    }

    #[test]
    fn wide_db_range_uses_six_db_step() {
        let grid = grid();
        let values: Vec<f32> = grid.magnitude_lines().iter().map(|l| l.value).collect();
        assert_eq!(
            values,
            vec![-60.0, -54.0, -48.0, -42.0, -36.0, -30.0, -24.0, -18.0, -12.0, -6.0, 0.0]
        );
        assert_eq!(grid.magnitude_lines()[0].label, "-60");
        assert_eq!(grid.magnitude_lines()[10].label, "+0");
    }

    #[test]
    fn narrow_db_range_uses_two_db_step() {
        let mut grid = grid();
        grid.update_bounds(Bounds2D {
            x: full().x,
            y: Bounds::new(-10.0, 0.0),
        })
        .unwrap();
        let values: Vec<f32> = grid.magnitude_lines().iter().map(|l| l.value).collect();
        assert_eq!(values, vec![-10.0, -8.0, -6.0, -4.0, -2.0, 0.0]);
    }

    #[test]
    fn unchanged_updates_are_no_ops() {
        let mut grid = grid();
        let grid_generation = grid.grid_generation();
        let cache_generation = grid.cache_generation();

        assert!(!grid.update_size(800, 600));
        assert!(!grid.update_bounds(full()).unwrap());
        assert!(!grid.update_sample_rate(48000.0).unwrap());
        assert!(!grid.update_bin_count(512).unwrap());
        assert_eq!(grid.grid_generation(), grid_generation);
        assert_eq!(grid.cache_generation(), cache_generation);

        assert!(grid.update_size(1024, 600));
        assert_eq!(grid.grid_generation(), grid_generation + 1);
        assert_eq!(grid.cache_generation(), cache_generation + 1);
        assert!((grid.freq_to_pixel(20000.0) - 1023.0).abs() < 1e-2);
    }

    #[test]
    fn sample_rate_change_invalidates_cache_only() {
        let mut grid = grid();
        let grid_generation = grid.grid_generation();
        let cache_generation = grid.cache_generation();
        assert!(grid.update_sample_rate(96000.0).unwrap());
        assert_eq!(grid.grid_generation(), grid_generation);
        assert_eq!(grid.cache_generation(), cache_generation + 1);
        assert!((grid.bin_index_to_frequency(1.0) - 93.75).abs() < 1e-4);
    }

    #[test]
    fn huge_sample_rate_keeps_cache_bounded() {
        let mut grid = FrequencyGrid::new(full(), 1e12, 512, 800, 600).unwrap();
        assert_eq!(grid.freq_cache.slots.len(), MAX_CACHE_SLOTS);
        assert_eq!(grid.freq_to_pixel(1e6), 799.0);
        assert_eq!(grid.freq_to_pixel(1000.0), LogScale.scale(800, full().x, 1000.0, true));

        grid.update_sample_rate(44100.0).unwrap();
        assert_eq!(grid.freq_cache.slots.len(), 44100);
        grid.update_sample_rate(5e11).unwrap();
        assert_eq!(grid.freq_cache.slots.len(), MAX_CACHE_SLOTS);
    }

    #[test]
    fn invalid_bounds_leave_grid_untouched() {
        let mut grid = grid();
        let bad = Bounds2D {
            x: full().x,
            y: Bounds::new(0.0, -60.0),
        };
        assert!(grid.update_bounds(bad).is_err());
        assert_eq!(grid.bounds(), full());
    }
}
