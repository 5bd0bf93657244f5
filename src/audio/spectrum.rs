use dasp::sample::ToSample;
use std::sync::Arc;

use super::envelope::EnvelopeWalker;
use super::fft_engine::WindowedFft;
use super::handoff::{frame_channel, FrameReceiver, FrameSender};
use super::window_functions::WindowFunction;
use crate::config::{SpectrumConfig, SpectrumSpeed};
use crate::error::{check_sample_rate, check_time_constant, ConfigError, Result};

/// One smoothed bin of the magnitude spectrum
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BinMagnitude {
    pub bin: usize,
    /// Linear amplitude, 1.0 for a full-scale sine
    pub magnitude: f32,
}

/// Result of one completed analysis frame
///
/// Borrows the aggregator's bin storage, which is overwritten by the next
/// frame. Copy it with [`SpectrumSnapshot::copy_into`] or
/// [`SpectrumSnapshot::to_frame`] to keep it around.
#[derive(Debug, Clone, Copy)]
pub struct SpectrumSnapshot<'a> {
    pub bins: &'a [BinMagnitude],
    /// Stream the analyser was created for
    pub index: usize,
    pub sample_rate: f32,
    /// Number of frames completed so far, including this one
    pub frames_rendered: u64,
}

impl SpectrumSnapshot<'_> {
    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    /// Copy into an existing frame, reusing its storage when the bin count matches
    pub fn copy_into(&self, frame: &mut SpectrumFrame) {
        if frame.bins.len() == self.bins.len() {
            frame.bins.copy_from_slice(self.bins);
        } else {
            frame.bins.clear();
            frame.bins.extend_from_slice(self.bins);
        }
        frame.index = self.index;
        frame.sample_rate = self.sample_rate;
        frame.frames_rendered = self.frames_rendered;
    }

    pub fn to_frame(&self) -> SpectrumFrame {
        let mut frame = SpectrumFrame::default();
        self.copy_into(&mut frame);
        frame
    }
}

/// Owned copy of a [`SpectrumSnapshot`] held by the render thread
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectrumFrame {
    pub bins: Vec<BinMagnitude>,
    pub index: usize,
    pub sample_rate: f32,
    pub frames_rendered: u64,
}

impl SpectrumFrame {
    /// Frame with `bin_count` silent bins, used to pre-size the handoff
    pub fn silent(bin_count: usize, index: usize, sample_rate: f32) -> Self {
        Self {
            bins: (0..bin_count)
                .map(|bin| BinMagnitude { bin, magnitude: 0.0 })
                .collect(),
            index,
            sample_rate,
            frames_rendered: 0,
        }
    }

    /// Loudest bin, if any
    pub fn peak(&self) -> Option<BinMagnitude> {
        self.bins
            .iter()
            .copied()
            .max_by(|a, b| a.magnitude.total_cmp(&b.magnitude))
    }
}

/// Multi-channel magnitude spectrum with per-bin attack/release smoothing
///
/// Runs one [`WindowedFft`] per channel. Every channel receives exactly one
/// sample per [`SpectrumAggregator::process`] call, so all engines complete
/// their windows on the same call.
pub struct SpectrumAggregator {
    engines: Vec<WindowedFft>,
    window: Arc<WindowFunction>,
    /// Smoothed result, also the previous frame's value for the smoother
    bins: Vec<BinMagnitude>,
    fft_size: usize,
    index: usize,
    sample_rate: f32,
    attack_ms: f32,
    release_ms: f32,
    attack_coeff: f32,
    release_coeff: f32,
    frames_rendered: u64,
}

impl SpectrumAggregator {
    pub fn new(sample_rate: f32, channel_count: usize, config: &SpectrumConfig) -> Result<Self> {
        check_sample_rate(sample_rate)?;
        if channel_count == 0 {
            return Err(ConfigError::ZeroChannels);
        }
        let (attack_ms, release_ms) = config.speed.time_constants_ms();
        check_time_constant(attack_ms)?;
        check_time_constant(release_ms)?;

        let window = Arc::new(WindowFunction::new(
            config.window,
            config.fft_size,
            config.symmetry,
        )?);
        let engines = (0..channel_count)
            .map(|_| WindowedFft::new(window.clone()))
            .collect::<Result<Vec<_>>>()?;

        let bin_count = config.fft_size / 2;
        let mut aggregator = Self {
            engines,
            window,
            bins: (0..bin_count)
                .map(|bin| BinMagnitude { bin, magnitude: 0.0 })
                .collect(),
            fft_size: config.fft_size,
            index: config.stream_index,
            sample_rate,
            attack_ms,
            release_ms,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            frames_rendered: 0,
        };
        aggregator.recalculate_coefficients();

        log::info!(
            "Spectrum aggregator {}: {} channels, {}-point {:?} window, {:.1} frames/s",
            aggregator.index,
            channel_count,
            aggregator.fft_size,
            config.window,
            aggregator.frame_rate()
        );

        Ok(aggregator)
    }

    /// Rebuild engines and buffers for a new configuration
    ///
    /// Allocates; the caller must not run `process` concurrently.
    pub fn reconfigure(
        &mut self,
        sample_rate: f32,
        channel_count: usize,
        config: &SpectrumConfig,
    ) -> Result<()> {
        *self = Self::new(sample_rate, channel_count, config)?;
        log::debug!("Spectrum aggregator {} reconfigured", self.index);
        Ok(())
    }

    pub fn channel_count(&self) -> usize {
        self.engines.len()
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn window(&self) -> &WindowFunction {
        &self.window
    }

    /// Smoothing happens once per completed window, not once per sample
    pub fn frame_rate(&self) -> f32 {
        self.sample_rate / self.fft_size as f32
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Whether release is infinite and bins only ever rise
    pub fn is_peak_hold(&self) -> bool {
        self.release_ms.is_infinite()
    }

    /// Returns `true` if the rate changed and coefficients were recomputed
    pub fn set_sample_rate(&mut self, sample_rate: f32) -> Result<bool> {
        check_sample_rate(sample_rate)?;
        if sample_rate == self.sample_rate {
            return Ok(false);
        }

        self.sample_rate = sample_rate;
        self.recalculate_coefficients();
        log::debug!(
            "Spectrum aggregator {}: sample rate {} Hz, {:.1} frames/s",
            self.index,
            sample_rate,
            self.frame_rate()
        );
        Ok(true)
    }

    pub fn set_attack_speed(&mut self, attack_ms: f32) -> Result<()> {
        self.attack_ms = check_time_constant(attack_ms)?;
        self.recalculate_coefficients();
        Ok(())
    }

    pub fn set_release_speed(&mut self, release_ms: f32) -> Result<()> {
        self.release_ms = check_time_constant(release_ms)?;
        self.recalculate_coefficients();
        Ok(())
    }

    /// Both time constants are checked before either is applied
    pub fn set_speed(&mut self, speed: SpectrumSpeed) -> Result<()> {
        let (attack_ms, release_ms) = speed.time_constants_ms();
        let attack_ms = check_time_constant(attack_ms)?;
        let release_ms = check_time_constant(release_ms)?;

        self.attack_ms = attack_ms;
        self.release_ms = release_ms;
        self.recalculate_coefficients();
        Ok(())
    }

    /// Clear partial windows, smoothing history and the frame counter
    pub fn reset(&mut self) {
        for engine in &mut self.engines {
            engine.reset();
        }
        for bin in &mut self.bins {
            bin.magnitude = 0.0;
        }
        self.frames_rendered = 0;
    }

    /// Push one sample per channel; returns a snapshot when the window completes
    /// Called from audio thread - must be real-time safe (no allocations)
    ///
    /// Channels missing from `samples` are fed silence, extra ones are ignored.
    pub fn process<S>(&mut self, samples: &[S]) -> Option<SpectrumSnapshot<'_>>
    where
        S: ToSample<f32> + Copy,
    {
        let mut completed = true;
        for (channel, engine) in self.engines.iter_mut().enumerate() {
            let sample = samples
                .get(channel)
                .map_or(0.0, |&sample| sample.to_sample_());
            completed &= engine.push(sample).is_some();
        }

        if !completed {
            return None;
        }

        self.compute_bins();
        self.frames_rendered += 1;

        Some(SpectrumSnapshot {
            bins: &self.bins,
            index: self.index,
            sample_rate: self.sample_rate,
            frames_rendered: self.frames_rendered,
        })
    }

    /// Normalise, take the loudest channel per bin and smooth against the
    /// previous frame
    ///
    /// # Scaling Explanation
    /// - A real sine of amplitude A shows up as two conjugate bins of A/2 each,
    ///   so the single-sided spectrum is doubled
    /// - The unnormalised DFT sums N samples, so it is divided by N
    /// - The window removes energy, compensated by its fixed scaling factor
    fn compute_bins(&mut self) {
        let normalisation = 2.0 / self.fft_size as f32 / self.window.scaling_factor();
        let peak_hold = self.is_peak_hold();

        for (bin_idx, bin) in self.bins.iter_mut().enumerate() {
            let amplitude = self
                .engines
                .iter()
                .map(|engine| engine.output().magnitude(bin_idx) * normalisation)
                .fold(0.0f32, f32::max);

            let mut smoothed = bin.magnitude;
            if peak_hold {
                smoothed = smoothed.max(amplitude);
            } else {
                EnvelopeWalker::static_process(
                    amplitude,
                    &mut smoothed,
                    self.attack_coeff,
                    self.release_coeff,
                );
            }

            bin.bin = bin_idx;
            bin.magnitude = smoothed;
        }
    }

    fn recalculate_coefficients(&mut self) {
        let frame_rate = self.frame_rate();
        self.attack_coeff = EnvelopeWalker::calculate_coeff(self.attack_ms, frame_rate);
        self.release_coeff = EnvelopeWalker::calculate_coeff(self.release_ms, frame_rate);
    }
}

/// Audio thread side of the spectrum handoff
pub struct SpectrumProducer {
    sender: FrameSender<SpectrumFrame>,
}

impl SpectrumProducer {
    /// Copy a snapshot into the pre-sized back buffer and publish it
    ///
    /// Returns `true` if an unread frame was replaced.
    pub fn publish(&mut self, snapshot: &SpectrumSnapshot<'_>) -> bool {
        self.sender.publish_with(|frame| snapshot.copy_into(frame))
    }
}

/// Render thread side of the spectrum handoff
pub struct SpectrumConsumer {
    receiver: FrameReceiver<SpectrumFrame>,
}

impl SpectrumConsumer {
    /// Newest spectrum if one arrived since the last call
    pub fn pop(&mut self) -> Option<&SpectrumFrame> {
        self.receiver.pop()
    }

    /// Read latest spectrum data for UI display
    pub fn read(&mut self) -> &SpectrumFrame {
        self.receiver.latest()
    }
}

/// Create a spectrum producer/consumer pair sized for `aggregator`
pub fn spectrum_channel(aggregator: &SpectrumAggregator) -> (SpectrumProducer, SpectrumConsumer) {
    let (sender, receiver) = frame_channel(SpectrumFrame::silent(
        aggregator.bin_count(),
        aggregator.index,
        aggregator.sample_rate,
    ));
    (SpectrumProducer { sender }, SpectrumConsumer { receiver })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::window_functions::{SymmetryMode, WindowShape};
    use std::f32::consts::PI;

    fn config(fft_size: usize, window: WindowShape, speed: SpectrumSpeed) -> SpectrumConfig {
        SpectrumConfig {
            fft_size,
            window,
            symmetry: SymmetryMode::Symmetric,
            speed,
            stream_index: 3,
        }
    }

    fn instant() -> SpectrumSpeed {
        SpectrumSpeed::Custom {
            attack_ms: 0.0,
            release_ms: 0.0,
        }
    }

    fn sine(frequency: f32, sample_rate: f32, n: usize) -> f32 {
        (2.0 * PI * frequency * n as f32 / sample_rate).sin()
    }

    #[test]
    fn rejects_bad_configuration() {
        let good = config(1024, WindowShape::Hann, instant());
        assert_eq!(
            SpectrumAggregator::new(48000.0, 0, &good).err(),
            Some(ConfigError::ZeroChannels)
        );
        assert!(SpectrumAggregator::new(0.0, 2, &good).is_err());
        assert_eq!(
            SpectrumAggregator::new(48000.0, 2, &config(1000, WindowShape::Hann, instant())).err(),
            Some(ConfigError::NotPowerOfTwo(1000))
        );
    }

    #[test]
    fn returns_nothing_until_window_completes() {
        let mut aggregator =
            SpectrumAggregator::new(48000.0, 2, &config(64, WindowShape::Hann, instant())).unwrap();
        for _ in 0..63 {
            assert!(aggregator.process(&[0.0f32, 0.0]).is_none());
        }
        let snapshot = aggregator.process(&[0.0f32, 0.0]).unwrap();
        assert_eq!(snapshot.bin_count(), 32);
        assert_eq!(snapshot.index, 3);
        assert_eq!(snapshot.sample_rate, 48000.0);
        assert_eq!(snapshot.frames_rendered, 1);
    }

    #[test]
    fn bin_centred_sine_reads_its_amplitude() {
        let length = 256;
        let k = 16;
        let sample_rate = 48000.0;
        let frequency = k as f32 * sample_rate / length as f32;
        let mut aggregator = SpectrumAggregator::new(
            sample_rate,
            1,
            &config(length, WindowShape::Rectangular, instant()),
        )
        .unwrap();

        let mut frame = None;
        for n in 0..length {
            if let Some(snapshot) = aggregator.process(&[0.5 * sine(frequency, sample_rate, n)]) {
                frame = Some(snapshot.to_frame());
            }
        }
        let frame = frame.unwrap();
        assert!((frame.bins[k].magnitude - 0.5).abs() < 1e-3);
        for bin in frame.bins.iter().filter(|b| b.bin != k) {
            assert!(bin.magnitude < 1e-3, "bin {} = {}", bin.bin, bin.magnitude);
        }
        assert_eq!(frame.peak().map(|p| p.bin), Some(k));
    }

    #[test]
    fn loudest_channel_wins() {
        let length = 128;
        let sample_rate = 48000.0;
        let frequency = 8.0 * sample_rate / length as f32;
        let mut aggregator = SpectrumAggregator::new(
            sample_rate,
            2,
            &config(length, WindowShape::Rectangular, instant()),
        )
        .unwrap();

        let mut peak = 0.0;
        for n in 0..length {
            let s = sine(frequency, sample_rate, n);
            if let Some(snapshot) = aggregator.process(&[0.25 * s, 0.75 * s]) {
                peak = snapshot.bins[8].magnitude;
            }
        }
        assert!((peak - 0.75).abs() < 1e-3);
    }

    #[test]
    fn missing_channels_are_fed_silence() {
        let mut aggregator =
            SpectrumAggregator::new(48000.0, 2, &config(8, WindowShape::Rectangular, instant()))
                .unwrap();
        for _ in 0..7 {
            assert!(aggregator.process(&[1.0f32]).is_none());
        }
        let snapshot = aggregator.process(&[1.0f32]).unwrap();
        // DC of 1.0 over 8 samples, doubled and divided by N
        assert!((snapshot.bins[0].magnitude - 2.0).abs() < 1e-5);
    }

    #[test]
    fn accepts_integer_samples() {
        let mut aggregator =
            SpectrumAggregator::new(48000.0, 1, &config(8, WindowShape::Rectangular, instant()))
                .unwrap();
        let mut result = None;
        for _ in 0..8 {
            result = aggregator.process(&[i16::MAX]).map(|s| s.bins[0].magnitude);
        }
        assert!((result.unwrap() - 2.0).abs() < 1e-3);
    }

    #[test]
    fn smoothing_follows_attack_then_release() {
        let length = 64;
        let sample_rate = 6400.0; // 100 frames per second
        let mut aggregator = SpectrumAggregator::new(
            sample_rate,
            1,
            &config(
                length,
                WindowShape::Rectangular,
                SpectrumSpeed::Custom {
                    attack_ms: 50.0,
                    release_ms: 200.0,
                },
            ),
        )
        .unwrap();
        assert_eq!(aggregator.frame_rate(), 100.0);

        let run_frame = |aggregator: &mut SpectrumAggregator, level: f32| -> f32 {
            let mut value = 0.0;
            for _ in 0..length {
                if let Some(snapshot) = aggregator.process(&[level]) {
                    value = snapshot.bins[0].magnitude;
                }
            }
            value
        };

        let attack = EnvelopeWalker::calculate_coeff(50.0, 100.0);
        let release = EnvelopeWalker::calculate_coeff(200.0, 100.0);

        let mut previous = 0.0;
        for step in 1..=5 {
            let value = run_frame(&mut aggregator, 0.5);
            assert!(value > previous);
            assert!((value - 1.0 * (1.0 - attack.powi(step))).abs() < 1e-4);
            previous = value;
        }
        let top = previous;
        for step in 1..=5 {
            let value = run_frame(&mut aggregator, 0.0);
            assert!(value < previous);
            assert!((value - top * release.powi(step)).abs() < 1e-4);
            previous = value;
        }
    }

    #[test]
    fn peak_hold_never_decays() {
        let mut aggregator = SpectrumAggregator::new(
            48000.0,
            1,
            &config(16, WindowShape::Rectangular, SpectrumSpeed::PeakHold),
        )
        .unwrap();
        assert!(aggregator.is_peak_hold());

        let mut values = Vec::new();
        for level in [0.25f32, 1.0, 0.0, 0.5] {
            for _ in 0..16 {
                if let Some(snapshot) = aggregator.process(&[level]) {
                    values.push(snapshot.bins[0].magnitude);
                }
            }
        }
        assert_eq!(values.len(), 4);
        assert!(values.windows(2).all(|w| w[1] >= w[0]));
        assert!((values[3] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn sample_rate_change_recomputes_coefficients() {
        let mut aggregator =
            SpectrumAggregator::new(48000.0, 1, &config(1024, WindowShape::Hann, SpectrumSpeed::Medium))
                .unwrap();
        let before = aggregator.release_coeff;
        assert!(!aggregator.set_sample_rate(48000.0).unwrap());
        assert!(aggregator.set_sample_rate(96000.0).unwrap());
        assert_eq!(aggregator.frame_rate(), 96000.0 / 1024.0);
        assert!(aggregator.release_coeff > before);
        assert!(aggregator.set_sample_rate(-1.0).is_err());
    }

    #[test]
    fn frames_rendered_is_monotonic_and_reset_clears_it() {
        let mut aggregator =
            SpectrumAggregator::new(48000.0, 1, &config(4, WindowShape::Hann, instant())).unwrap();
        let mut counters = Vec::new();
        for _ in 0..12 {
            if let Some(snapshot) = aggregator.process(&[0.1f32]) {
                counters.push(snapshot.frames_rendered);
            }
        }
        assert_eq!(counters, vec![1, 2, 3]);
        aggregator.reset();
        assert_eq!(aggregator.frames_rendered(), 0);
    }

    #[test]
    fn reconfigure_resizes_bins() {
        let mut aggregator =
            SpectrumAggregator::new(48000.0, 1, &config(64, WindowShape::Hann, instant())).unwrap();
        aggregator
            .reconfigure(44100.0, 2, &config(256, WindowShape::BlackmanHarris, instant()))
            .unwrap();
        assert_eq!(aggregator.bin_count(), 128);
        assert_eq!(aggregator.channel_count(), 2);
        assert_eq!(aggregator.sample_rate(), 44100.0);
    }

    #[test]
    fn rejected_speed_leaves_smoothing_untouched() {
        let mut aggregator =
            SpectrumAggregator::new(48000.0, 1, &config(64, WindowShape::Hann, instant())).unwrap();
        aggregator.set_speed(SpectrumSpeed::Fast).unwrap();
        let before = (aggregator.attack_coeff, aggregator.release_coeff);

        let bad = SpectrumSpeed::Custom {
            attack_ms: 500.0,
            release_ms: -1.0,
        };
        assert_eq!(
            aggregator.set_speed(bad),
            Err(ConfigError::InvalidTimeConstant(-1.0))
        );
        assert_eq!((aggregator.attack_coeff, aggregator.release_coeff), before);
        assert_eq!((aggregator.attack_ms, aggregator.release_ms), (5.0, 100.0));
        assert!(!aggregator.is_peak_hold());
    }

    #[test]
    fn handoff_delivers_copied_snapshot() {
        let mut aggregator =
            SpectrumAggregator::new(48000.0, 1, &config(8, WindowShape::Rectangular, instant()))
                .unwrap();
        let (mut producer, mut consumer) = spectrum_channel(&aggregator);
        assert!(consumer.pop().is_none());
        assert_eq!(consumer.read().bins.len(), 4);

        for _ in 0..8 {
            if let Some(snapshot) = aggregator.process(&[1.0f32]) {
                producer.publish(&snapshot);
            }
        }
        let frame = consumer.pop().unwrap();
        assert_eq!(frame.frames_rendered, 1);
        assert!((frame.bins[0].magnitude - 2.0).abs() < 1e-5);
        assert!(consumer.pop().is_none());
    }
}
