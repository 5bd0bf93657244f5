use dasp::sample::ToSample;

use crate::audio::spectrum::{spectrum_channel, SpectrumAggregator, SpectrumConsumer, SpectrumProducer};
use crate::audio::stereo_image::{
    stereo_channel, ScaleReadout, StereoConsumer, StereoImageCalculator, StereoProducer,
};
use crate::config::{AnalyserConfig, SpectrumSpeed};
use crate::error::Result;

/// Render thread ends of every handoff the processor publishes to
pub struct AnalyserHandles {
    pub spectrum: SpectrumConsumer,
    pub stereo: StereoConsumer,
    /// Goniometer auto-gain envelope
    pub scale: ScaleReadout,
}

/// Drives both calculators from host audio on the audio thread
///
/// Every frame goes to the spectrum aggregator, the first two channels to the
/// stereo image (a mono stream is fed as left = right). Completed spectra and
/// segments are published as soon as they are produced.
pub struct AnalyserProcessor {
    config: AnalyserConfig,
    spectrum: SpectrumAggregator,
    stereo: StereoImageCalculator,
    spectrum_producer: SpectrumProducer,
    stereo_producer: StereoProducer,

    // Pre-allocated frame for planar input, one slot per channel
    frame_scratch: Vec<f32>,
}

impl AnalyserProcessor {
    pub fn new(config: &AnalyserConfig) -> Result<(Self, AnalyserHandles)> {
        config.validate()?;

        let spectrum =
            SpectrumAggregator::new(config.sample_rate, config.channel_count, &config.spectrum)?;
        let stereo = StereoImageCalculator::new(config.sample_rate, &config.goniometer)?;

        let (spectrum_producer, spectrum_consumer) = spectrum_channel(&spectrum);
        let (stereo_producer, stereo_consumer) = stereo_channel(&stereo);
        let handles = AnalyserHandles {
            spectrum: spectrum_consumer,
            stereo: stereo_consumer,
            scale: stereo.scale_readout(),
        };

        let processor = Self {
            config: config.clone(),
            spectrum,
            stereo,
            spectrum_producer,
            stereo_producer,
            frame_scratch: vec![0.0; config.channel_count],
        };
        Ok((processor, handles))
    }

    pub fn config(&self) -> &AnalyserConfig {
        &self.config
    }

    pub fn spectrum(&self) -> &SpectrumAggregator {
        &self.spectrum
    }

    pub fn stereo(&self) -> &StereoImageCalculator {
        &self.stereo
    }

    /// Analyse a block of interleaved samples
    /// Called from audio thread - must be real-time safe (no allocations)
    ///
    /// A trailing partial frame is ignored.
    pub fn process_interleaved<S>(&mut self, samples: &[S])
    where
        S: ToSample<f32> + Copy,
    {
        for frame in samples.chunks_exact(self.config.channel_count) {
            self.process_frame(frame);
        }
    }

    /// Analyse a block given as one slice per channel
    /// Called from audio thread - must be real-time safe (no allocations)
    ///
    /// Processes as many frames as the shortest channel holds. Channels beyond
    /// the configured count are ignored, missing ones are silent.
    pub fn process_planar<S>(&mut self, channels: &[&[S]])
    where
        S: ToSample<f32> + Copy,
    {
        let frames = channels
            .iter()
            .take(self.config.channel_count)
            .map(|c| c.len())
            .min()
            .unwrap_or(0);

        let mut scratch = std::mem::take(&mut self.frame_scratch);
        for n in 0..frames {
            for (channel, slot) in scratch.iter_mut().enumerate() {
                *slot = channels
                    .get(channel)
                    .map_or(0.0, |samples| samples[n].to_sample_());
            }
            self.process_frame(&scratch[..]);
        }
        self.frame_scratch = scratch;
    }

    fn process_frame<S>(&mut self, frame: &[S])
    where
        S: ToSample<f32> + Copy,
    {
        if let Some(snapshot) = self.spectrum.process(frame) {
            self.spectrum_producer.publish(&snapshot);
        }

        let left = frame[0];
        let right = frame.get(1).copied().unwrap_or(left);
        if let Some(points) = self.stereo.handle(left, right) {
            self.stereo_producer.publish(points);
        }
    }

    /// Rebuild everything for a new configuration and hand out fresh consumers
    ///
    /// Allocates; the caller must not run `process_*` concurrently. On error
    /// the processor keeps running with the previous configuration.
    pub fn reconfigure(&mut self, config: &AnalyserConfig) -> Result<AnalyserHandles> {
        let (processor, handles) = Self::new(config)?;
        *self = processor;
        log::debug!(
            "Analyser reconfigured: {} channels at {} Hz",
            config.channel_count,
            config.sample_rate
        );
        Ok(handles)
    }

    /// Returns `true` if either calculator had to be retuned
    pub fn set_sample_rate(&mut self, sample_rate: f32) -> Result<bool> {
        let spectrum_changed = self.spectrum.set_sample_rate(sample_rate)?;
        let stereo_changed = self.stereo.set_sample_rate(sample_rate)?;
        self.config.sample_rate = sample_rate;
        Ok(spectrum_changed || stereo_changed)
    }

    pub fn set_speed(&mut self, speed: SpectrumSpeed) -> Result<()> {
        self.spectrum.set_speed(speed)?;
        self.config.spectrum.speed = speed;
        Ok(())
    }

    /// Drop partial windows and smoothing history, keep the configuration
    pub fn reset(&mut self) {
        self.spectrum.reset();
        self.stereo.reset();
    }
}
