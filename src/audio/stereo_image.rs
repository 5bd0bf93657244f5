use atomic_float::AtomicF32;
use dasp::sample::ToSample;
use std::sync::{atomic::Ordering, Arc};

use super::constants::{GONIOMETER_ROTATION_DEG, MIN_AUTO_GAIN};
use super::coord::{Point, Polar};
use super::envelope::EnvelopeWalker;
use super::handoff::{frame_channel, FrameReceiver, FrameSender};
use crate::config::GoniometerConfig;
use crate::error::{check_sample_rate, ConfigError, Result};

/// Lock-free view of the goniometer auto-gain envelope
///
/// Audio thread writes on every completed segment, UI thread reads whenever
/// it draws the scale indicator.
#[derive(Clone)]
pub struct ScaleReadout {
    value: Arc<AtomicF32>,
}

impl ScaleReadout {
    fn new() -> Self {
        Self {
            value: Arc::new(AtomicF32::new(0.0)),
        }
    }

    pub fn get(&self) -> f32 {
        self.value.load(Ordering::Relaxed)
    }

    fn store(&self, value: f32) {
        self.value.store(value, Ordering::Relaxed);
    }
}

/// Left/right pairs turned into a rotated, self-normalising point cloud
///
/// Correlated (mono) content lands on the vertical axis, fully out of phase
/// content on the horizontal one. Points are written into a fixed segment
/// buffer that is handed out every `segment_length` pairs.
pub struct StereoImageCalculator {
    points: Vec<Point>,
    position: usize,
    /// Tracks the rotated radius, drives the auto-gain
    envelope: EnvelopeWalker,
    readout: ScaleReadout,
}

impl StereoImageCalculator {
    pub fn new(sample_rate: f32, config: &GoniometerConfig) -> Result<Self> {
        if config.segment_length == 0 {
            return Err(ConfigError::ZeroSegmentLength);
        }
        let envelope = EnvelopeWalker::new(config.attack_ms, config.release_ms, sample_rate)?;

        log::info!(
            "Stereo image: {} point segments at {} Hz",
            config.segment_length,
            sample_rate
        );

        Ok(Self {
            points: vec![Point::default(); config.segment_length],
            position: 0,
            envelope,
            readout: ScaleReadout::new(),
        })
    }

    /// Map one left/right pair; returns the whole segment once it is full
    /// Called from audio thread - must be real-time safe (no allocations)
    pub fn handle<S>(&mut self, left: S, right: S) -> Option<&[Point]>
    where
        S: ToSample<f32>,
    {
        let polar = Point::new(left.to_sample_(), right.to_sample_())
            .to_polar()
            .rotate_degrees(GONIOMETER_ROTATION_DEG);

        // Quiet material is expanded to fill the display, loud material shrunk
        let envelope = self.envelope.process(polar.radius);
        let point = if polar.radius > 0.0 && envelope > 0.0 {
            let gain = (1.0 / envelope).max(MIN_AUTO_GAIN);
            // A denormal envelope overflows the gain, the clamp takes it from here
            let radius = polar.radius * gain;
            Polar {
                radius: if radius.is_finite() { radius } else { f32::MAX },
                angle: polar.angle,
            }
            .to_cartesian()
            .clamp(1.0)
        } else {
            Point::default()
        };

        self.points[self.position] = point;
        self.position += 1;

        if self.position < self.points.len() {
            return None;
        }

        self.position = 0;
        self.readout.store(envelope);
        Some(&self.points)
    }

    /// Reallocate the segment buffer and restart the segment
    /// Not real-time safe, call outside the audio callback
    pub fn set_segment_length(&mut self, segment_length: usize) -> Result<()> {
        if segment_length == 0 {
            return Err(ConfigError::ZeroSegmentLength);
        }

        self.points.clear();
        self.points.resize(segment_length, Point::default());
        self.position = 0;
        log::debug!("Stereo image segment length {}", segment_length);
        Ok(())
    }

    /// Returns `true` if the envelope had to be retuned
    pub fn set_sample_rate(&mut self, sample_rate: f32) -> Result<bool> {
        check_sample_rate(sample_rate)?;
        if sample_rate == self.envelope.sample_rate() {
            return Ok(false);
        }

        self.envelope.set_sample_rate(sample_rate)?;
        log::debug!("Stereo image sample rate {} Hz", sample_rate);
        Ok(true)
    }

    pub fn set_attack_speed(&mut self, attack_ms: f32) -> Result<()> {
        self.envelope.set_attack_speed(attack_ms)
    }

    pub fn set_release_speed(&mut self, release_ms: f32) -> Result<()> {
        self.envelope.set_release_speed(release_ms)
    }

    pub fn segment_length(&self) -> usize {
        self.points.len()
    }

    /// Pairs written into the segment currently being filled
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn sample_rate(&self) -> f32 {
        self.envelope.sample_rate()
    }

    /// Auto-gain envelope value, the display scale is its reciprocal
    pub fn current_scale_value(&self) -> f32 {
        self.envelope.current_value()
    }

    pub fn scale_readout(&self) -> ScaleReadout {
        self.readout.clone()
    }

    pub fn reset(&mut self) {
        self.points.fill(Point::default());
        self.position = 0;
        self.envelope.reset();
        self.readout.store(0.0);
    }
}

/// Owned copy of a completed segment held by the render thread
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolarSegment {
    pub points: Vec<Point>,
    /// Number of segments published so far, including this one
    pub segments_rendered: u64,
}

/// Audio thread side of the stereo image handoff
pub struct StereoProducer {
    sender: FrameSender<PolarSegment>,
    segments_rendered: u64,
}

impl StereoProducer {
    /// Copy a completed segment into the pre-sized back buffer and publish it
    ///
    /// Returns `true` if an unread segment was replaced.
    pub fn publish(&mut self, points: &[Point]) -> bool {
        self.segments_rendered += 1;
        let segments_rendered = self.segments_rendered;
        self.sender.publish_with(|segment| {
            if segment.points.len() == points.len() {
                segment.points.copy_from_slice(points);
            } else {
                segment.points.clear();
                segment.points.extend_from_slice(points);
            }
            segment.segments_rendered = segments_rendered;
        })
    }
}

/// Render thread side of the stereo image handoff
pub struct StereoConsumer {
    receiver: FrameReceiver<PolarSegment>,
}

impl StereoConsumer {
    /// Newest segment if one arrived since the last call
    pub fn pop(&mut self) -> Option<&PolarSegment> {
        self.receiver.pop()
    }

    pub fn read(&mut self) -> &PolarSegment {
        self.receiver.latest()
    }
}

/// Create a stereo image producer/consumer pair sized for `calculator`
pub fn stereo_channel(calculator: &StereoImageCalculator) -> (StereoProducer, StereoConsumer) {
    let (sender, receiver) = frame_channel(PolarSegment {
        points: vec![Point::default(); calculator.segment_length()],
        segments_rendered: 0,
    });
    (
        StereoProducer {
            sender,
            segments_rendered: 0,
        },
        StereoConsumer { receiver },
    )
}
