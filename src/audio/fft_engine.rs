use crate::audio::window_functions::WindowFunction;
use crate::error::{ConfigError, Result};
use core::f64::consts::PI;
use libm::{cos, sin};
use std::sync::Arc;

/// Latest transform result, valid until the next window completes
///
/// Both halves are `length / 2` bins long.
#[derive(Debug, Clone, Copy)]
pub struct FftOutput<'a> {
    /// Imaginary parts
    pub sine: &'a [f32],
    /// Real parts
    pub cosine: &'a [f32],
}

impl FftOutput<'_> {
    /// Raw (unnormalised) magnitude of `bin`
    #[inline]
    pub fn magnitude(&self, bin: usize) -> f32 {
        let s = self.sine[bin];
        let c = self.cosine[bin];
        (s * s + c * c).sqrt()
    }

    pub fn bin_count(&self) -> usize {
        self.sine.len()
    }
}

/// Windowed radix-2 transform for one channel
///
/// Samples are windowed as they arrive and accumulated until a full window is
/// available, then transformed in place. Only the producer thread may push.
pub struct WindowedFft {
    window: Arc<WindowFunction>,

    // Buffers
    input_buffer: Vec<f32>,   // Windowed samples (length)
    complex_buffer: Vec<f32>, // Interleaved re/im working buffer (2 * length)
    output_buffer: Vec<f32>,  // Sine half followed by cosine half (length)

    counter: usize,
    log2_length: u32,
}

impl WindowedFft {
    /// The transform length is taken from the window
    pub fn new(window: Arc<WindowFunction>) -> Result<Self> {
        let length = window.len();
        if length < 2 || !length.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo(length));
        }

        Ok(Self {
            window,
            input_buffer: vec![0.0; length],
            complex_buffer: vec![0.0; length * 2],
            output_buffer: vec![0.0; length],
            counter: 0,
            log2_length: length.trailing_zeros(),
        })
    }

    pub fn len(&self) -> usize {
        self.input_buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_buffer.is_empty()
    }

    pub fn window(&self) -> &WindowFunction {
        &self.window
    }

    /// Samples accumulated towards the next window
    pub fn counter(&self) -> usize {
        self.counter
    }

    /// Windowed samples of the window currently being filled (or the last
    /// completed one right after `push` returned output)
    pub fn input(&self) -> &[f32] {
        &self.input_buffer
    }

    /// Result of the last completed window
    pub fn output(&self) -> FftOutput<'_> {
        let (sine, cosine) = self.output_buffer.split_at(self.len() / 2);
        FftOutput { sine, cosine }
    }

    /// Drop any partially accumulated window
    pub fn reset(&mut self) {
        self.counter = 0;
        self.input_buffer.fill(0.0);
        self.complex_buffer.fill(0.0);
        self.output_buffer.fill(0.0);
    }

    /// Push one sample; returns the spectrum when this sample completes a window
    /// Called from audio thread - no allocations
    pub fn push(&mut self, sample: f32) -> Option<FftOutput<'_>> {
        let windowed = sample * self.window.coefficient(self.counter);
        self.input_buffer[self.counter] = windowed;
        self.complex_buffer[self.counter * 2] = windowed;
        self.complex_buffer[self.counter * 2 + 1] = 0.0;

        self.counter += 1;
        if self.counter < self.len() {
            return None;
        }

        self.counter = 0;
        self.transform();
        self.demultiplex_output();

        Some(self.output())
    }

    /// In-place iterative radix-2 FFT over the interleaved buffer
    ///
    /// Bit-reversal permutation first, then log2(N) butterfly stages. The
    /// twiddle factor of each stage is advanced by the angle-addition
    /// recurrence so only one sin/cos pair is evaluated per stage.
    fn transform(&mut self) {
        let buffer = &mut self.complex_buffer;
        let span = buffer.len(); // 2 * N

        // Bit reversal on even (real) indices; the imaginary part follows
        let mut i = 2;
        while i < span - 2 {
            let mut j = 0;
            let mut bit = 2;
            while bit < span {
                if i & bit != 0 {
                    j += 1;
                }
                j <<= 1;
                bit <<= 1;
            }

            if i < j {
                buffer.swap(i, j);
                buffer.swap(i + 1, j + 1);
            }
            i += 2;
        }

        let mut le = 2;
        for _ in 0..self.log2_length {
            le <<= 1;
            let le2 = le >> 1;

            let arg = PI / (le2 >> 1) as f64;
            let wr = cos(arg);
            let wi = -sin(arg);
            let mut ur = 1.0f64;
            let mut ui = 0.0f64;

            for j in (0..le2).step_by(2) {
                let (ur32, ui32) = (ur as f32, ui as f32);

                for p1 in (j..span).step_by(le) {
                    let p2 = p1 + le2;
                    let tr = buffer[p2] * ur32 - buffer[p2 + 1] * ui32;
                    let ti = buffer[p2] * ui32 + buffer[p2 + 1] * ur32;
                    buffer[p2] = buffer[p1] - tr;
                    buffer[p2 + 1] = buffer[p1 + 1] - ti;
                    buffer[p1] += tr;
                    buffer[p1 + 1] += ti;
                }

                let next = ur * wr - ui * wi;
                ui = ur * wi + ui * wr;
                ur = next;
            }
        }
    }

    fn demultiplex_output(&mut self) {
        let half = self.len() / 2;
        let (sine, cosine) = self.output_buffer.split_at_mut(half);

        for bin in 0..half {
            cosine[bin] = self.complex_buffer[bin * 2];
            sine[bin] = self.complex_buffer[bin * 2 + 1];
        }
    }
}
