//! FM demodulation blocks.
//!
//! - [`PhaseDiscriminator`]: extracts instantaneous frequency from complex
//!   samples for FM demodulation
//! - [`Deemphasis`]: restores the audio balance after transmitter
//!   pre-emphasis
//!
//! # Example
//!
//! ```
//! use radiocore::dsp::fm::{PhaseDiscriminator, Deemphasis};
//! use num_complex::Complex;
//!
//! let mut discriminator = PhaseDiscriminator::new();
//! let mut deemphasis = Deemphasis::new(250_000.0, 75e-6);
//!
//! let iq = vec![Complex::new(0.5, 0.5); 100];
//! let demodulated = discriminator.process(&iq);
//! let audio = deemphasis.process(&demodulated);
//! ```

use num_complex::Complex;
use std::f32::consts::PI;

/// Phase discriminator for FM demodulation.
///
/// Computes the phase difference between consecutive samples via conjugate
/// multiplication and `arg()`, which is the atan2 form with the ±π
/// discontinuity already unwrapped. The output is normalized by π so full
/// deviation lands in [-1, 1].
pub struct PhaseDiscriminator {
    /// Last complex sample for the phase difference
    last: Complex<f32>,
}

impl PhaseDiscriminator {
    pub fn new() -> Self {
        Self {
            last: Complex::new(1.0, 0.0),
        }
    }

    /// Demodulate a block of complex samples.
    ///
    /// Non-finite sample components are treated as silence (a zero sample)
    /// rather than poisoning the phase state.
    pub fn process(&mut self, samples: &[Complex<f32>]) -> Vec<f32> {
        let mut out = Vec::with_capacity(samples.len());
        for &sample in samples {
            let sample = if sample.re.is_finite() && sample.im.is_finite() {
                sample
            } else {
                Complex::new(0.0, 0.0)
            };
            // arg(sample * conj(last)) is the phase increment, already
            // wrapped into (-pi, pi]
            let d = (sample * self.last.conj()).arg();
            out.push(d / PI);
            if sample.norm_sqr() > 0.0 {
                self.last = sample;
            }
        }
        out
    }

    /// Reset to the initial reference (1 + 0j).
    pub fn reset(&mut self) {
        self.last = Complex::new(1.0, 0.0);
    }
}

impl Default for PhaseDiscriminator {
    fn default() -> Self {
        Self::new()
    }
}

/// De-emphasis filter for FM broadcast audio.
///
/// Single-pole IIR low-pass, `y[n] = b*x[n] + a*y[n-1]`, with the coefficient
/// derived from the sample rate and the time constant (75 µs North America,
/// 50 µs Europe; NFM uses a longer constant).
pub struct Deemphasis {
    /// Feedback coefficient (previous output)
    a: f32,
    /// Feedforward coefficient (current input)
    b: f32,
    /// Accumulator: previous output sample
    prev_y: f32,
}

impl Deemphasis {
    /// Create a de-emphasis filter.
    ///
    /// # Arguments
    ///
    /// * `sample_rate` - sample rate in Hz at the point the filter runs
    /// * `tau` - time constant in seconds (e.g. 75e-6)
    pub fn new(sample_rate: f32, tau: f32) -> Self {
        let dt = 1.0 / sample_rate;
        let decay = (-dt / tau).exp();
        Self {
            a: decay,
            b: 1.0 - decay,
            prev_y: 0.0,
        }
    }

    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        let mut y = Vec::with_capacity(samples.len());
        for &x in samples {
            let out = self.b * x + self.a * self.prev_y;
            y.push(out);
            self.prev_y = out;
        }
        y
    }

    /// Clear the accumulator.
    pub fn reset(&mut self) {
        self.prev_y = 0.0;
    }
}
