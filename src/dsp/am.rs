//! AM demodulation blocks.
//!
//! Envelope detection (`sqrt(i^2 + q^2)`) followed by a slow single-pole DC
//! blocker to remove the carrier component from the audio.

use num_complex::Complex;

/// AM envelope detector.
///
/// Non-finite sample components are treated as silence (zero magnitude).
pub struct EnvelopeDetector;

impl EnvelopeDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn process(&mut self, samples: &[Complex<f32>]) -> Vec<f32> {
        samples
            .iter()
            .map(|s| {
                if s.re.is_finite() && s.im.is_finite() {
                    (s.re * s.re + s.im * s.im).sqrt()
                } else {
                    0.0
                }
            })
            .collect()
    }
}

impl Default for EnvelopeDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// DC blocker: subtracts a slow single-pole IIR estimate of the mean.
///
/// `dc[n] = (1 - alpha) * dc[n-1] + alpha * x[n]`, output `x[n] - dc[n]`.
pub struct DcBlocker {
    /// Tracking rate of the DC estimate
    alpha: f32,
    /// Running DC estimate
    dc: f32,
}

impl DcBlocker {
    /// Create a DC blocker.
    ///
    /// # Arguments
    ///
    /// * `alpha` - smoothing factor in (0, 1]; small values track slowly
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(1e-6, 1.0),
            dc: 0.0,
        }
    }

    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        let mut out = Vec::with_capacity(samples.len());
        for &x in samples {
            self.dc = (1.0 - self.alpha) * self.dc + self.alpha * x;
            out.push(x - self.dc);
        }
        out
    }

    /// Current DC estimate.
    pub fn dc_estimate(&self) -> f32 {
        self.dc
    }

    pub fn reset(&mut self) {
        self.dc = 0.0;
    }
}
