//! Magnitude squelch gate.
//!
//! Tracks the post-demodulation signal magnitude with a single-pole IIR and
//! hard-zeroes the output while the estimate sits below the threshold.
//! Threshold 0 disables the gate entirely. The measurement runs on the
//! demodulated signal before AGC, so the gate decision is independent of the
//! gain tracker state.

/// Squelch gate on demodulated audio magnitude.
#[derive(Debug, Clone)]
pub struct Squelch {
    /// Gate threshold on the magnitude estimate, [0, 1]; 0 disables
    threshold: f32,
    /// Smoothing factor for the magnitude estimate
    alpha: f32,
    /// Smoothed magnitude estimate
    magnitude: f32,
    /// Whether the gate is currently open
    open: bool,
}

impl Squelch {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            alpha: 0.05,
            magnitude: 0.0,
            open: threshold == 0.0,
        }
    }

    /// Whether audio is currently passing.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Current magnitude estimate.
    pub fn magnitude(&self) -> f32 {
        self.magnitude
    }

    pub fn reset(&mut self) {
        self.magnitude = 0.0;
        self.open = self.threshold == 0.0;
    }

    /// Gate a block of samples, zeroing everything below threshold.
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        if self.threshold == 0.0 {
            self.open = true;
            return samples.to_vec();
        }

        let mut out = Vec::with_capacity(samples.len());
        for &x in samples {
            self.magnitude = (1.0 - self.alpha) * self.magnitude + self.alpha * x.abs();
            self.open = self.magnitude >= self.threshold;
            out.push(if self.open { x } else { 0.0 });
        }
        out
    }
}
