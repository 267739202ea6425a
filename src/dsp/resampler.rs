//! Linear-interpolation rate conversion.
//!
//! Converts between the capture rate and the requested audio output rate by
//! walking the input at a fractional step and linearly interpolating between
//! neighboring samples. The output length follows a fixed law:
//! `floor(input_len / (input_rate / output_rate))`, and equal rates are a
//! bit-exact identity. The fractional read position carries across chunks so
//! a continuous stream resamples without phase jumps.

/// Linear-interpolation resampler (decimation or upsampling).
#[derive(Debug, Clone)]
pub struct LinearResampler {
    /// Input samples advanced per output sample
    step: f64,
    /// Fractional read position within the current chunk, carried over
    phase: f64,
    /// Last input sample of the previous chunk, for interpolation across
    /// the chunk boundary
    tail: f32,
    /// Whether `tail` holds a sample yet
    primed: bool,
    identity: bool,
}

impl LinearResampler {
    /// Create a resampler from `input_rate` to `output_rate` (both in Hz).
    ///
    /// Rates are assumed already validated; equal rates select the identity
    /// path.
    pub fn new(input_rate: f64, output_rate: f64) -> Self {
        let identity = (input_rate - output_rate).abs() < f64::EPSILON;
        Self {
            step: input_rate / output_rate,
            phase: 0.0,
            tail: 0.0,
            primed: false,
            identity,
        }
    }

    /// Number of output samples produced for `input_len` input samples.
    pub fn output_len(&self, input_len: usize) -> usize {
        if self.identity {
            input_len
        } else {
            (input_len as f64 / self.step).floor() as usize
        }
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.tail = 0.0;
        self.primed = false;
    }

    /// Resample one chunk.
    ///
    /// Empty input yields empty output. The output length is exactly
    /// [`output_len`](Self::output_len) of the input length.
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        if self.identity {
            return samples.to_vec();
        }
        if samples.is_empty() {
            return Vec::new();
        }

        let out_len = self.output_len(samples.len());
        let mut out = Vec::with_capacity(out_len);

        // Read position -1.0..0.0 refers to the carried tail sample
        let mut pos = self.phase - if self.primed { 1.0 } else { 0.0 };

        for _ in 0..out_len {
            let idx = pos.floor();
            let frac = (pos - idx) as f32;
            let (a, b) = if idx < 0.0 {
                (self.tail, samples[0])
            } else {
                let i = idx as usize;
                let i = i.min(samples.len() - 1);
                let j = (i + 1).min(samples.len() - 1);
                (samples[i], samples[j])
            };
            out.push(a + (b - a) * frac);
            pos += self.step;
        }

        // Carry the read position into the next chunk, where the carried
        // tail sample will sit at relative position -1. The fixed per-call
        // output length can leave the position slightly behind the chunk
        // boundary; snap forward so lag never accumulates.
        self.phase = (pos - samples.len() as f64 + 1.0).max(0.0);
        self.tail = samples[samples.len() - 1];
        self.primed = true;

        out
    }
}
