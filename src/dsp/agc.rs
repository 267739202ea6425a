//! Automatic Gain Control.
//!
//! Single-pole IIR gain tracker that drives the output envelope toward a
//! configurable target level. Three response presets (slow / medium / fast)
//! map to loop bandwidths; `Off` is unity gain. The envelope is tracked with
//! an exponential moving average and the gain correction is scaled by the
//! loop bandwidth, following the liquid-dsp `agc` design.

use crate::config::AgcMode;

/// Automatic gain control for real-valued audio.
#[derive(Debug, Clone)]
pub struct Agc {
    /// Response preset
    mode: AgcMode,
    /// Target output amplitude, [0, 1]
    target: f32,
    /// Loop bandwidth derived from the preset
    bandwidth: f32,
    /// Current gain value
    gain: f32,
    /// Envelope estimate
    envelope: f32,
    /// Gain clamp to prevent noise amplification blow-up
    gain_min: f32,
    gain_max: f32,
}

impl Agc {
    pub fn new(mode: AgcMode, target: f32) -> Self {
        Self {
            mode,
            target,
            bandwidth: mode.bandwidth(),
            gain: 1.0,
            envelope: 1.0,
            gain_min: 1e-6,
            gain_max: 1e6,
        }
    }

    /// Current gain (1.0 immediately after construction or reset).
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Current envelope estimate.
    pub fn envelope(&self) -> f32 {
        self.envelope
    }

    pub fn mode(&self) -> AgcMode {
        self.mode
    }

    /// Return to construction state.
    pub fn reset(&mut self) {
        self.gain = 1.0;
        self.envelope = 1.0;
    }

    /// Process one sample.
    pub fn execute(&mut self, x: f32) -> f32 {
        if self.mode == AgcMode::Off {
            return x;
        }

        let out = x * self.gain;

        // Envelope tracking: exponential moving average of |out|
        let mag = out.abs();
        self.envelope = (1.0 - self.bandwidth) * self.envelope + self.bandwidth * mag;

        if self.envelope > 1e-10 {
            let error = self.target / self.envelope;
            self.gain *= 1.0 + self.bandwidth * (error - 1.0);
            self.gain = self.gain.clamp(self.gain_min, self.gain_max);
        }

        out
    }

    /// Process a block of samples in place order, returning the scaled block.
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        samples.iter().map(|&x| self.execute(x)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agc_off_is_unity() {
        let mut agc = Agc::new(AgcMode::Off, 0.5);
        let input = vec![0.1, -0.7, 0.3];
        assert_eq!(agc.process(&input), input);
        assert_eq!(agc.gain(), 1.0);
    }

    #[test]
    fn test_agc_amplifies_weak_signal() {
        let mut agc = Agc::new(AgcMode::Fast, 0.5);
        for _ in 0..2000 {
            agc.execute(0.05);
        }
        assert!(agc.gain() > 1.0, "gain {} should exceed unity", agc.gain());
        let out = agc.execute(0.05);
        assert!((out - 0.5).abs() < 0.1, "output {} should approach target", out);
    }

    #[test]
    fn test_agc_attenuates_strong_signal() {
        let mut agc = Agc::new(AgcMode::Fast, 0.5);
        for _ in 0..2000 {
            agc.execute(5.0);
        }
        assert!(agc.gain() < 1.0, "gain {} should be below unity", agc.gain());
    }

    #[test]
    fn test_agc_preset_speed() {
        // Fast preset converges further than slow over the same samples
        let mut fast = Agc::new(AgcMode::Fast, 0.5);
        let mut slow = Agc::new(AgcMode::Slow, 0.5);
        for _ in 0..500 {
            fast.execute(0.05);
            slow.execute(0.05);
        }
        assert!(fast.gain() > slow.gain());
    }

    #[test]
    fn test_agc_reset_restores_initial_gain() {
        let mut agc = Agc::new(AgcMode::Fast, 0.5);
        for _ in 0..500 {
            agc.execute(0.05);
        }
        assert!((agc.gain() - 1.0).abs() > 0.1);
        agc.reset();
        assert_eq!(agc.gain(), 1.0);
        assert_eq!(agc.envelope(), 1.0);
    }

    #[test]
    fn test_agc_silence_does_not_blow_up() {
        let mut agc = Agc::new(AgcMode::Fast, 0.5);
        for _ in 0..10_000 {
            let out = agc.execute(0.0);
            assert!(out.is_finite());
        }
        assert!(agc.gain().is_finite());
    }
}
