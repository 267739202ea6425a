//! Demodulator bank.
//!
//! [`DemodulatorBank`] turns raw complex baseband samples into audio for one
//! tuned channel. Each call runs a fixed pipeline: per-mode demodulation
//! (phase discrimination + de-emphasis for the FM family, envelope detection
//! + DC removal for AM, I-channel pass-through for SSB/CW) → squelch
//! (measured on the post-demodulation, pre-AGC magnitude) → AGC → resampling
//! to the requested output rate → volume → channel duplication.
//!
//! All filter state is owned by the current mode; switching modes between
//! calls discards and reinitializes it, so no memory crosses a mode
//! boundary. The decode path never fails: the only error surfaced is
//! fail-fast configuration validation.

use num_complex::Complex;
use serde::Serialize;
use tracing::debug;

use crate::config::{DemodConfig, DemodType};
use crate::dsp::agc::Agc;
use crate::dsp::am::{DcBlocker, EnvelopeDetector};
use crate::dsp::fm::{Deemphasis, PhaseDiscriminator};
use crate::dsp::resampler::LinearResampler;
use crate::dsp::squelch::Squelch;
use crate::error::Result;

/// One chunk of demodulated audio, handed to the external playback or
/// transcription collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct AudioChunk {
    /// Demodulated samples, interleaved when `channels == 2`
    pub samples: Vec<f32>,
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Channel count (1 or 2)
    pub channels: u8,
    /// Mode that produced this chunk
    pub demod: DemodType,
    /// Monotonically increasing handle for the playback buffer consumer
    pub buffer_id: u64,
}

/// Per-mode filter chain. Rebuilt from scratch on every mode or
/// configuration switch.
enum ModeState {
    Fm {
        discriminator: PhaseDiscriminator,
        deemphasis: Option<Deemphasis>,
    },
    Am {
        envelope: EnvelopeDetector,
        dc: DcBlocker,
    },
    /// USB / LSB / CW: linear pass-through of the I channel, no true
    /// sideband mixing
    Passthrough,
    Silence,
}

/// Stateful demodulation bank for one channel.
pub struct DemodulatorBank {
    /// Capture sample rate in Hz, fixed at construction
    input_rate: f64,
    /// Mode of the currently held filter state
    current_mode: Option<DemodType>,
    mode_state: ModeState,
    squelch: Squelch,
    agc: Agc,
    resampler: LinearResampler,
    /// Config snapshot the filter chain was built for
    active_config: Option<DemodConfig>,
    next_buffer_id: u64,
}

impl DemodulatorBank {
    /// Create a bank for the given capture sample rate.
    pub fn new(input_rate: f64) -> Result<Self> {
        if !(input_rate.is_finite() && input_rate > 0.0) {
            return Err(crate::Error::config(format!(
                "input sample rate must be positive, got {}",
                input_rate
            )));
        }
        let default = DemodConfig::default();
        Ok(Self {
            input_rate,
            current_mode: None,
            mode_state: ModeState::Silence,
            squelch: Squelch::new(default.squelch_threshold),
            agc: Agc::new(default.agc_mode, default.agc_target),
            resampler: LinearResampler::new(input_rate, default.output_rate as f64),
            active_config: None,
            next_buffer_id: 0,
        })
    }

    /// Capture sample rate this bank was built for.
    pub fn input_rate(&self) -> f64 {
        self.input_rate
    }

    /// Demodulate one chunk of IQ samples.
    ///
    /// Switching `demod` (or changing the configuration) between calls
    /// discards all per-mode filter state. Empty input yields an empty
    /// chunk; samples with non-finite components are treated as silence.
    pub fn extract_audio(
        &mut self,
        samples: &[Complex<f32>],
        demod: DemodType,
        config: &DemodConfig,
    ) -> Result<AudioChunk> {
        config.validate()?;

        let config_changed = self
            .active_config
            .as_ref()
            .map_or(true, |c| !config_matches(c, config));
        if self.current_mode != Some(demod) || config_changed {
            self.rebuild(demod, config);
        }

        let demodulated = self.run_mode(samples);
        let gated = self.squelch.process(&demodulated);
        let leveled = self.agc.process(&gated);
        let resampled = self.resampler.process(&leveled);

        let volume = config.volume;
        let mut audio = Vec::with_capacity(resampled.len() * config.channels as usize);
        for &s in &resampled {
            let v = s * volume;
            audio.push(v);
            if config.channels == 2 {
                audio.push(v);
            }
        }

        let buffer_id = self.next_buffer_id;
        self.next_buffer_id += 1;

        Ok(AudioChunk {
            samples: audio,
            sample_rate: config.output_rate,
            channels: config.channels,
            demod,
            buffer_id,
        })
    }

    /// Clear all demodulator state back to initial values. Idempotent.
    pub fn reset(&mut self) {
        self.current_mode = None;
        self.mode_state = ModeState::Silence;
        self.active_config = None;
        self.squelch.reset();
        self.agc.reset();
        self.resampler.reset();
    }

    fn rebuild(&mut self, demod: DemodType, config: &DemodConfig) {
        debug!(mode = ?demod, "rebuilding demodulator state");
        self.mode_state = match demod {
            DemodType::Fm | DemodType::Nfm | DemodType::Wfm => ModeState::Fm {
                discriminator: PhaseDiscriminator::new(),
                deemphasis: if config.deemphasis_enabled {
                    Some(Deemphasis::new(
                        self.input_rate as f32,
                        config.deemphasis_tau(demod),
                    ))
                } else {
                    None
                },
            },
            DemodType::Am => ModeState::Am {
                envelope: EnvelopeDetector::new(),
                dc: DcBlocker::new(0.001),
            },
            DemodType::Usb | DemodType::Lsb | DemodType::Cw => ModeState::Passthrough,
            DemodType::None => ModeState::Silence,
        };
        self.squelch = Squelch::new(config.squelch_threshold);
        self.agc = Agc::new(config.agc_mode, config.agc_target);
        self.resampler = LinearResampler::new(self.input_rate, config.output_rate as f64);
        self.current_mode = Some(demod);
        self.active_config = Some(config.clone());
    }

    fn run_mode(&mut self, samples: &[Complex<f32>]) -> Vec<f32> {
        match &mut self.mode_state {
            ModeState::Fm {
                discriminator,
                deemphasis,
            } => {
                let phase = discriminator.process(samples);
                match deemphasis {
                    Some(filter) => filter.process(&phase),
                    None => phase,
                }
            }
            ModeState::Am { envelope, dc } => {
                let env = envelope.process(samples);
                dc.process(&env)
            }
            ModeState::Passthrough => samples
                .iter()
                .map(|s| if s.re.is_finite() { s.re } else { 0.0 })
                .collect(),
            ModeState::Silence => vec![0.0; samples.len()],
        }
    }
}

/// Compare the fields that require rebuilding the filter chain.
fn config_matches(a: &DemodConfig, b: &DemodConfig) -> bool {
    a.agc_mode == b.agc_mode
        && a.agc_target == b.agc_target
        && a.squelch_threshold == b.squelch_threshold
        && a.deemphasis_enabled == b.deemphasis_enabled
        && a.deemphasis_tau_us == b.deemphasis_tau_us
        && a.output_rate == b.output_rate
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn passthrough_config() -> DemodConfig {
        DemodConfig {
            agc_mode: crate::AgcMode::Off,
            squelch_threshold: 0.0,
            output_rate: 48_000,
            ..DemodConfig::default()
        }
    }

    #[test]
    fn test_empty_input_every_mode() {
        let mut bank = DemodulatorBank::new(48_000.0).unwrap();
        let config = passthrough_config();
        for demod in [
            DemodType::Fm,
            DemodType::Nfm,
            DemodType::Wfm,
            DemodType::Am,
            DemodType::Usb,
            DemodType::Lsb,
            DemodType::Cw,
            DemodType::None,
        ] {
            let chunk = bank.extract_audio(&[], demod, &config).unwrap();
            assert_eq!(chunk.samples.len(), 0, "mode {:?}", demod);
        }
    }

    #[test]
    fn test_output_record_fields() {
        let mut bank = DemodulatorBank::new(48_000.0).unwrap();
        let config = passthrough_config();
        let iq = vec![Complex::new(0.5, 0.0); 64];
        let chunk = bank.extract_audio(&iq, DemodType::Usb, &config).unwrap();
        assert_eq!(chunk.sample_rate, 48_000);
        assert_eq!(chunk.channels, 1);
        assert_eq!(chunk.demod, DemodType::Usb);
        let next = bank.extract_audio(&iq, DemodType::Usb, &config).unwrap();
        assert_eq!(next.buffer_id, chunk.buffer_id + 1);
    }

    #[test]
    fn test_passthrough_is_identity_at_equal_rates() {
        let mut bank = DemodulatorBank::new(48_000.0).unwrap();
        let config = passthrough_config();
        let iq: Vec<Complex<f32>> = (0..16).map(|i| Complex::new(i as f32 * 0.01, 9.9)).collect();
        let chunk = bank.extract_audio(&iq, DemodType::Usb, &config).unwrap();
        for (out, input) in chunk.samples.iter().zip(&iq) {
            assert_relative_eq!(*out, input.re);
        }
    }

    #[test]
    fn test_nonfinite_samples_are_silence() {
        let mut bank = DemodulatorBank::new(48_000.0).unwrap();
        let config = passthrough_config();
        let iq = vec![Complex::new(f32::NAN, f32::INFINITY); 8];
        let chunk = bank.extract_audio(&iq, DemodType::Usb, &config).unwrap();
        assert!(chunk.samples.iter().all(|&s| s == 0.0));
        let chunk = bank.extract_audio(&iq, DemodType::Am, &config).unwrap();
        assert!(chunk.samples.iter().all(|&s| s.is_finite()));
    }

    #[test]
    fn test_none_mode_is_silence() {
        let mut bank = DemodulatorBank::new(48_000.0).unwrap();
        let config = passthrough_config();
        let iq = vec![Complex::new(0.9, -0.4); 32];
        let chunk = bank.extract_audio(&iq, DemodType::None, &config).unwrap();
        assert_eq!(chunk.samples.len(), 32);
        assert!(chunk.samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_mode_switch_discards_filter_state() {
        // Run a loud signal through AM with fast AGC, then switch to USB and
        // back: the AGC gain must restart at its initial value.
        let config = DemodConfig {
            agc_mode: crate::AgcMode::Fast,
            squelch_threshold: 0.0,
            ..DemodConfig::default()
        };
        let mut bank = DemodulatorBank::new(48_000.0).unwrap();
        let loud = vec![Complex::new(0.9, 0.0); 2048];

        let first = bank.extract_audio(&loud, DemodType::Usb, &config).unwrap();
        assert!((bank.agc.gain() - 1.0).abs() > 1e-3, "gain should have moved");

        let _ = bank.extract_audio(&loud, DemodType::Am, &config).unwrap();
        let again = bank.extract_audio(&loud, DemodType::Usb, &config).unwrap();
        // Identical input after a mode round-trip produces identical output
        assert_eq!(first.samples.len(), again.samples.len());
        for (a, b) in first.samples.iter().zip(&again.samples) {
            assert_relative_eq!(*a, *b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_decimation_length_law() {
        let mut bank = DemodulatorBank::new(240_000.0).unwrap();
        let config = passthrough_config();
        let iq = vec![Complex::new(0.1, 0.0); 1000];
        let chunk = bank.extract_audio(&iq, DemodType::Usb, &config).unwrap();
        // floor(1000 / (240000/48000)) = 200
        assert_eq!(chunk.samples.len(), 200);
    }

    #[test]
    fn test_stereo_duplication_and_volume() {
        let mut bank = DemodulatorBank::new(48_000.0).unwrap();
        let config = DemodConfig {
            channels: 2,
            volume: 0.5,
            ..passthrough_config()
        };
        let iq = vec![Complex::new(0.8, 0.0); 10];
        let chunk = bank.extract_audio(&iq, DemodType::Usb, &config).unwrap();
        assert_eq!(chunk.samples.len(), 20);
        for pair in chunk.samples.chunks_exact(2) {
            assert_relative_eq!(pair[0], pair[1]);
            assert_relative_eq!(pair[0], 0.4, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_squelch_zeroes_weak_signal() {
        let mut bank = DemodulatorBank::new(48_000.0).unwrap();
        let config = DemodConfig {
            squelch_threshold: 0.5,
            agc_mode: crate::AgcMode::Off,
            ..DemodConfig::default()
        };
        let weak = vec![Complex::new(0.001, 0.0); 256];
        let chunk = bank.extract_audio(&weak, DemodType::Usb, &config).unwrap();
        assert!(chunk.samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let mut bank = DemodulatorBank::new(48_000.0).unwrap();
        let config = DemodConfig {
            volume: 2.0,
            ..DemodConfig::default()
        };
        let err = bank
            .extract_audio(&[Complex::new(0.0, 0.0)], DemodType::Fm, &config)
            .unwrap_err();
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_invalid_input_rate() {
        assert!(DemodulatorBank::new(0.0).is_err());
        assert!(DemodulatorBank::new(f64::NAN).is_err());
    }

    #[test]
    fn test_reset_idempotent() {
        let mut bank = DemodulatorBank::new(48_000.0).unwrap();
        let config = passthrough_config();
        let iq = vec![Complex::new(0.5, 0.5); 128];
        let _ = bank.extract_audio(&iq, DemodType::Wfm, &config).unwrap();
        bank.reset();
        bank.reset();
        assert!(bank.current_mode.is_none());
    }
}
