//! Demodulator configuration.
//!
//! All recognized options for the audio path live here. Validation happens
//! once, up front: [`DemodConfig::validate`] rejects out-of-range parameters
//! with a descriptive [`Error::Config`](crate::Error) so the decode path
//! itself never has to fail.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Demodulation mode.
///
/// `Usb`, `Lsb` and `Cw` are a linear pass-through of the I channel: no true
/// sideband mixing is performed. `None` produces silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DemodType {
    Fm,
    Nfm,
    Wfm,
    Am,
    Usb,
    Lsb,
    Cw,
    None,
}

impl DemodType {
    /// Default de-emphasis time constant for this mode, in microseconds.
    ///
    /// 75 µs is the North American broadcast standard (50 µs in Europe,
    /// selectable through [`DemodConfig::deemphasis_tau_us`]). NFM voice
    /// channels use a longer constant.
    pub fn default_deemphasis_tau_us(self) -> f32 {
        match self {
            DemodType::Nfm => 300.0,
            _ => 75.0,
        }
    }

    /// Whether this mode applies de-emphasis at all.
    pub fn uses_deemphasis(self) -> bool {
        matches!(self, DemodType::Fm | DemodType::Nfm | DemodType::Wfm)
    }
}

/// AGC response preset.
///
/// Each preset is a single-pole IIR envelope tracker; `Off` is unity gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgcMode {
    Off,
    Slow,
    Medium,
    Fast,
}

impl AgcMode {
    /// Loop bandwidth for the gain tracker (fraction of the sample rate).
    pub fn bandwidth(self) -> f32 {
        match self {
            AgcMode::Off => 0.0,
            AgcMode::Slow => 0.001,
            AgcMode::Medium => 0.01,
            AgcMode::Fast => 0.1,
        }
    }
}

/// Configuration for one demodulation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemodConfig {
    /// AGC preset (Off = unity gain)
    pub agc_mode: AgcMode,
    /// AGC target output level, in [0, 1]
    pub agc_target: f32,
    /// Squelch threshold on post-demodulation magnitude, in [0, 1]; 0 disables
    pub squelch_threshold: f32,
    /// Apply de-emphasis after FM discrimination
    pub deemphasis_enabled: bool,
    /// De-emphasis time constant in microseconds; `None` uses the per-mode default
    pub deemphasis_tau_us: Option<f32>,
    /// Requested audio output sample rate in Hz
    pub output_rate: u32,
    /// Output channel count (1 = mono, 2 = duplicated stereo)
    pub channels: u8,
    /// Output volume scale, in [0, 1]
    pub volume: f32,
}

impl Default for DemodConfig {
    fn default() -> Self {
        Self {
            agc_mode: AgcMode::Medium,
            agc_target: 0.5,
            squelch_threshold: 0.0,
            deemphasis_enabled: true,
            deemphasis_tau_us: None,
            output_rate: 48_000,
            channels: 1,
            volume: 1.0,
        }
    }
}

impl DemodConfig {
    /// Validate all parameters, failing fast on the first problem.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.agc_target) || !self.agc_target.is_finite() {
            return Err(Error::config(format!(
                "AGC target level must be in [0, 1], got {}",
                self.agc_target
            )));
        }
        if !(0.0..=1.0).contains(&self.squelch_threshold) || !self.squelch_threshold.is_finite() {
            return Err(Error::config(format!(
                "squelch threshold must be in [0, 1], got {}",
                self.squelch_threshold
            )));
        }
        if let Some(tau) = self.deemphasis_tau_us {
            if !tau.is_finite() || tau <= 0.0 {
                return Err(Error::config(format!(
                    "de-emphasis time constant must be positive, got {} us",
                    tau
                )));
            }
        }
        if self.output_rate == 0 {
            return Err(Error::config("output sample rate must be non-zero"));
        }
        if !(1..=2).contains(&self.channels) {
            return Err(Error::config(format!(
                "channel count must be 1 or 2, got {}",
                self.channels
            )));
        }
        if !(0.0..=1.0).contains(&self.volume) || !self.volume.is_finite() {
            return Err(Error::config(format!(
                "volume must be in [0, 1], got {}",
                self.volume
            )));
        }
        Ok(())
    }

    /// Effective de-emphasis time constant in seconds for the given mode.
    pub fn deemphasis_tau(&self, demod: DemodType) -> f32 {
        self.deemphasis_tau_us
            .unwrap_or_else(|| demod.default_deemphasis_tau_us())
            * 1e-6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(DemodConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_agc_target() {
        let config = DemodConfig {
            agc_target: 1.5,
            ..DemodConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("AGC target"));
    }

    #[test]
    fn test_invalid_squelch_threshold() {
        let config = DemodConfig {
            squelch_threshold: -0.1,
            ..DemodConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_channel_count() {
        let config = DemodConfig {
            channels: 3,
            ..DemodConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_output_rate() {
        let config = DemodConfig {
            output_rate: 0,
            ..DemodConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_volume() {
        let config = DemodConfig {
            volume: f32::NAN,
            ..DemodConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deemphasis_defaults_per_mode() {
        let config = DemodConfig::default();
        // NFM uses a distinct, longer default than WFM
        assert!(config.deemphasis_tau(DemodType::Nfm) > config.deemphasis_tau(DemodType::Wfm));

        let eu = DemodConfig {
            deemphasis_tau_us: Some(50.0),
            ..DemodConfig::default()
        };
        approx::assert_relative_eq!(eu.deemphasis_tau(DemodType::Wfm), 50e-6);
    }

    #[test]
    fn test_agc_bandwidth_ordering() {
        assert!(AgcMode::Fast.bandwidth() > AgcMode::Medium.bandwidth());
        assert!(AgcMode::Medium.bandwidth() > AgcMode::Slow.bandwidth());
        assert_eq!(AgcMode::Off.bandwidth(), 0.0);
    }
}
