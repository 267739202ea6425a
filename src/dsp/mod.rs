//! Digital signal processing building blocks.
//!
//! Stateful filters used by the demodulation bank. Every block processes one
//! chunk synchronously, keeps its state across calls, and exposes `reset()`
//! to return to construction state.
//!
//! # Modules
//! - `fm`: phase discriminator and de-emphasis filter for the FM family.
//! - `am`: envelope detector and DC blocker.
//! - `agc`: automatic gain control presets.
//! - `squelch`: magnitude gate.
//! - `resampler`: linear-interpolation rate conversion.

pub mod agc;
pub mod am;
pub mod fm;
pub mod resampler;
pub mod squelch;
