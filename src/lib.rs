#![doc = include_str!("../readme.md")]

pub mod config;
pub mod demod;
pub mod dsp;
pub mod error;
pub mod rds;

pub use config::{AgcMode, DemodConfig, DemodType};
pub use demod::{AudioChunk, DemodulatorBank};
pub use error::{Error, Result};
pub use rds::tmc::{Severity, TmcMessage};
pub use rds::{DecoderStats, RdsDecoder, StationData};
