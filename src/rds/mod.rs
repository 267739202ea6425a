//! RDS subcarrier decoder.
//!
//! Consumes a demodulated, bit-sliced RDS stream one bit at a time and
//! maintains station data (program service name, radiotext) plus a store of
//! active TMC traffic messages. The pipeline is
//! [`sync::BlockSynchronizer`] → [`groups::GroupAssembler`] → per-group-type
//! parsers, with running counters over the whole chain.

pub mod groups;
pub mod sync;
pub mod tmc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use groups::{GroupAssembler, GroupVersion, RdsGroup, StationState};
use sync::BlockSynchronizer;
use tmc::{TmcEvent, TmcMessage, TmcStore};

/// Snapshot of the decoded station identity and text.
#[derive(Debug, Clone, Serialize)]
pub struct StationData {
    /// Program Identification code
    pub pi: Option<u16>,
    /// Program service name, once all four segments have arrived
    pub ps: Option<String>,
    /// Radiotext received so far
    pub rt: Option<String>,
    /// Program Type code
    pub pty: u8,
    /// Traffic Program flag
    pub tp: bool,
    /// Traffic Announcement flag
    pub ta: bool,
}

/// Running decoder counters. Monotonic until [`RdsDecoder::reset`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct DecoderStats {
    pub bits_processed: u64,
    pub sync_slips: u64,
    pub corrected_blocks: u64,
    pub valid_groups: u64,
    pub parse_errors: u64,
    pub group_8a_count: u64,
    pub messages_received: u64,
    pub messages_active: usize,
    pub last_message_at: Option<DateTime<Utc>>,
}

/// Complete RDS/TMC decoder for one station.
pub struct RdsDecoder {
    /// Subcarrier bit rate in bits/s, diagnostic only
    bit_rate: f32,
    synchronizer: BlockSynchronizer,
    assembler: GroupAssembler,
    station: StationState,
    tmc: TmcStore,
    bits_processed: u64,
    valid_groups: u64,
    parse_errors: u64,
    group_8a_count: u64,
}

impl RdsDecoder {
    /// Create a decoder; `bit_rate` is the subcarrier bit rate (1187.5 for
    /// broadcast RDS).
    pub fn new(bit_rate: f32) -> Self {
        Self {
            bit_rate,
            synchronizer: BlockSynchronizer::new(),
            assembler: GroupAssembler::new(),
            station: StationState::new(),
            tmc: TmcStore::new(),
            bits_processed: 0,
            valid_groups: 0,
            parse_errors: 0,
            group_8a_count: 0,
        }
    }

    pub fn bit_rate(&self) -> f32 {
        self.bit_rate
    }

    /// Feed sliced bits, one per byte (LSB), in received order.
    pub fn push_bits(&mut self, bits: &[u8]) {
        for &bit in bits {
            self.push_bit(bit);
        }
    }

    /// Feed a single bit.
    pub fn push_bit(&mut self, bit: u8) {
        self.bits_processed += 1;
        if let Some(block) = self.synchronizer.push_bit(bit) {
            if let Some(group) = self.assembler.push(block) {
                self.handle_group(group);
            }
        }
    }

    fn handle_group(&mut self, group: RdsGroup) {
        // A PI change mid-sequence marks the group as not ours
        if let Some(pi) = self.station.pi() {
            if group.pi() != pi {
                debug!(
                    established = format_args!("{:#06x}", pi),
                    received = format_args!("{:#06x}", group.pi()),
                    "PI mismatch, dropping group"
                );
                self.parse_errors += 1;
                return;
            }
        }
        // Version B groups repeat the PI in block C
        if group.version() == GroupVersion::B && group.blocks[2] != group.pi() {
            self.parse_errors += 1;
            return;
        }

        match (group.group_type(), group.version()) {
            (0, GroupVersion::A) | (0, GroupVersion::B) => {
                self.accept(&group);
                self.station.apply_ps(&group);
            }
            (2, GroupVersion::A) | (2, GroupVersion::B) => {
                self.accept(&group);
                self.station.apply_rt(&group);
            }
            (8, GroupVersion::A) => {
                self.accept(&group);
                self.group_8a_count += 1;
                let event = TmcEvent::from_group(&group);
                self.tmc.upsert(event, group.received_at);
            }
            _ => {
                // Unsupported type: dropped whole, nothing already accepted
                // may change
                debug!(
                    group_type = group.group_type(),
                    version = ?group.version(),
                    "unsupported group type, dropping"
                );
                self.parse_errors += 1;
            }
        }
    }

    /// Count a supported group and take its header fields.
    fn accept(&mut self, group: &RdsGroup) {
        self.valid_groups += 1;
        self.station.apply_header(group);
        debug!(
            pi = format_args!("{:#06x}", group.pi()),
            group_type = group.group_type(),
            version = ?group.version(),
            "decoded group"
        );
    }

    /// Current station identity and text.
    pub fn station_data(&self) -> StationData {
        StationData {
            pi: self.station.pi(),
            ps: self.station.ps_name(),
            rt: self.station.radiotext(),
            pty: self.station.pty(),
            tp: self.station.tp(),
            ta: self.station.ta(),
        }
    }

    /// Active traffic messages, expired entries evicted, sorted by severity
    /// descending then most-recent first.
    pub fn tmc_messages(&mut self) -> Vec<TmcMessage> {
        self.tmc_messages_at(Utc::now())
    }

    /// [`tmc_messages`](Self::tmc_messages) with an explicit clock, for
    /// deterministic expiry handling.
    pub fn tmc_messages_at(&mut self, now: DateTime<Utc>) -> Vec<TmcMessage> {
        self.tmc.messages_at(now)
    }

    /// Running counters.
    pub fn stats(&mut self) -> DecoderStats {
        self.stats_at(Utc::now())
    }

    /// [`stats`](Self::stats) with an explicit clock for the active-message
    /// count.
    pub fn stats_at(&mut self, now: DateTime<Utc>) -> DecoderStats {
        DecoderStats {
            bits_processed: self.bits_processed,
            sync_slips: self.synchronizer.sync_slips(),
            corrected_blocks: self.synchronizer.corrected_blocks(),
            valid_groups: self.valid_groups,
            parse_errors: self.parse_errors,
            group_8a_count: self.group_8a_count,
            messages_received: self.tmc.messages_received(),
            messages_active: self.tmc.active_count(now),
            last_message_at: self.tmc.last_message_at(),
        }
    }

    /// Clear all decoder state and counters. Idempotent.
    pub fn reset(&mut self) {
        self.synchronizer.reset();
        self.assembler.reset();
        self.station.reset();
        self.tmc.reset();
        self.bits_processed = 0;
        self.valid_groups = 0;
        self.parse_errors = 0;
        self.group_8a_count = 0;
    }
}
