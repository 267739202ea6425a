//! RDS group assembly and text parsing.
//!
//! Validated blocks arrive one at a time from the synchronizer; four
//! consecutive blocks in A → B → C → D slot order form a group. The group
//! header (block B) carries a 4-bit group type and a version bit; dispatch on
//! that pair routes the payload to the program-service name assembler (type
//! 0), the radiotext assembler (type 2), or the traffic-message channel
//! (type 8A, handled by the caller).

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::sync::{BlockSlot, SyncedBlock};

/// Group version, bit 11 of block B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupVersion {
    A,
    B,
}

/// One assembled RDS group: four 16-bit information words plus the time its
/// final block landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RdsGroup {
    pub blocks: [u16; 4],
    pub received_at: DateTime<Utc>,
}

impl RdsGroup {
    /// Program Identification code, block A.
    pub fn pi(&self) -> u16 {
        self.blocks[0]
    }

    /// Group type, bits 15..12 of block B.
    pub fn group_type(&self) -> u8 {
        (self.blocks[1] >> 12) as u8
    }

    /// Version bit 11 of block B.
    pub fn version(&self) -> GroupVersion {
        if self.blocks[1] & 0x0800 == 0 {
            GroupVersion::A
        } else {
            GroupVersion::B
        }
    }

    /// Traffic Program flag, bit 10 of block B.
    pub fn tp(&self) -> bool {
        self.blocks[1] & 0x0400 != 0
    }

    /// Program Type code, bits 9..5 of block B.
    pub fn pty(&self) -> u8 {
        ((self.blocks[1] >> 5) & 0x1F) as u8
    }
}

/// Collects validated blocks into groups.
///
/// A block A always restarts assembly; a block arriving out of slot order
/// discards the partial group.
#[derive(Debug, Clone, Default)]
pub struct GroupAssembler {
    pending: Vec<u16>,
}

impl GroupAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.pending.clear();
    }

    /// Push one validated block; returns a group when its D block lands.
    pub fn push(&mut self, block: SyncedBlock) -> Option<RdsGroup> {
        let expected = match self.pending.len() {
            0 => BlockSlot::A,
            1 => BlockSlot::B,
            2 => BlockSlot::C,
            _ => BlockSlot::D,
        };

        if block.slot == BlockSlot::A {
            // A new group starts regardless of any partial one
            if !self.pending.is_empty() {
                debug!(collected = self.pending.len(), "discarding partial group");
            }
            self.pending.clear();
            self.pending.push(block.data);
            return None;
        }

        if block.slot != expected {
            debug!(got = ?block.slot, want = ?expected, "block out of order, dropping partial group");
            self.pending.clear();
            return None;
        }

        self.pending.push(block.data);
        if self.pending.len() == 4 {
            let group = RdsGroup {
                blocks: [
                    self.pending[0],
                    self.pending[1],
                    self.pending[2],
                    self.pending[3],
                ],
                received_at: Utc::now(),
            };
            self.pending.clear();
            return Some(group);
        }
        None
    }
}

const PS_LEN: usize = 8;
const RT_LEN: usize = 64;

/// Program-service name and radiotext assembled from type 0 and type 2
/// groups, plus the station header fields.
#[derive(Debug, Clone)]
pub struct StationState {
    pi: Option<u16>,
    pty: u8,
    tp: bool,
    ta: bool,
    ps: [u8; PS_LEN],
    ps_segments: u8,
    rt: [u8; RT_LEN],
    rt_segments: u16,
    /// Whether a CR terminator has been written into the radiotext buffer
    rt_terminated: bool,
    /// A/B flag of the last type 2 group, used to detect message changes
    rt_flag: Option<bool>,
}

impl Default for StationState {
    fn default() -> Self {
        Self {
            pi: None,
            pty: 0,
            tp: false,
            ta: false,
            ps: [b' '; PS_LEN],
            ps_segments: 0,
            rt: [b' '; RT_LEN],
            rt_segments: 0,
            rt_terminated: false,
            rt_flag: None,
        }
    }
}

impl StationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn pi(&self) -> Option<u16> {
        self.pi
    }

    pub fn pty(&self) -> u8 {
        self.pty
    }

    pub fn tp(&self) -> bool {
        self.tp
    }

    pub fn ta(&self) -> bool {
        self.ta
    }

    /// Record the header fields every group carries.
    pub fn apply_header(&mut self, group: &RdsGroup) {
        self.pi = Some(group.pi());
        self.pty = group.pty();
        self.tp = group.tp();
    }

    /// Apply a type 0 group (program service name).
    ///
    /// Block B bits 1..0 select the two-character segment; version A and B
    /// both carry the characters in block D.
    pub fn apply_ps(&mut self, group: &RdsGroup) {
        self.ta = group.blocks[1] & 0x0010 != 0;
        let segment = (group.blocks[1] & 0x0003) as usize;
        let chars = group.blocks[3].to_be_bytes();
        for (k, &ch) in chars.iter().enumerate() {
            if !ch.is_ascii() {
                warn!(byte = ch, position = segment * 2 + k, "non-ASCII program service character");
            }
            self.ps[segment * 2 + k] = ch;
        }
        self.ps_segments |= 1 << segment;
    }

    /// Apply a type 2 group (radiotext).
    ///
    /// Version A carries four characters per group (blocks C and D), version
    /// B two (block D only). A toggled A/B flag or a fresh segment 0 after a
    /// terminated message clears the buffer first.
    pub fn apply_rt(&mut self, group: &RdsGroup) {
        let flag = group.blocks[1] & 0x0010 != 0;
        if self.rt_flag.map_or(false, |f| f != flag) {
            self.clear_rt();
        }
        self.rt_flag = Some(flag);

        let segment = (group.blocks[1] & 0x000F) as usize;
        if segment == 0 && self.rt_terminated {
            self.clear_rt();
        }

        let (start, chars): (usize, Vec<u8>) = match group.version() {
            GroupVersion::A => {
                let mut v = Vec::with_capacity(4);
                v.extend_from_slice(&group.blocks[2].to_be_bytes());
                v.extend_from_slice(&group.blocks[3].to_be_bytes());
                (segment * 4, v)
            }
            GroupVersion::B => (segment * 2, group.blocks[3].to_be_bytes().to_vec()),
        };

        for (k, &ch) in chars.iter().enumerate() {
            if start + k >= RT_LEN {
                break;
            }
            if ch == b'\r' {
                self.rt_terminated = true;
            }
            self.rt[start + k] = ch;
        }
        self.rt_segments |= 1 << segment;
    }

    fn clear_rt(&mut self) {
        self.rt = [b' '; RT_LEN];
        self.rt_segments = 0;
        self.rt_terminated = false;
    }

    /// Program service name, available once all four segments have been
    /// received.
    pub fn ps_name(&self) -> Option<String> {
        if self.ps_segments == 0b1111 {
            Some(String::from_utf8_lossy(&self.ps).into_owned())
        } else {
            None
        }
    }

    /// Radiotext received so far, truncated at the first carriage return,
    /// with trailing padding removed. `None` until any segment arrives.
    pub fn radiotext(&self) -> Option<String> {
        if self.rt_segments == 0 {
            return None;
        }
        let end = self
            .rt
            .iter()
            .position(|&c| c == b'\r')
            .unwrap_or(RT_LEN);
        let text = String::from_utf8_lossy(&self.rt[..end]);
        Some(text.trim_end().to_string())
    }
}
