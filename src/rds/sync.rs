//! RDS block synchronization and error correction.
//!
//! The RDS stream is a sequence of 26-bit blocks: 16 information bits
//! followed by a 10-bit checkword. The checkword is the CRC of the
//! information bits under the generator polynomial
//! `x^10 + x^8 + x^7 + x^5 + x^4 + x^3 + 1`, XORed with one of four offset
//! words that identify the block's slot within a group. The synchronizer
//! slides a 26-bit window over the incoming bits; a window whose syndrome
//! equals one of the offset words (directly, or after flipping exactly one
//! bit) is a block, and the window then jumps a full block length.

use tracing::{trace, warn};

/// Generator polynomial for the RDS checkword, x^10 + x^8 + x^7 + x^5 +
/// x^4 + x^3 + 1.
pub const GENERATOR: u32 = 0x5B9;

/// Offset word for block A (carries the PI code).
pub const OFFSET_A: u32 = 0b0011111100;
/// Offset word for block B (group type and flags).
pub const OFFSET_B: u32 = 0b0110011000;
/// Offset word for block C.
pub const OFFSET_C: u32 = 0b0101101000;
/// Offset word for block D.
pub const OFFSET_D: u32 = 0b0110110100;

/// Which slot of a group a validated block belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSlot {
    A,
    B,
    C,
    D,
}

impl BlockSlot {
    fn from_offset(syndrome: u32) -> Option<Self> {
        match syndrome {
            OFFSET_A => Some(BlockSlot::A),
            OFFSET_B => Some(BlockSlot::B),
            OFFSET_C => Some(BlockSlot::C),
            OFFSET_D => Some(BlockSlot::D),
            _ => None,
        }
    }
}

/// A validated 26-bit block: the 16 information bits and the slot its
/// offset word identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncedBlock {
    pub data: u16,
    pub slot: BlockSlot,
    /// Whether single-bit correction was applied
    pub corrected: bool,
}

/// Compute the syndrome of a 26-bit block by GF(2) polynomial division.
///
/// For an error-free block the result equals the offset word of its slot.
pub fn rds_syndrome(block: u32) -> u32 {
    let mut reg: u32 = 0;
    for i in (0..26).rev() {
        let bit = (block >> i) & 1;
        let msb = (reg >> 9) & 1;
        reg = ((reg << 1) | bit) & 0x3FF;
        if msb == 1 {
            reg ^= GENERATOR;
        }
    }
    // The generator's x^10 term cancels the bit shifted out of the
    // register; the remainder is the low ten bits.
    reg & 0x3FF
}

/// Bit-serial block synchronizer with single-bit error correction.
#[derive(Debug, Clone)]
pub struct BlockSynchronizer {
    /// Shift register holding the most recent 26 bits
    window: u32,
    /// Bits accumulated since the last block boundary
    bit_count: u32,
    /// Whether block cadence has been acquired
    synced: bool,
    corrected_blocks: u64,
    sync_slips: u64,
}

impl BlockSynchronizer {
    pub fn new() -> Self {
        Self {
            window: 0,
            bit_count: 0,
            synced: false,
            corrected_blocks: 0,
            sync_slips: 0,
        }
    }

    /// Number of blocks recovered via single-bit correction.
    pub fn corrected_blocks(&self) -> u64 {
        self.corrected_blocks
    }

    /// Number of single-bit window slides taken while searching for a block
    /// boundary.
    pub fn sync_slips(&self) -> u64 {
        self.sync_slips
    }

    /// Whether block cadence is currently locked.
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    pub fn reset(&mut self) {
        self.window = 0;
        self.bit_count = 0;
        self.synced = false;
        self.corrected_blocks = 0;
        self.sync_slips = 0;
    }

    /// Push one bit (LSB of `bit`); returns a block when the window
    /// validates against one of the offset words.
    pub fn push_bit(&mut self, bit: u8) -> Option<SyncedBlock> {
        self.window = ((self.window << 1) | (bit & 1) as u32) & 0x3FF_FFFF;
        self.bit_count += 1;
        if self.bit_count < 26 {
            return None;
        }

        match validate_block(self.window) {
            Some((data, slot, corrected)) => {
                if corrected {
                    self.corrected_blocks += 1;
                    warn!(?slot, "recovered block via single-bit correction");
                } else {
                    trace!(?slot, data = format_args!("{:#06x}", data), "block validated");
                }
                self.synced = true;
                // Next block starts a full 26 bits later
                self.bit_count = 0;
                Some(SyncedBlock {
                    data,
                    slot,
                    corrected,
                })
            }
            None => {
                // Slide the window one bit and keep searching
                self.sync_slips += 1;
                self.synced = false;
                self.bit_count = 25;
                None
            }
        }
    }
}

impl Default for BlockSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate a 26-bit block, trying the received word first and then every
/// single-bit flip. Returns the information bits, the slot, and whether a
/// correction was applied.
fn validate_block(block: u32) -> Option<(u16, BlockSlot, bool)> {
    if let Some(slot) = BlockSlot::from_offset(rds_syndrome(block)) {
        return Some(((block >> 10) as u16, slot, false));
    }
    for i in 0..26 {
        let flipped = block ^ (1 << i);
        if let Some(slot) = BlockSlot::from_offset(rds_syndrome(flipped)) {
            return Some(((flipped >> 10) as u16, slot, true));
        }
    }
    None
}
