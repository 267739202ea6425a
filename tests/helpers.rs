//! Shared helpers for building RDS bitstreams in tests.
#![allow(dead_code)]

use radiocore::rds::sync::{rds_syndrome, OFFSET_A, OFFSET_B, OFFSET_C, OFFSET_D};
use radiocore::RdsDecoder;

/// Build a valid 26-bit block for an information word and an offset word.
pub fn create_rds_block(data: u16, offset: u32) -> u32 {
    let shifted = (data as u32) << 10;
    shifted | (rds_syndrome(shifted) ^ offset)
}

/// Expand a 26-bit block into bits, MSB first, one per byte.
pub fn word_to_bits(block: u32) -> Vec<u8> {
    (0..26).rev().map(|i| ((block >> i) & 1) as u8).collect()
}

/// Bits for a complete group in A, B, C, D slot order.
pub fn group_bits(blocks: [u16; 4]) -> Vec<u8> {
    let offsets = [OFFSET_A, OFFSET_B, OFFSET_C, OFFSET_D];
    blocks
        .iter()
        .zip(offsets)
        .flat_map(|(&data, offset)| word_to_bits(create_rds_block(data, offset)))
        .collect()
}

/// Feed a complete group into a decoder.
pub fn push_group(decoder: &mut RdsDecoder, blocks: [u16; 4]) {
    decoder.push_bits(&group_bits(blocks));
}

/// Block B word for a type 0A group addressing a PS segment.
pub fn ps_header(segment: u16) -> u16 {
    segment & 0x0003
}

/// Block B word for a type 2A group addressing an RT segment.
pub fn rt_header(segment: u16) -> u16 {
    0x2000 | (segment & 0x000F)
}

/// Block B word for a type 8A group with a duration code.
pub fn tmc_header(duration_code: u16) -> u16 {
    0x8000 | (duration_code & 0x0007)
}

/// Two characters packed into one block word.
pub fn chars(pair: &[u8; 2]) -> u16 {
    u16::from_be_bytes(*pair)
}
