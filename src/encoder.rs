//! Symbol encoder: text in, immutable [`QrSymbol`] out. Mode and version
//! selection, bit stream assembly, error correction, and mask search.

use crate::ecc;
use crate::error::{QrForgeError, Result};
use crate::matrix::{Matrix, QrSymbol};
use crate::segment::{BitBuffer, Segment};
use crate::types::Ecc;

const MIN_VERSION: u8 = 1;
const MAX_VERSION: u8 = 40;

/// Encodes `text` at the given error correction level, selecting the smallest
/// version that fits and the lowest-penalty mask.
pub fn encode(text: &str, level: Ecc) -> Result<QrSymbol> {
    encode_with_options(text, level, None, None)
}

/// Like [`encode`], but pins the symbol version instead of picking the
/// smallest fit.
pub fn encode_with_version(text: &str, level: Ecc, version: u8) -> Result<QrSymbol> {
    encode_with_options(text, level, Some(version), None)
}

pub(crate) fn encode_with_options(
    text: &str,
    level: Ecc,
    forced_version: Option<u8>,
    forced_mask: Option<u8>,
) -> Result<QrSymbol> {
    if text.is_empty() {
        return Err(QrForgeError::InvalidInput("text is empty".to_string()));
    }
    if let Some(v) = forced_version {
        if !(MIN_VERSION..=MAX_VERSION).contains(&v) {
            return Err(QrForgeError::InvalidInput(format!(
                "version {v} is outside 1-40"
            )));
        }
    }

    let segment = Segment::for_text(text);
    let (version, needed_bits) = select_version(&segment, level, forced_version)?;
    let capacity_bits = ecc::data_codewords(version, level) * 8;

    // Mode indicator, character count, payload.
    let mut bits = BitBuffer::new();
    bits.push_bits(segment.mode.indicator(), 4);
    bits.push_bits(
        segment.num_chars as u32,
        segment.mode.char_count_bits(version),
    );
    bits.push_buffer(&segment.bits);
    debug_assert_eq!(bits.len(), needed_bits);

    // Terminator, pad to a byte boundary, then alternating pad bytes.
    let terminator = (capacity_bits - bits.len()).min(4);
    bits.push_bits(0, terminator as u8);
    bits.push_bits(0, ((8 - bits.len() % 8) % 8) as u8);
    for pad in [0xec, 0x11].into_iter().cycle() {
        if bits.len() >= capacity_bits {
            break;
        }
        bits.push_bits(pad, 8);
    }
    debug_assert_eq!(bits.len(), capacity_bits);

    let codewords = ecc::add_ecc_and_interleave(&bits.into_bytes(), version, level);

    let mut matrix = Matrix::new(version);
    matrix.place_codewords(&codewords);
    let mask = match forced_mask {
        Some(m) => m,
        None => select_mask(&mut matrix, level),
    };
    matrix.apply_mask(mask);
    matrix.draw_format(level, mask);
    Ok(matrix.into_symbol(level, mask))
}

/// Smallest version in range whose data capacity holds the segment, along
/// with the bit count it needs there.
fn select_version(segment: &Segment, level: Ecc, forced: Option<u8>) -> Result<(u8, usize)> {
    let (lo, hi) = match forced {
        Some(v) => (v, v),
        None => (MIN_VERSION, MAX_VERSION),
    };
    for version in lo..=hi {
        let capacity = ecc::data_codewords(version, level) * 8;
        if let Some(needed) = segment.encoded_len(version) {
            if needed <= capacity {
                return Ok((version, needed));
            }
        }
    }
    // Report against the top of the range; when the character count field
    // overflows, count the header bits anyway so the message stays honest.
    let needed_bits = segment.encoded_len(hi).unwrap_or_else(|| {
        4 + usize::from(segment.mode.char_count_bits(hi)) + segment.bits.len()
    });
    Err(QrForgeError::CapacityExceeded {
        needed_bits,
        capacity_bits: ecc::data_codewords(hi, level) * 8,
    })
}

/// Tries all 8 masks and keeps the lowest penalty. Ties go to the lower index.
fn select_mask(matrix: &mut Matrix, level: Ecc) -> u8 {
    let mut best = 0;
    let mut best_penalty = i32::MAX;
    for mask in 0..8 {
        matrix.apply_mask(mask);
        matrix.draw_format(level, mask);
        let penalty = matrix.penalty();
        if penalty < best_penalty {
            best = mask;
            best_penalty = penalty;
        }
        // XOR masking is self-inverse.
        matrix.apply_mask(mask);
    }
    best
}
