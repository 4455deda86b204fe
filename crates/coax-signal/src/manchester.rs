//! Single-word Manchester codec.
//!
//! Encoded layout, most significant bit first:
//! ```text
//! ┌────────┬──────────────────────────────┬────────┬──────────┐
//! │ Start  │ 10 × Manchester pair         │ Parity │ Padding  │
//! │ 01     │ 01 = one, 10 = zero          │ pair   │ 8 × 0    │
//! │ 2 bits │ 20 bits                      │ 2 bits │ 8 bits   │
//! └────────┴──────────────────────────────┴────────┴──────────┘
//! ```
//! The padding lets the container be shifted straight onto the transmit line
//! 24 bits at a time.

use crate::error::{Result, SignalError};
use crate::word::{Word, WORD_BITS, WORD_MASK};

/// Number of meaningful bits in an encoded word.
pub const ENCODED_BITS: u32 = 24;

/// Zero bits padding the encoded word on the right.
pub const PAD_BITS: u32 = 32 - ENCODED_BITS;

/// Start marker preceding the payload pairs.
pub const START_MARKER: u32 = 0b01;

const PAIR_ONE: u32 = 0b01;
const PAIR_ZERO: u32 = 0b10;

/// A word recovered from the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedWord {
    /// The 10-bit payload.
    pub value: u16,
    /// Whether the trailing parity pair matched the payload.
    pub parity_ok: bool,
}

impl DecodedWord {
    /// The payload as a [`Word`].
    pub fn word(&self) -> Word {
        Word::from_raw(self.value)
    }
}

/// Odd-parity bit for the 10 payload bits of `value`.
///
/// Set when the payload has an even number of one bits, so that payload
/// plus parity always carries an odd count.
pub fn parity_bit(value: u16) -> bool {
    (value & WORD_MASK).count_ones() % 2 == 0
}

/// Manchester-encode a 10-bit value with start marker and parity pair.
pub fn encode_word(value: u16) -> Result<u32> {
    if value & !WORD_MASK != 0 {
        return Err(SignalError::InvalidWordValue { value });
    }

    let mut encoded = START_MARKER;
    let mut ones = 0u32;
    for shift in (0..WORD_BITS).rev() {
        encoded <<= 2;
        if value & (1 << shift) != 0 {
            encoded |= PAIR_ONE;
            ones += 1;
        } else {
            encoded |= PAIR_ZERO;
        }
    }

    encoded <<= 2;
    encoded |= if ones & 1 == 1 { PAIR_ZERO } else { PAIR_ONE };

    Ok(encoded << PAD_BITS)
}

/// Decode a 32-bit container produced by [`encode_word`].
///
/// A parity mismatch is reported through [`DecodedWord::parity_ok`] rather
/// than as an error; malformed structure is an error.
pub fn decode_word(pattern: u32) -> Result<DecodedWord> {
    if pattern & ((1 << PAD_BITS) - 1) != 0 {
        return Err(invalid(pattern, "non-zero padding"));
    }

    let bits = pattern >> PAD_BITS;
    if (bits >> (ENCODED_BITS - 2)) & 0b11 != START_MARKER {
        return Err(invalid(pattern, "missing start marker"));
    }

    let mut value = 0u16;
    for index in 0..WORD_BITS {
        let shift = ENCODED_BITS - 4 - 2 * index;
        value <<= 1;
        match (bits >> shift) & 0b11 {
            PAIR_ONE => value |= 1,
            PAIR_ZERO => {}
            _ => return Err(invalid(pattern, "payload pair is not a Manchester transition")),
        }
    }

    let parity = match bits & 0b11 {
        PAIR_ONE => true,
        PAIR_ZERO => false,
        _ => return Err(invalid(pattern, "parity pair is not a Manchester transition")),
    };

    let parity_ok = parity == parity_bit(value);
    if !parity_ok {
        tracing::debug!(value, pattern, "parity mismatch in decoded word");
    }

    Ok(DecodedWord { value, parity_ok })
}

fn invalid(pattern: u32, reason: &'static str) -> SignalError {
    SignalError::InvalidPattern { pattern, reason }
}
