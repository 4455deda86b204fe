//! Transmit side of the frame signal engine.
//!
//! Line shape of one frame, in ticks (12 per bit):
//! ```text
//!  idle  │ sync × 5        │ code violation │ word 0 … word n-1  │ trailer          │ idle
//!  12 L  │ (6 H, 6 L) × 5  │ 12 L, 18 H     │ 24 × 6 per word    │ 6 H, 6 L, 24 H   │ 12 L
//! ```
//! The last sync unit's low half runs straight into the code violation, so
//! the line is low for 18 ticks before the 18 high ticks.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, SignalError};
use crate::manchester::{encode_word, ENCODED_BITS, PAD_BITS};
use crate::waveform::{Waveform, HALF_BIT, TICKS_PER_BIT};
use crate::word::Word;

/// Number of sync units in the preamble.
pub const SYNC_UNITS: usize = 5;

const LEAD_IDLE_TICKS: usize = TICKS_PER_BIT;
const CODE_VIOLATION_LOW_TICKS: usize = TICKS_PER_BIT;
const CODE_VIOLATION_HIGH_TICKS: usize = TICKS_PER_BIT + HALF_BIT;
const TRAILER: [(bool, usize); 3] = [(true, HALF_BIT), (false, HALF_BIT), (true, 2 * TICKS_PER_BIT)];
const TAIL_IDLE_TICKS: usize = TICKS_PER_BIT;

/// Ticks occupied by one encoded word on the line.
pub const WORD_TICKS: usize = ENCODED_BITS as usize * HALF_BIT;

/// A frame prepared for the signal generator.
///
/// The word count travels out of band as `count - 1`, so a single-word frame
/// is represented by zero and an empty frame cannot be represented at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxProgram {
    count_minus_one: u32,
    patterns: Vec<u32>,
}

impl TxProgram {
    /// Encode a frame of words.
    pub fn encode(words: &[Word]) -> Result<Self> {
        let patterns = words
            .iter()
            .map(|word| encode_word(word.raw()))
            .collect::<Result<Vec<u32>>>()?;
        Self::from_patterns(patterns)
    }

    /// Build a program from already-encoded words.
    pub fn from_patterns(patterns: Vec<u32>) -> Result<Self> {
        if patterns.is_empty() {
            return Err(SignalError::EmptyFrame);
        }
        Ok(Self {
            count_minus_one: (patterns.len() - 1) as u32,
            patterns,
        })
    }

    /// Word count minus one, as handed to the signal generator.
    pub fn count_minus_one(&self) -> u32 {
        self.count_minus_one
    }

    /// Number of words in the frame.
    pub fn word_count(&self) -> usize {
        self.patterns.len()
    }

    /// Encoded words in transmit order.
    pub fn patterns(&self) -> &[u32] {
        &self.patterns
    }

    /// FIFO image: little-endian `count - 1` followed by each encoded word.
    pub fn to_fifo_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(4 * (self.patterns.len() + 1));
        buf.put_u32_le(self.count_minus_one);
        for pattern in &self.patterns {
            buf.put_u32_le(*pattern);
        }
        buf.freeze()
    }

    /// Render the line waveform for this frame.
    pub fn render(&self) -> Waveform {
        let words = self.count_minus_one as usize + 1;
        let mut wave = Waveform::with_capacity(frame_ticks(words));

        wave.idle(LEAD_IDLE_TICKS);
        for _ in 0..SYNC_UNITS {
            wave.push(true, HALF_BIT);
            wave.push(false, HALF_BIT);
        }
        wave.push(false, CODE_VIOLATION_LOW_TICKS);
        wave.push(true, CODE_VIOLATION_HIGH_TICKS);

        for pattern in self.patterns.iter().take(words) {
            for bit in (PAD_BITS..32).rev() {
                wave.push((pattern >> bit) & 1 == 1, HALF_BIT);
            }
        }

        for (level, ticks) in TRAILER {
            wave.push(level, ticks);
        }
        wave.idle(TAIL_IDLE_TICKS);
        wave
    }
}

/// Total ticks of a rendered frame carrying `words` words.
pub fn frame_ticks(words: usize) -> usize {
    let trailer: usize = TRAILER.iter().map(|(_, ticks)| ticks).sum();
    LEAD_IDLE_TICKS
        + SYNC_UNITS * TICKS_PER_BIT
        + CODE_VIOLATION_LOW_TICKS
        + CODE_VIOLATION_HIGH_TICKS
        + words * WORD_TICKS
        + trailer
        + TAIL_IDLE_TICKS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::Run;

    fn words(values: &[u16]) -> Vec<Word> {
        values.iter().copied().map(Word::from_raw).collect()
    }

    #[test]
    fn single_word_count_is_zero() {
        let program = TxProgram::encode(&words(&[0x005])).unwrap();
        assert_eq!(program.count_minus_one(), 0);
        assert_eq!(program.word_count(), 1);
    }

    #[test]
    fn empty_frame_rejected() {
        let err = TxProgram::encode(&[]).unwrap_err();
        assert!(matches!(err, SignalError::EmptyFrame));
    }

    #[test]
    fn oversized_word_rejected() {
        let err = TxProgram::encode(&words(&[0x005, 0x400])).unwrap_err();
        assert!(matches!(err, SignalError::InvalidWordValue { value: 0x400 }));
    }

    #[test]
    fn fifo_image_layout() {
        let program = TxProgram::encode(&words(&[0x001, 0x035])).unwrap();
        let fifo = program.to_fifo_bytes();
        assert_eq!(fifo.len(), 12);
        assert_eq!(&fifo[0..4], &1u32.to_le_bytes());
        assert_eq!(&fifo[4..8], &0x6AAA_A600u32.to_le_bytes());
        assert_eq!(&fifo[8..12], &0x6A96_6500u32.to_le_bytes());
    }

    #[test]
    fn preamble_shape() {
        let wave = TxProgram::encode(&words(&[0x001])).unwrap().render();
        let runs: Vec<Run> = wave.runs().take(13).collect();

        assert_eq!(runs[0], Run { level: false, ticks: 12 });
        for unit in 0..4 {
            assert_eq!(runs[1 + 2 * unit], Run { level: true, ticks: 6 });
            assert_eq!(runs[2 + 2 * unit], Run { level: false, ticks: 6 });
        }
        assert_eq!(runs[9], Run { level: true, ticks: 6 });
        // Last sync low half plus the code violation low.
        assert_eq!(runs[10], Run { level: false, ticks: 18 });
        assert_eq!(runs[11], Run { level: true, ticks: 18 });
        // First half of the start marker.
        assert!(!runs[12].level);
    }

    #[test]
    fn words_are_back_to_back() {
        let two = TxProgram::encode(&words(&[0x001, 0x002])).unwrap().render();
        let one = TxProgram::encode(&words(&[0x001])).unwrap().render();
        assert_eq!(two.len(), one.len() + WORD_TICKS);
        assert_eq!(one.len(), frame_ticks(1));
        assert_eq!(one.len(), 294);
    }

    #[test]
    fn encoded_bits_follow_code_violation() {
        let program = TxProgram::encode(&words(&[0x035])).unwrap();
        let wave = program.render();
        let first_bit = 12 + 60 + 12 + 18;
        let pattern = program.patterns()[0];
        for bit in 0..ENCODED_BITS as usize {
            let expected = (pattern >> (31 - bit)) & 1 == 1;
            for tick in 0..HALF_BIT {
                assert_eq!(
                    wave.level_at(first_bit + bit * HALF_BIT + tick),
                    Some(expected),
                    "bit {bit}"
                );
            }
        }
    }

    #[test]
    fn trailer_then_idle() {
        let wave = TxProgram::encode(&words(&[0x000])).unwrap().render();
        let samples = wave.samples();
        let end = samples.len();
        assert!(samples[end - 12..].iter().all(|&s| !s));
        assert!(samples[end - 36..end - 12].iter().all(|&s| s));
        assert!(samples[end - 42..end - 36].iter().all(|&s| !s));
        assert!(samples[end - 48..end - 42].iter().all(|&s| s));
    }
}
