use std::fmt;

use crate::command::command_name;

/// Number of significant bits carried on the wire for each word.
pub const WORD_BITS: u32 = 10;

/// Mask selecting the bits of a word that are carried on the wire.
pub const WORD_MASK: u16 = 0x03FF;

/// Reserved end-of-frame marker pushed by the receiver after every frame.
///
/// All ones can never be produced by decoding 10 bits, so it is never a
/// valid received word.
pub const TERMINATOR: u16 = 0xFFFF;

/// A logical 16-bit coax word.
///
/// Bit 0 selects the kind: clear for a data word (byte in bits 2..=9, odd
/// parity flag in bit 1), set for a command word (6-bit code in bits 2..=7).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Word(u16);

impl Word {
    /// Wrap a raw 16-bit value.
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Wrap a signed value as carried by the transport format.
    pub const fn from_i16(value: i16) -> Self {
        Self(value as u16)
    }

    /// Build a data word carrying `byte`, with its odd-parity flag set.
    pub const fn data(byte: u8) -> Self {
        let parity = (byte.count_ones() % 2 == 0) as u16;
        Self(((byte as u16) << 2) | (parity << 1))
    }

    /// Build a command word for a 6-bit command code.
    pub const fn command(code: u8) -> Self {
        Self((((code & 0x3F) as u16) << 2) | 0x01)
    }

    /// The raw 16-bit value.
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// The value reinterpreted as signed, as serialized by the transport.
    pub const fn as_i16(self) -> i16 {
        self.0 as i16
    }

    /// Returns true for data words.
    pub const fn is_data(self) -> bool {
        self.0 & 0x01 == 0
    }

    /// Returns true for command words.
    pub const fn is_command(self) -> bool {
        !self.is_data()
    }

    /// Returns true for the reserved end-of-frame marker.
    pub const fn is_terminator(self) -> bool {
        self.0 == TERMINATOR
    }

    /// Returns true if every set bit lies within the 10 bits carried on the wire.
    pub const fn fits_wire(self) -> bool {
        self.0 & !WORD_MASK == 0
    }

    /// The byte carried by a data word.
    pub fn data_byte(self) -> Option<u8> {
        self.is_data().then_some(((self.0 >> 2) & 0xFF) as u8)
    }

    /// The code carried by a command word.
    pub fn command_code(self) -> Option<u8> {
        self.is_command().then_some(((self.0 >> 2) & 0x3F) as u8)
    }

    /// Whether a data word's parity flag matches its byte.
    ///
    /// Returns `None` for command words.
    pub fn data_parity_ok(self) -> Option<bool> {
        self.data_byte()
            .map(|byte| Word::data(byte).0 & 0x02 == self.0 & 0x02)
    }
}

impl From<u16> for Word {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<Word> for u16 {
    fn from(word: Word) -> Self {
        word.0
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_terminator() {
            return f.write_str("Word(TERMINATOR)");
        }
        match (self.data_byte(), self.command_code()) {
            (Some(byte), _) => write!(f, "Word(data 0x{byte:02x})"),
            (_, Some(code)) => write!(f, "Word({} 0x{code:02x})", command_name(code)),
            _ => write!(f, "Word(0x{:04x})", self.0),
        }
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:03x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{POLL, POLL_ACK};

    #[test]
    fn poll_command_matches_wire_value() {
        let poll = Word::command(POLL);
        assert_eq!(poll.raw(), 0x0005);
        assert!(poll.is_command());
        assert_eq!(poll.command_code(), Some(POLL));
        assert_eq!(poll.data_byte(), None);
    }

    #[test]
    fn data_word_sets_odd_parity_flag() {
        // 0x00 has no set bits, so the flag makes the count odd.
        assert_eq!(Word::data(0x00).raw(), 0b10);
        // 0x01 already has an odd count.
        assert_eq!(Word::data(0x01).raw(), 0b100);
        assert_eq!(Word::data(0xFF).raw(), (0xFF << 2) | 0b10);
    }

    #[test]
    fn data_accessors() {
        let word = Word::data(0xC1);
        assert!(word.is_data());
        assert_eq!(word.data_byte(), Some(0xC1));
        assert_eq!(word.data_parity_ok(), Some(true));
        assert_eq!(Word::from_raw(word.raw() ^ 0x02).data_parity_ok(), Some(false));
        assert_eq!(Word::command(POLL_ACK).data_parity_ok(), None);
    }

    #[test]
    fn every_data_and_command_word_fits_wire() {
        for byte in 0..=u8::MAX {
            assert!(Word::data(byte).fits_wire());
        }
        for code in 0..64u8 {
            assert!(Word::command(code).fits_wire());
        }
    }

    #[test]
    fn terminator_is_not_a_wire_word() {
        let word = Word::from_raw(TERMINATOR);
        assert!(word.is_terminator());
        assert!(!word.fits_wire());
        assert_eq!(word.as_i16(), -1);
        assert_eq!(Word::from_i16(-1), word);
    }

    #[test]
    fn debug_names_kind() {
        assert_eq!(format!("{:?}", Word::command(POLL)), "Word(POLL 0x01)");
        assert_eq!(format!("{:?}", Word::data(0x04)), "Word(data 0x04)");
        assert_eq!(format!("{}", Word::from_raw(0x04)), "0x004");
    }
}
