use bytes::{Buf, BufMut, BytesMut};
use coax_signal::Word;

use crate::error::{FrameError, Result};

/// Bytes per word on the transport.
pub const WORD_SIZE: usize = 2;

/// Largest frame a repeat descriptor may expand to, in words.
pub const MAX_EXPANDED_WORDS: usize = u16::MAX as usize;

/// Run-length description of a repeated frame tail.
///
/// The words from `offset` to the end of the frame occur `count` times in
/// total. A count of zero means the frame is sent as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RepeatDescriptor {
    pub count: i32,
    pub offset: usize,
}

impl RepeatDescriptor {
    /// Create a descriptor.
    pub fn new(count: i32, offset: usize) -> Self {
        Self { count, offset }
    }

    /// Returns true if the descriptor leaves the frame unchanged.
    pub fn is_none(&self) -> bool {
        self.count == 0
    }

    /// Check the descriptor against a frame of `len` words.
    ///
    /// Besides describing a tail of the frame, the expansion must stay
    /// within [`MAX_EXPANDED_WORDS`].
    pub fn validate(&self, len: usize) -> Result<()> {
        let describes_tail = self.count >= 0 && (self.count == 0 || self.offset < len);
        if !describes_tail || self.expanded_len(len).is_none() {
            return Err(FrameError::InvalidRepeat {
                count: self.count,
                offset: self.offset,
                len,
            });
        }
        Ok(())
    }

    /// Words after expanding a frame of `len` words, if within bounds.
    fn expanded_len(&self, len: usize) -> Option<usize> {
        if self.is_none() {
            return Some(len);
        }
        let tail = len.checked_sub(self.offset)?;
        let count = usize::try_from(self.count).ok()?;
        tail.checked_mul(count)?
            .checked_add(self.offset)
            .filter(|&expanded| expanded <= MAX_EXPANDED_WORDS)
    }
}

/// An outbound frame as handed to the tunnel, possibly with a compressed tail.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutboundFrame {
    pub words: Vec<Word>,
    pub repeat: RepeatDescriptor,
}

impl OutboundFrame {
    /// Create a frame sent exactly as given.
    pub fn new(words: impl Into<Vec<Word>>) -> Self {
        Self {
            words: words.into(),
            repeat: RepeatDescriptor::default(),
        }
    }

    /// Attach a repeat descriptor.
    pub fn with_repeat(mut self, count: i32, offset: usize) -> Self {
        self.repeat = RepeatDescriptor::new(count, offset);
        self
    }

    /// Materialize the repeat descriptor into a flat word sequence.
    pub fn expand(&self) -> Result<Vec<Word>> {
        self.repeat.validate(self.words.len())?;
        if self.repeat.is_none() {
            return Ok(self.words.clone());
        }

        let expanded = self.repeat.expanded_len(self.words.len()).unwrap_or_default();
        let (head, tail) = self.words.split_at(self.repeat.offset);
        let mut out = Vec::with_capacity(expanded);
        out.extend_from_slice(head);
        for _ in 0..self.repeat.count {
            out.extend_from_slice(tail);
        }
        Ok(out)
    }
}

/// Encode an outbound frame into the transport format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────┬─────┬──────────────┐
/// │ Word 0       │ Word 1       │ ... │ Word n-1     │
/// │ (2B LE i16)  │ (2B LE i16)  │     │ (2B LE i16)  │
/// └──────────────┴──────────────┴─────┴──────────────┘
/// ```
/// Nothing is written if the repeat descriptor is invalid.
pub fn encode_frame(frame: &OutboundFrame, dst: &mut BytesMut) -> Result<()> {
    let words = frame.expand()?;
    if !frame.repeat.is_none() {
        tracing::trace!(
            words = frame.words.len(),
            expanded = words.len(),
            "expanded repeated tail"
        );
    }
    encode_words(&words, dst);
    Ok(())
}

/// Serialize a flat word sequence.
pub fn encode_words(words: &[Word], dst: &mut BytesMut) {
    dst.reserve(words.len() * WORD_SIZE);
    for word in words {
        dst.put_i16_le(word.as_i16());
    }
}

/// Decode a transport body into words.
///
/// Every word is returned as received, including the reserved terminator;
/// see [`decode_inbound`] for received frames.
pub fn decode_frame(mut src: &[u8]) -> Result<Vec<Word>> {
    if src.len() % WORD_SIZE != 0 {
        return Err(FrameError::InvalidLength { len: src.len() });
    }

    let mut words = Vec::with_capacity(src.len() / WORD_SIZE);
    while src.has_remaining() {
        words.push(Word::from_i16(src.get_i16_le()));
    }
    Ok(words)
}

/// Decode a received frame, rejecting the reserved terminator as a word.
pub fn decode_inbound(src: &[u8]) -> Result<Vec<Word>> {
    let words = decode_frame(src)?;
    if let Some(index) = words.iter().position(|word| word.is_terminator()) {
        return Err(FrameError::ContainsTerminator { index });
    }
    Ok(words)
}
