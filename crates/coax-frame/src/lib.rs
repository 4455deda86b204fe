//! Transport encoding for 3270 coax frames.
//!
//! A frame travels over the tunnel as a flat sequence of little-endian
//! signed 16-bit words:
//! - no header and no length prefix; the carrier supplies the length
//! - an optional repeat descriptor is expanded before serialization
//! - decoding never re-compresses

pub mod codec;
pub mod error;

pub use codec::{
    decode_frame, decode_inbound, encode_frame, encode_words, OutboundFrame, RepeatDescriptor,
    MAX_EXPANDED_WORDS, WORD_SIZE,
};
pub use error::{FrameError, Result};

pub use coax_signal::ErrorKind;
