//! Bit-level signalling for the IBM 3270 coax bus.
//!
//! This is the lowest layer of coax3270. It knows how a single word looks on
//! the wire and how a whole frame is shaped:
//! - [`manchester`] encodes one 10-bit word as start marker, ten Manchester
//!   pairs and an odd-parity pair, left-packed into a 32-bit container
//! - [`transmit`] turns a sequence of encoded words into the line waveform
//!   (sync preamble, code violation, words, end-of-frame trailer)
//! - [`receive`] is the line-sampling state machine that recovers words and
//!   frame boundaries from a waveform
//!
//! Parity is checked on receive but never rejects a frame. Mismatches are
//! counted in [`ReceiverStats`] and logged at debug level.

pub mod command;
pub mod error;
pub mod manchester;
pub mod receive;
pub mod transmit;
pub mod waveform;
pub mod word;

pub use command::{
    command_code, command_name, POLL, POLL_ACK, READ_TERMINAL_ID, RESET, WRITE_DATA,
};
pub use error::{ErrorKind, Result, SignalError};
pub use manchester::{decode_word, encode_word, parity_bit, DecodedWord, ENCODED_BITS};
pub use receive::{Receiver, ReceiverStats, RxEvent};
pub use transmit::{frame_ticks, TxProgram};
pub use waveform::{ticks_to_duration, Run, Waveform, BIT_RATE, TICKS_PER_BIT};
pub use word::{Word, TERMINATOR, WORD_BITS, WORD_MASK};
