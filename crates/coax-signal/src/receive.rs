//! Receive side of the frame signal engine.
//!
//! The receiver samples the line at tick resolution. Offsets below are
//! measured from the falling edge `f` that ends the last sync unit:
//!
//! - low at f+3, f+7 and f+13, high at f+19, f+24 and f+29 (code violation)
//! - word boundary at f+37: high means end of frame, low means a word follows
//! - data bits sampled 18 ticks after a low boundary, then every 12 ticks,
//!   which lands in the second half of each Manchester pair
//! - parity sampled 120 ticks after the first data bit, next boundary 126
//!   ticks after it
//!
//! Every end of frame produces [`RxEvent::EndOfFrame`], which the DMA side
//! stores as [`TERMINATOR`](crate::word::TERMINATOR).

use crate::manchester::{parity_bit, DecodedWord};
use crate::waveform::{Waveform, TICKS_PER_BIT};
use crate::word::{TERMINATOR, WORD_BITS};

/// Longest high pulse accepted as a sync unit.
const SYNC_MAX_HIGH_TICKS: usize = 8;
const CODE_VIOLATION_LOW: [usize; 3] = [3, 7, 13];
const CODE_VIOLATION_HIGH: [usize; 3] = [19, 24, 29];
const FIRST_BOUNDARY: usize = 37;
const BOUNDARY_TO_DATA: usize = 18;
const PARITY_OFFSET: usize = WORD_BITS as usize * TICKS_PER_BIT;
const NEXT_BOUNDARY_OFFSET: usize = PARITY_OFFSET + 6;

/// Something the receiver recognised on the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxEvent {
    /// A complete word. Parity is reported, never enforced.
    Word(DecodedWord),
    /// The line signalled end of frame.
    EndOfFrame,
}

impl RxEvent {
    /// The 16-bit value this event occupies in the receive FIFO.
    pub fn fifo_value(&self) -> u16 {
        match self {
            RxEvent::Word(word) => word.value,
            RxEvent::EndOfFrame => TERMINATOR,
        }
    }
}

/// Running counters for a receiver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub frames: u64,
    pub words: u64,
    pub parity_errors: u64,
    /// Sync sequences that ended without a valid code violation.
    /// Pulses followed by a further sync unit are not counted.
    pub resyncs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxState {
    /// Looking for a short high pulse ending in a falling edge.
    Hunt { from: usize },
    /// Checking the code violation after the falling edge at `fall`.
    CodeViolation { fall: usize },
    /// Deciding between another word and end of frame.
    Boundary { at: usize },
    /// Reading ten data bits and the parity bit.
    Word { first: usize },
    /// End of frame seen; waiting for the line to drop.
    Idle { from: usize },
}

impl RxState {
    fn anchor(&self) -> usize {
        match *self {
            RxState::Hunt { from } | RxState::Idle { from } => from,
            RxState::CodeViolation { fall } => fall,
            RxState::Boundary { at } => at,
            RxState::Word { first } => first,
        }
    }
}

/// Line-sampling frame decoder.
///
/// Samples may be fed in arbitrary chunks; the decoder stalls (emitting
/// nothing) until enough of the line is available to take its next step.
/// A line that never presents a valid sync stalls it forever, so callers
/// bound waiting with their own deadline.
#[derive(Debug)]
pub struct Receiver {
    line: Vec<bool>,
    base: usize,
    state: RxState,
    stats: ReceiverStats,
}

impl Default for Receiver {
    fn default() -> Self {
        Self::new()
    }
}

impl Receiver {
    /// Create a receiver waiting for the start of a frame.
    pub fn new() -> Self {
        Self {
            line: Vec::new(),
            base: 0,
            state: RxState::Hunt { from: 0 },
            stats: ReceiverStats::default(),
        }
    }

    /// Decode every complete frame in `waveform` into FIFO values,
    /// each frame followed by [`TERMINATOR`].
    pub fn decode(waveform: &Waveform) -> Vec<u16> {
        let mut fifo = Vec::new();
        Receiver::new().feed(waveform.samples(), |event| fifo.push(event.fifo_value()));
        fifo
    }

    /// Append line samples and emit every event they complete.
    pub fn feed(&mut self, samples: &[bool], mut on_event: impl FnMut(RxEvent)) {
        self.line.extend_from_slice(samples);
        while self.advance(&mut on_event) {}
        self.compact();
    }

    /// Counters since creation.
    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }

    /// Returns true while the receiver is inside a frame.
    pub fn in_frame(&self) -> bool {
        matches!(
            self.state,
            RxState::Boundary { .. } | RxState::Word { .. }
        )
    }

    fn end(&self) -> usize {
        self.base + self.line.len()
    }

    fn sample(&self, tick: usize) -> Option<bool> {
        tick.checked_sub(self.base)
            .and_then(|index| self.line.get(index))
            .copied()
    }

    fn find_level(&self, from: usize, level: bool) -> Option<usize> {
        (from.max(self.base)..self.end()).find(|&tick| self.sample(tick) == Some(level))
    }

    fn advance(&mut self, on_event: &mut impl FnMut(RxEvent)) -> bool {
        match self.state {
            RxState::Hunt { from } => {
                let Some(rise) = self.find_level(from, true) else {
                    self.state = RxState::Hunt { from: self.end() };
                    return false;
                };
                let Some(fall) = self.find_level(rise, false) else {
                    self.state = if self.end() - rise > SYNC_MAX_HIGH_TICKS {
                        // Already too long for sync; skip the rest of the pulse.
                        RxState::Idle { from: self.end() }
                    } else {
                        RxState::Hunt { from: rise }
                    };
                    return false;
                };
                self.state = if fall - rise <= SYNC_MAX_HIGH_TICKS {
                    RxState::CodeViolation { fall }
                } else {
                    RxState::Hunt { from: fall }
                };
                true
            }
            RxState::CodeViolation { fall } => {
                if self.sample(fall + CODE_VIOLATION_HIGH[2]).is_none() {
                    return false;
                }
                let lows = CODE_VIOLATION_LOW
                    .iter()
                    .all(|offset| self.sample(fall + offset) == Some(false));
                let highs = CODE_VIOLATION_HIGH
                    .iter()
                    .all(|offset| self.sample(fall + offset) == Some(true));
                self.state = if lows && highs {
                    RxState::Boundary {
                        at: fall + FIRST_BOUNDARY,
                    }
                } else {
                    if !self.sync_unit_follows(fall) {
                        self.stats.resyncs += 1;
                        tracing::warn!(
                            fall,
                            "sync not followed by a code violation; resynchronising"
                        );
                    }
                    RxState::Hunt { from: fall + 1 }
                };
                true
            }
            RxState::Boundary { at } => match self.sample(at) {
                None => false,
                Some(true) => {
                    self.stats.frames += 1;
                    on_event(RxEvent::EndOfFrame);
                    self.state = RxState::Idle { from: at };
                    true
                }
                Some(false) => {
                    self.state = RxState::Word {
                        first: at + BOUNDARY_TO_DATA,
                    };
                    true
                }
            },
            RxState::Word { first } => {
                let Some(parity) = self.sample(first + PARITY_OFFSET) else {
                    return false;
                };
                let value = (0..WORD_BITS as usize).fold(0u16, |value, bit| {
                    let level = self.sample(first + bit * TICKS_PER_BIT) == Some(true);
                    (value << 1) | level as u16
                });

                let parity_ok = parity == parity_bit(value);
                if !parity_ok {
                    self.stats.parity_errors += 1;
                    tracing::debug!(value, "parity mismatch on received word");
                }
                self.stats.words += 1;
                on_event(RxEvent::Word(DecodedWord { value, parity_ok }));

                self.state = RxState::Boundary {
                    at: first + NEXT_BOUNDARY_OFFSET,
                };
                true
            }
            RxState::Idle { from } => match self.find_level(from, false) {
                Some(low) => {
                    self.state = RxState::Hunt { from: low };
                    true
                }
                None => {
                    self.state = RxState::Idle { from: self.end() };
                    false
                }
            },
        }
    }

    /// Returns true if another short sync pulse starts right after `fall`,
    /// as inside the preamble. Needs samples up to the code violation window.
    fn sync_unit_follows(&self, fall: usize) -> bool {
        let Some(rise) = (fall + 1..fall + CODE_VIOLATION_LOW[2])
            .find(|&tick| self.sample(tick) == Some(true))
        else {
            return false;
        };
        (rise + 1..=rise + SYNC_MAX_HIGH_TICKS).any(|tick| self.sample(tick) == Some(false))
    }

    fn compact(&mut self) {
        let keep_from = self.state.anchor().min(self.end());
        if keep_from > self.base {
            self.line.drain(..keep_from - self.base);
            self.base = keep_from;
        }
    }
}
