use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use coax_signal::TERMINATOR;

/// Fixed-size receive buffer shared between the engine and the bus.
///
/// The bus writes through an [`RxWriter`] the way a DMA channel would; the
/// engine reads it concurrently while polling for the terminator. Slots are
/// individually atomic, so a reader sees each word either before or after it
/// was written, never torn.
#[derive(Debug, Clone)]
pub struct ReceiveBuffer {
    slots: Arc<[AtomicU16]>,
}

impl ReceiveBuffer {
    /// Create a buffer of `capacity` words, all zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| AtomicU16::new(0)).collect(),
        }
    }

    /// Number of words the buffer holds.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Zero every slot.
    pub fn clear(&self) {
        for slot in self.slots.iter() {
            slot.store(0, Ordering::Relaxed);
        }
    }

    /// Word at `index`.
    pub fn get(&self, index: usize) -> Option<u16> {
        self.slots.get(index).map(|slot| slot.load(Ordering::Acquire))
    }

    /// Index of the first terminator anywhere in the buffer.
    pub fn find_terminator(&self) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.load(Ordering::Acquire) == TERMINATOR)
    }

    /// Copy out the first `len` words.
    pub fn snapshot(&self, len: usize) -> Vec<u16> {
        self.slots
            .iter()
            .take(len)
            .map(|slot| slot.load(Ordering::Acquire))
            .collect()
    }

    /// A sequential writer starting at slot zero.
    pub fn writer(&self) -> RxWriter {
        RxWriter {
            slots: Arc::clone(&self.slots),
            pos: 0,
        }
    }
}

/// Sequential write handle given to the bus for one transaction.
#[derive(Debug)]
pub struct RxWriter {
    slots: Arc<[AtomicU16]>,
    pos: usize,
}

impl RxWriter {
    /// Store the next word. Returns false once the buffer is full; the word
    /// is dropped.
    pub fn push(&mut self, value: u16) -> bool {
        match self.slots.get(self.pos) {
            Some(slot) => {
                slot.store(value, Ordering::Release);
                self.pos += 1;
                true
            }
            None => false,
        }
    }

    /// Words written so far.
    pub fn written(&self) -> usize {
        self.pos
    }
}
