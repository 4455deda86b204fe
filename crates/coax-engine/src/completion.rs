use crate::buffer::ReceiveBuffer;

/// Decides whether a received frame is complete.
pub trait FrameCompletion: Send {
    /// Number of words preceding the end-of-frame marker, once it has arrived.
    fn frame_len(&self, buffer: &ReceiveBuffer) -> Option<usize>;
}

/// Completes on the first reserved terminator anywhere in the buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminatorCompletion;

impl FrameCompletion for TerminatorCompletion {
    fn frame_len(&self, buffer: &ReceiveBuffer) -> Option<usize> {
        buffer.find_terminator()
    }
}
