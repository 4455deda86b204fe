use std::time::Duration;

/// Character cells on the largest supported terminal screen (80 × 25).
pub const SCREEN_WORDS: usize = 80 * 25;

/// Default maximum inbound frame: one screen plus a small margin.
pub const DEFAULT_MAX_FRAME_WORDS: usize = SCREEN_WORDS + 16;

/// Default transaction deadline when the caller supplies none.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Configuration for a [`TransactionEngine`](crate::TransactionEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Largest inbound frame, excluding the terminator slot. Default: 2016 words.
    pub max_frame_words: usize,
    /// Interval between completion polls. Default: 1 ms.
    pub poll_interval: Duration,
    /// How long teardown may wait for the bus to report idle. Default: 100 ms.
    pub abort_ack_timeout: Duration,
    /// Deadline used when a request carries none. Default: 1000 ms.
    pub default_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_frame_words: DEFAULT_MAX_FRAME_WORDS,
            poll_interval: Duration::from_millis(1),
            abort_ack_timeout: Duration::from_millis(100),
            default_timeout: DEFAULT_TIMEOUT,
        }
    }
}
