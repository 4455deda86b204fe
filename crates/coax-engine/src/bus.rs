use coax_signal::TxProgram;

use crate::buffer::RxWriter;

/// Activity reported by the bus hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusStatus {
    /// The transmitter is shifting words onto the line.
    pub tx_active: bool,
    /// The receiver is armed or a receive transfer is pending.
    pub rx_active: bool,
}

impl BusStatus {
    /// Returns true once neither path is active.
    pub fn is_idle(&self) -> bool {
        !self.tx_active && !self.rx_active
    }
}

/// A physical coax port: one transmitter and one receiver sharing the line.
///
/// The engine calls [`start`](CoaxBus::start) at most once per transaction
/// and always follows it with [`abort`](CoaxBus::abort), on every exit path.
pub trait CoaxBus: Send {
    /// Arm the receiver into `rx` and start transmitting `program`. Both paths
    /// are started together.
    fn start(&mut self, program: &TxProgram, rx: RxWriter) -> std::io::Result<()>;

    /// Stop both state machines and cancel any pending transfer.
    fn abort(&mut self);

    /// Current activity.
    fn status(&self) -> BusStatus;
}

impl<B: CoaxBus + ?Sized> CoaxBus for Box<B> {
    fn start(&mut self, program: &TxProgram, rx: RxWriter) -> std::io::Result<()> {
        (**self).start(program, rx)
    }

    fn abort(&mut self) {
        (**self).abort()
    }

    fn status(&self) -> BusStatus {
        (**self).status()
    }
}
