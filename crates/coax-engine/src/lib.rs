//! Full-duplex transaction engine for the IBM 3270 coax bus.
//!
//! One [`TransactionEngine`] owns one physical port: its receive buffer, its
//! [`CoaxBus`], and the state machine
//! `Idle → Armed → InFlight → {Completed | TimedOut} → Idle`. Every exit from
//! `InFlight` tears the bus down before the next transaction may start; a
//! teardown that cannot be confirmed leaves the engine `Faulted`.
//!
//! [`Port`] serializes callers sharing one engine, and [`sim::SimulatedBus`]
//! stands in for the hardware in tests and on the bench.

pub mod buffer;
pub mod bus;
pub mod clock;
pub mod completion;
pub mod config;
pub mod engine;
pub mod error;
pub mod port;
pub mod sim;

pub use buffer::{ReceiveBuffer, RxWriter};
pub use bus::{BusStatus, CoaxBus};
pub use clock::{Clock, ManualClock, SystemClock};
pub use completion::{FrameCompletion, TerminatorCompletion};
pub use config::{EngineConfig, DEFAULT_MAX_FRAME_WORDS, DEFAULT_TIMEOUT, SCREEN_WORDS};
pub use engine::{EngineState, EngineStats, TransactionEngine};
pub use error::{EngineError, Result};
pub use port::Port;
pub use sim::{Reply, SilentTerminal, SimStats, SimulatedBus, Terminal};

pub use coax_signal::ErrorKind;
