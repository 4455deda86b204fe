//! IBM 3270 coax bus to HTTP bridge.
//!
//! coax3270 drives the bit-serial coax link between a controller and 3270
//! terminals and tunnels its transactions over HTTP.
//!
//! # Crate Structure
//!
//! - [`signal`]: Manchester word codec and frame signalling (transmit and receive)
//! - [`frame`]: Transport encoding of frames as little-endian words, with repeat expansion
//! - [`engine`]: Bounded full-duplex transaction engine, serialized port, simulated bus
//! - [`tunnel`]: HTTP tunnel client classification and device-side service

/// Re-export signal types.
pub mod signal {
    pub use coax_signal::*;
}

/// Re-export transport frame types.
pub mod frame {
    pub use coax_frame::*;
}

/// Re-export transaction engine types.
pub mod engine {
    pub use coax_engine::*;
}

/// Re-export tunnel types.
pub mod tunnel {
    pub use coax_tunnel::*;
}

pub use coax_signal::{ErrorKind, Word};
