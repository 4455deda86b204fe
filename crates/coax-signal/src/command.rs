//! Named command codes.
//!
//! The bridge carries the terminal command set opaquely; only the codes it
//! needs to recognise for diagnostics and simulation are named here.

/// Poll the terminal for status.
pub const POLL: u8 = 0x01;

/// Reset the terminal.
pub const RESET: u8 = 0x02;

/// Read the terminal identification byte.
pub const READ_TERMINAL_ID: u8 = 0x09;

/// Write data at the address counter.
pub const WRITE_DATA: u8 = 0x0C;

/// Acknowledge a poll response.
pub const POLL_ACK: u8 = 0x11;

/// Returns a human-readable name for a command code.
///
/// Codes whose upper bits carry modifiers fall back to the low nibble.
pub fn command_name(code: u8) -> &'static str {
    match known_name(code) {
        Some(name) => name,
        None => known_name(code & 0x0F).unwrap_or("UNKNOWN"),
    }
}

/// Looks up a command code by name, ignoring case.
pub fn command_code(name: &str) -> Option<u8> {
    [POLL, RESET, READ_TERMINAL_ID, WRITE_DATA, POLL_ACK]
        .into_iter()
        .find(|&code| known_name(code).is_some_and(|known| known.eq_ignore_ascii_case(name)))
}

fn known_name(code: u8) -> Option<&'static str> {
    match code {
        POLL => Some("POLL"),
        RESET => Some("RESET"),
        READ_TERMINAL_ID => Some("READ_TERMINAL_ID"),
        WRITE_DATA => Some("WRITE_DATA"),
        POLL_ACK => Some("POLL_ACK"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_known_codes() {
        assert_eq!(command_name(POLL), "POLL");
        assert_eq!(command_name(POLL_ACK), "POLL_ACK");
        assert_eq!(command_name(READ_TERMINAL_ID), "READ_TERMINAL_ID");
    }

    #[test]
    fn looks_up_codes_by_name() {
        assert_eq!(command_code("poll"), Some(POLL));
        assert_eq!(command_code("WRITE_DATA"), Some(WRITE_DATA));
        assert_eq!(command_code("LOAD_ADDRESS"), None);
    }

    #[test]
    fn falls_back_to_low_nibble() {
        assert_eq!(command_name(0x22), "RESET");
        assert_eq!(command_name(0x3F), "UNKNOWN");
    }
}
