//! Socket (TCP) provisioning format.
//!
//! While unprovisioned, the unit runs its own access point and listens on
//! `192.168.4.1:80`.  Each exchange is one TCP connection carrying one
//! command:
//!
//! ```text
//! app  ──► "SCAN\n"
//! unit ──► "Home_WiFi\nNeighbor_5G\nENDLIST"      (or "NONE")
//!
//! app  ──► "Home_WiFi|secret1\n"
//! unit ──► "OK"
//! ```
//!
//! The unit does not length-prefix its replies, so the app accumulates bytes
//! and checks after every read whether the reply is complete for the command
//! that was sent ([`Command::is_complete`]).

use std::net::Ipv4Addr;

use super::framing::split_line_list;
use super::ProtocolError;
use crate::domain::network::{Credentials, NetworkList};

/// Address of the unit on its own access point.
pub const DEFAULT_DEVICE_ADDRESS: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 1);

/// TCP port the unit accepts commands on.
pub const DEFAULT_PORT: u16 = 80;

/// Command asking the unit to scan for networks.
pub const SCAN_COMMAND: &str = "SCAN";

/// Terminal sentinel of a scan reply.
pub const END_OF_LIST: &str = "ENDLIST";

/// Whole-reply token meaning the unit found no network.
pub const NO_NETWORKS: &str = "NONE";

/// Token acknowledging a credentials command.
pub const ACKNOWLEDGEMENT: &str = "OK";

/// Terminator appended to every command.
pub const COMMAND_TERMINATOR: char = '\n';

/// A command sent to the unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ask for the list of visible networks.
    Scan,
    /// Deliver credentials; body is `<ssid>|<password>` with no further encoding.
    Credentials(Credentials),
}

impl Command {
    /// Returns the command body without its terminator.
    pub fn body(&self) -> String {
        match self {
            Command::Scan => SCAN_COMMAND.to_string(),
            Command::Credentials(credentials) => credentials.to_pipe_payload(),
        }
    }

    /// Returns the bytes written to the stream, terminator included.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut line = self.body();
        line.push(COMMAND_TERMINATOR);
        line.into_bytes()
    }

    /// Short label for logs; never includes the password.
    pub fn label(&self) -> &'static str {
        match self {
            Command::Scan => "scan",
            Command::Credentials(_) => "credentials",
        }
    }

    /// Returns `true` once `buffer` holds a complete reply to this command.
    ///
    /// - Scan: the buffer contains [`END_OF_LIST`] or is exactly [`NO_NETWORKS`].
    /// - Credentials: the buffer contains [`ACKNOWLEDGEMENT`].
    pub fn is_complete(&self, buffer: &str) -> bool {
        match self {
            Command::Scan => buffer.contains(END_OF_LIST) || buffer.trim() == NO_NETWORKS,
            Command::Credentials(_) => buffer.contains(ACKNOWLEDGEMENT),
        }
    }
}

/// Outcome of a scan command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanResponse {
    /// The unit listed at least one network.
    Networks(NetworkList),
    /// The unit reported that it sees no network.  Not an error.
    NoNetworks,
}

/// Parses a complete scan reply.
///
/// Everything before the [`END_OF_LIST`] sentinel is split on newlines,
/// trimmed, stripped of blank lines and de-duplicated.  A reply whose lines
/// are all blank is reported as [`ScanResponse::NoNetworks`].
pub fn parse_scan_response(buffer: &str) -> ScanResponse {
    if buffer.trim() == NO_NETWORKS {
        return ScanResponse::NoNetworks;
    }

    let listing = match buffer.find(END_OF_LIST) {
        Some(end) => &buffer[..end],
        None => buffer,
    };

    let networks = split_line_list(listing);
    if networks.is_empty() {
        ScanResponse::NoNetworks
    } else {
        ScanResponse::Networks(networks)
    }
}

/// Checks a credentials reply for the acknowledgement token.
///
/// # Errors
///
/// Returns [`ProtocolError::UnexpectedResponse`] carrying the reply text when
/// the token is absent.
pub fn check_acknowledgement(buffer: &str) -> Result<(), ProtocolError> {
    if buffer.contains(ACKNOWLEDGEMENT) {
        Ok(())
    } else {
        Err(ProtocolError::UnexpectedResponse(buffer.trim().to_string()))
    }
}
