//! Provisioning session state.
//!
//! # State sequence (for beginners)
//!
//! Both provisioning transports walk the same linear sequence.  Each
//! transport skips the states it has no use for, but never goes backwards:
//!
//! ```text
//! Idle ─► Instructing ─► Scanning ─► DeviceSelected ─► Connecting
//!      ─► DiscoveringServices ─► ReadingNetworks ─► NetworkList
//!      ─► NetworkSelected ─► AwaitingPassword ─► SendingCredentials ─► Done
//!
//! any non-terminal state ─► Failed
//! ```
//!
//! - Radio uses `Scanning`, `DeviceSelected` and `DiscoveringServices`.
//! - Socket uses `Instructing` (the user is told to join the unit's own
//!   access point) and skips the radio-only states.
//!
//! The socket flow is usually described in its own vocabulary.  Its steps
//! land on the shared states like this:
//!
//! | Socket step | Shared state |
//! |---|---|
//! | instructing the user | `Instructing` |
//! | remote scan (`SCAN` sent, reply pending) | `Connecting`, then `ReadingNetworks` |
//! | list shown | `NetworkList` |
//! | network picked | `NetworkSelected`, then `AwaitingPassword` |
//! | sending (`ssid\|password` sent, `OK` pending) | `SendingCredentials` |
//! | finished | `Done` or `Failed` |
//!
//! The socket transport never enters `Scanning`: that state means a local
//! radio scan for peripherals, and on the socket path the scan runs on the
//! unit.
//!
//! The only way back to `Idle` is an explicit reset of the whole session.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Transport used to deliver credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportKind {
    /// Bluetooth LE GATT characteristics.
    Radio,
    /// Line-framed TCP commands to the unit's access point.
    Socket,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Radio => f.write_str("radio"),
            TransportKind::Socket => f.write_str("socket"),
        }
    }
}

/// A step of the provisioning state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Instructing,
    Scanning,
    DeviceSelected,
    Connecting,
    DiscoveringServices,
    ReadingNetworks,
    NetworkList,
    NetworkSelected,
    AwaitingPassword,
    SendingCredentials,
    Done,
    Failed,
}

impl SessionState {
    /// Position in the linear sequence; `Failed` sorts last.
    fn rank(self) -> u8 {
        match self {
            SessionState::Idle => 0,
            SessionState::Instructing => 1,
            SessionState::Scanning => 2,
            SessionState::DeviceSelected => 3,
            SessionState::Connecting => 4,
            SessionState::DiscoveringServices => 5,
            SessionState::ReadingNetworks => 6,
            SessionState::NetworkList => 7,
            SessionState::NetworkSelected => 8,
            SessionState::AwaitingPassword => 9,
            SessionState::SendingCredentials => 10,
            SessionState::Done => 11,
            SessionState::Failed => 12,
        }
    }

    /// Returns `true` for `Done` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Done | SessionState::Failed)
    }

    /// Returns `true` if moving from `self` to `next` keeps the sequence linear.
    ///
    /// Terminal states accept nothing, `Idle` is never re-entered, and `Done`
    /// is only reachable from `SendingCredentials`.
    pub fn can_advance_to(self, next: SessionState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            SessionState::Idle => false,
            SessionState::Failed => true,
            SessionState::Done => self == SessionState::SendingCredentials,
            _ => next.rank() > self.rank(),
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions_are_allowed() {
        assert!(SessionState::Idle.can_advance_to(SessionState::Scanning));
        assert!(SessionState::Connecting.can_advance_to(SessionState::ReadingNetworks));
        assert!(SessionState::SendingCredentials.can_advance_to(SessionState::Done));
    }

    #[test]
    fn test_socket_walk_is_a_valid_linear_sequence() {
        // Instructing, remote scan, list, pick, sending, done.
        let walk = [
            SessionState::Instructing,
            SessionState::Connecting,
            SessionState::ReadingNetworks,
            SessionState::NetworkList,
            SessionState::NetworkSelected,
            SessionState::AwaitingPassword,
            SessionState::SendingCredentials,
            SessionState::Done,
        ];

        for pair in walk.windows(2) {
            assert!(pair[0].can_advance_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(!walk.contains(&SessionState::Scanning));
    }

    #[test]
    fn test_backward_transitions_are_rejected() {
        assert!(!SessionState::NetworkList.can_advance_to(SessionState::ReadingNetworks));
        assert!(!SessionState::Connecting.can_advance_to(SessionState::Connecting));
        assert!(!SessionState::Scanning.can_advance_to(SessionState::Idle));
    }

    #[test]
    fn test_failed_is_reachable_from_any_non_terminal_state() {
        for state in [
            SessionState::Idle,
            SessionState::Connecting,
            SessionState::AwaitingPassword,
            SessionState::SendingCredentials,
        ] {
            assert!(state.can_advance_to(SessionState::Failed), "{state} -> Failed");
        }
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        assert!(!SessionState::Done.can_advance_to(SessionState::Failed));
        assert!(!SessionState::Failed.can_advance_to(SessionState::Done));
        assert!(!SessionState::Failed.can_advance_to(SessionState::Connecting));
    }

    #[test]
    fn test_done_requires_sending_credentials() {
        assert!(!SessionState::NetworkList.can_advance_to(SessionState::Done));
        assert!(!SessionState::AwaitingPassword.can_advance_to(SessionState::Done));
    }
}
