//! Error taxonomy surfaced to callers of the provisioning and discovery flows.
//!
//! Transport-native errors (Bluetooth stack errors, `std::io::Error`, timer
//! expiry) are converted into [`ProvisionError`] at the infrastructure
//! boundary.  Callers pick their user-facing message from
//! [`ProvisionError::category`], never from the transport's own text.

use std::time::Duration;

use babylink_core::{ProtocolError, SessionState};
use thiserror::Error;

/// Every failure a provisioning or association call can report.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProvisionError {
    /// The OS refused radio scanning or connecting.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The scan window elapsed without a recognisable unit.
    #[error("no device found within {window:?}")]
    DiscoveryTimeout { window: Duration },

    /// Connect refused/reset, write failed, or the link dropped.
    ///
    /// Carries the transport's message verbatim for display.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The unit was reachable but did not answer within the window.
    #[error("no response from device within {after:?}")]
    ResponseTimeout { after: Duration },

    /// The unit answered with something that cannot be decoded.
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] ProtocolError),

    /// The association writer rejected or failed the link.
    #[error("device ready, but not linked: {0}")]
    AssociationFailed(String),

    /// Another provisioning flow holds the transport lock.
    #[error("another provisioning flow is in progress")]
    Busy,

    /// The call does not fit the session's current state.
    #[error("cannot {operation} while in state {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// The caller passed an unusable argument (unknown network, empty password).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Category a caller keys its messaging on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    PermissionDenied,
    DiscoveryTimeout,
    ConnectionFailure,
    ResponseTimeout,
    MalformedPayload,
    AssociationFailure,
    /// Busy lock, wrong state or bad argument: a caller-side problem.
    Usage,
}

impl ErrorCategory {
    /// Remediation text suitable for a user-facing message.
    pub fn hint(self) -> &'static str {
        match self {
            ErrorCategory::PermissionDenied => {
                "Allow Bluetooth access for the app in the system settings."
            }
            ErrorCategory::DiscoveryTimeout => {
                "No unit found. Check that it is powered on and nearby, then scan again."
            }
            ErrorCategory::ConnectionFailure => {
                "Could not reach the unit. Check that the phone is on the unit's own \
                 Wi-Fi network (or within Bluetooth range) and that mobile data is off."
            }
            ErrorCategory::ResponseTimeout => {
                "The unit did not answer. Restart it and try again."
            }
            ErrorCategory::MalformedPayload => {
                "The unit sent an unreadable answer. Restart it and try again."
            }
            ErrorCategory::AssociationFailure => {
                "The unit is configured but could not be linked. Retry linking from the devices list."
            }
            ErrorCategory::Usage => "Finish or cancel the current setup before starting another.",
        }
    }
}

impl ProvisionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProvisionError::PermissionDenied(_) => ErrorCategory::PermissionDenied,
            ProvisionError::DiscoveryTimeout { .. } => ErrorCategory::DiscoveryTimeout,
            ProvisionError::ConnectionFailed(_) => ErrorCategory::ConnectionFailure,
            ProvisionError::ResponseTimeout { .. } => ErrorCategory::ResponseTimeout,
            ProvisionError::MalformedPayload(_) => ErrorCategory::MalformedPayload,
            ProvisionError::AssociationFailed(_) => ErrorCategory::AssociationFailure,
            ProvisionError::Busy
            | ProvisionError::InvalidState { .. }
            | ProvisionError::InvalidInput(_) => ErrorCategory::Usage,
        }
    }

    /// Returns `false` for failures after which the caller may simply retry
    /// the same step without restarting the session.
    pub fn is_fatal_to_session(&self) -> bool {
        !matches!(
            self,
            ProvisionError::DiscoveryTimeout { .. }
                | ProvisionError::AssociationFailed(_)
                | ProvisionError::Busy
                | ProvisionError::InvalidState { .. }
                | ProvisionError::InvalidInput(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_failure_and_timeout_are_distinct_categories() {
        // Arrange
        let refused = ProvisionError::ConnectionFailed("connection refused".to_string());
        let silent = ProvisionError::ResponseTimeout {
            after: Duration::from_secs(10),
        };

        // Assert
        assert_ne!(refused.category(), silent.category());
        assert_ne!(refused.category().hint(), silent.category().hint());
    }

    #[test]
    fn test_connection_failed_keeps_transport_message_verbatim() {
        let err = ProvisionError::ConnectionFailed("GATT error 133".to_string());
        assert!(err.to_string().contains("GATT error 133"));
    }

    #[test]
    fn test_protocol_error_converts_to_malformed_payload() {
        let err: ProvisionError = ProtocolError::EmptyNetworkList.into();
        assert_eq!(err.category(), ErrorCategory::MalformedPayload);
        assert!(err.is_fatal_to_session());
    }

    #[test]
    fn test_discovery_timeout_is_not_fatal() {
        let err = ProvisionError::DiscoveryTimeout {
            window: Duration::from_secs(5),
        };
        assert!(!err.is_fatal_to_session());
    }

    #[test]
    fn test_association_failure_message_says_device_is_ready() {
        let err = ProvisionError::AssociationFailed("store offline".to_string());
        assert!(err.to_string().starts_with("device ready, but not linked"));
        assert!(!err.is_fatal_to_session());
    }

    #[test]
    fn test_usage_errors_share_one_category() {
        let errors = [
            ProvisionError::Busy,
            ProvisionError::InvalidInput("empty password".to_string()),
            ProvisionError::InvalidState {
                operation: "submit password",
                state: SessionState::Idle,
            },
        ];
        for err in errors {
            assert_eq!(err.category(), ErrorCategory::Usage);
        }
    }
}
