//! Wire formats spoken by BabyLink units.
//!
//! Every format here must match the unit firmware byte for byte:
//!
//! | Transport | Module        | Framing                                   |
//! |-----------|---------------|-------------------------------------------|
//! | Radio     | [`radio`]     | characteristic value = base64 text        |
//! | Socket    | [`socket`]    | `\n`-terminated commands, sentinel replies |
//! | Broadcast | [`broadcast`] | one `BABYPHONE|<TYPE>|<ID>` per datagram  |
//!
//! [`framing`] holds the network-list splitting that radio and socket share.

use thiserror::Error;

pub mod broadcast;
pub mod framing;
pub mod radio;
pub mod socket;

/// Errors produced while decoding a device payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The characteristic value is not valid base64.
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(String),

    /// The payload bytes are not valid UTF-8 text.
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,

    /// The unit reported a network list with no usable names.
    #[error("device reported no networks")]
    EmptyNetworkList,

    /// A broadcast datagram does not start with the expected tag.
    #[error("unexpected announcement tag")]
    WrongTag,

    /// A broadcast datagram has the wrong number of `|`-separated fields.
    #[error("expected {expected} fields, found {found}")]
    WrongFieldCount { expected: usize, found: usize },

    /// The ID field of an announcement is empty.
    #[error("announcement carries an empty device id")]
    MissingDeviceId,

    /// The TYPE field of an announcement is neither `EMITTER` nor `RECEIVER`.
    #[error("unknown device type: {0}")]
    UnknownDeviceType(String),

    /// A socket reply completed without the token the command expects.
    #[error("unexpected response: {0:?}")]
    UnexpectedResponse(String),
}
