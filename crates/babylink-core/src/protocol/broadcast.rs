//! Broadcast (UDP) announcement format.
//!
//! A provisioned unit periodically broadcasts one datagram:
//!
//! ```text
//! BABYPHONE|EMITTER|AA:BB:CC:DD:EE:FF
//! ^^^^^^^^^ ^^^^^^^ ^^^^^^^^^^^^^^^^^
//!    tag     type    hardware id
//! ```
//!
//! Other devices on the LAN may broadcast on the same port, so a datagram
//! that does not parse is simply dropped by the listener.

use std::net::IpAddr;

use super::framing::FIELD_DELIMITER;
use super::ProtocolError;
use crate::domain::device::{DeviceType, DiscoveredDevice};

/// Tag opening every announcement.
pub const ANNOUNCEMENT_TAG: &str = "BABYPHONE";

/// UDP port the units broadcast to.
pub const DEFAULT_DISCOVERY_PORT: u16 = 12345;

/// Number of `|`-separated fields in an announcement.
pub const ANNOUNCEMENT_FIELDS: usize = 3;

/// A decoded announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub device_type: DeviceType,
    pub device_id: String,
}

impl Announcement {
    /// Encodes the announcement the way the unit firmware sends it.
    pub fn to_wire(&self) -> Vec<u8> {
        format!(
            "{ANNOUNCEMENT_TAG}{FIELD_DELIMITER}{}{FIELD_DELIMITER}{}",
            self.device_type, self.device_id
        )
        .into_bytes()
    }

    /// Attaches the datagram's source address.
    pub fn into_device(self, network_address: IpAddr) -> DiscoveredDevice {
        DiscoveredDevice {
            id: self.device_id,
            device_type: self.device_type,
            network_address,
        }
    }
}

/// Parses one datagram.
///
/// Trailing whitespace (a newline appended by some firmware builds) is
/// ignored.
///
/// # Errors
///
/// Returns a [`ProtocolError`] for non-UTF-8 payloads, a missing tag, a field
/// count other than three, an unknown device type, or an empty id.
pub fn parse_announcement(datagram: &[u8]) -> Result<Announcement, ProtocolError> {
    let text = std::str::from_utf8(datagram).map_err(|_| ProtocolError::InvalidUtf8)?;
    let text = text.trim_end();

    if !text.starts_with(ANNOUNCEMENT_TAG) {
        return Err(ProtocolError::WrongTag);
    }

    let fields: Vec<&str> = text.split(FIELD_DELIMITER).collect();
    if fields.len() != ANNOUNCEMENT_FIELDS {
        return Err(ProtocolError::WrongFieldCount {
            expected: ANNOUNCEMENT_FIELDS,
            found: fields.len(),
        });
    }
    if fields[0] != ANNOUNCEMENT_TAG {
        return Err(ProtocolError::WrongTag);
    }

    let device_type: DeviceType = fields[1].parse()?;
    let device_id = fields[2];
    if device_id.is_empty() {
        return Err(ProtocolError::MissingDeviceId);
    }

    Ok(Announcement {
        device_type,
        device_id: device_id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_emitter_announcement() {
        // Arrange
        let datagram = b"BABYPHONE|EMITTER|AA:BB:CC:DD:EE:FF";

        // Act
        let announcement = parse_announcement(datagram).expect("valid announcement");

        // Assert
        assert_eq!(announcement.device_type, DeviceType::Emitter);
        assert_eq!(announcement.device_id, "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_into_device_keeps_source_address() {
        let announcement = parse_announcement(b"BABYPHONE|EMITTER|AA:BB:CC:DD:EE:FF").unwrap();
        let device = announcement.into_device("10.0.0.42".parse().unwrap());
        assert_eq!(
            device,
            DiscoveredDevice {
                id: "AA:BB:CC:DD:EE:FF".to_string(),
                device_type: DeviceType::Emitter,
                network_address: "10.0.0.42".parse().unwrap(),
            }
        );
    }

    #[test]
    fn test_parse_tolerates_trailing_newline() {
        let announcement = parse_announcement(b"BABYPHONE|RECEIVER|11:22\n").unwrap();
        assert_eq!(announcement.device_id, "11:22");
        assert_eq!(announcement.device_type, DeviceType::Receiver);
    }

    #[test]
    fn test_parse_rejects_foreign_tag() {
        assert_eq!(
            parse_announcement(b"SONOS|SPEAKER|1"),
            Err(ProtocolError::WrongTag)
        );
    }

    #[test]
    fn test_parse_rejects_tag_with_suffix() {
        assert_eq!(
            parse_announcement(b"BABYPHONE2|EMITTER|1"),
            Err(ProtocolError::WrongTag)
        );
    }

    #[test]
    fn test_parse_rejects_wrong_field_count() {
        assert_eq!(
            parse_announcement(b"BABYPHONE|EMITTER"),
            Err(ProtocolError::WrongFieldCount { expected: 3, found: 2 })
        );
        assert_eq!(
            parse_announcement(b"BABYPHONE|EMITTER|1|extra"),
            Err(ProtocolError::WrongFieldCount { expected: 3, found: 4 })
        );
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        assert_eq!(
            parse_announcement(b"BABYPHONE|CAMERA|1"),
            Err(ProtocolError::UnknownDeviceType("CAMERA".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_empty_id() {
        assert_eq!(
            parse_announcement(b"BABYPHONE|EMITTER|"),
            Err(ProtocolError::MissingDeviceId)
        );
    }

    #[test]
    fn test_parse_rejects_binary_garbage() {
        assert_eq!(
            parse_announcement(&[0xC3, 0x28, 0x7C]),
            Err(ProtocolError::InvalidUtf8)
        );
    }

    #[test]
    fn test_to_wire_matches_firmware_format() {
        let announcement = Announcement {
            device_type: DeviceType::Receiver,
            device_id: "AA:BB".to_string(),
        };
        assert_eq!(announcement.to_wire(), b"BABYPHONE|RECEIVER|AA:BB".to_vec());
    }
}
