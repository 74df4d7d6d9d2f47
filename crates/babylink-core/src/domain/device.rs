//! Device-level entities: radio scan hits, broadcast-discovered units, and the
//! association request handed to the external writer.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::protocol::ProtocolError;

/// Role of a BabyLink unit.
///
/// On the wire the role is spelled in upper case (`EMITTER` / `RECEIVER`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceType {
    /// The unit placed next to the child; captures audio.
    Emitter,
    /// The unit kept by the parents; plays audio back.
    Receiver,
}

impl DeviceType {
    /// Returns the wire spelling of this role.
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceType::Emitter => "EMITTER",
            DeviceType::Receiver => "RECEIVER",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EMITTER" => Ok(DeviceType::Emitter),
            "RECEIVER" => Ok(DeviceType::Receiver),
            other => Err(ProtocolError::UnknownDeviceType(other.to_string())),
        }
    }
}

/// A radio peripheral seen during one scan session.
///
/// Transient: the list holding these is discarded when the scan session ends
/// or the provisioning flow is abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredPeripheral {
    /// Platform identifier of the peripheral (a Bluetooth address on most hosts).
    pub id: String,
    /// Local name from the advertisement packet.
    pub advertised_name: String,
}

/// A provisioned unit that announced itself on the local network.
///
/// Uniqueness is by [`id`](Self::id): the discovery set never holds two
/// entries with the same hardware identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    /// Hardware identifier (MAC address) reported by the unit.
    pub id: String,
    /// Role reported by the unit.
    pub device_type: DeviceType,
    /// Source address of the announcement datagram.
    pub network_address: IpAddr,
}

/// Link between a unit and a person record, handed to the association writer.
///
/// Not retained by this subsystem once the writer returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationRequest {
    pub device_id: String,
    pub target_person_id: String,
    pub device_type: DeviceType,
}

impl AssociationRequest {
    /// Builds the request for a unit picked from the discovery list.
    pub fn for_discovered(device: &DiscoveredDevice, target_person_id: impl Into<String>) -> Self {
        Self {
            device_id: device.id.clone(),
            target_person_id: target_person_id.into(),
            device_type: device.device_type,
        }
    }
}
