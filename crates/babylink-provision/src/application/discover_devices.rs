//! DiscoveredDeviceSet: the accumulated result of broadcast discovery.
//!
//! The UDP listener feeds every inbound datagram into
//! [`DiscoveredDeviceSet::observe`].  The set parses it, drops anything
//! malformed, and keeps the first announcement per device id.  No I/O happens
//! here, so the retention rules are tested without a socket.

use std::collections::HashSet;
use std::net::SocketAddr;

use babylink_core::protocol::broadcast::parse_announcement;
use babylink_core::DiscoveredDevice;
use tracing::{debug, trace};

/// Devices seen since the listener last started, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct DiscoveredDeviceSet {
    devices: Vec<DiscoveredDevice>,
    seen_ids: HashSet<String>,
}

impl DiscoveredDeviceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one datagram into the set.
    ///
    /// Returns the new device when the datagram introduced one.  Malformed
    /// datagrams and repeats of an already-known id return `None` and leave
    /// the set unchanged.
    pub fn observe(&mut self, datagram: &[u8], source: SocketAddr) -> Option<DiscoveredDevice> {
        let announcement = match parse_announcement(datagram) {
            Ok(announcement) => announcement,
            Err(e) => {
                trace!("ignoring datagram from {source}: {e}");
                return None;
            }
        };

        if self.seen_ids.contains(&announcement.device_id) {
            return None;
        }

        let device = announcement.into_device(source.ip());
        debug!(
            "discovered {} {} at {}",
            device.device_type, device.id, device.network_address
        );
        self.seen_ids.insert(device.id.clone());
        self.devices.push(device.clone());
        Some(device)
    }

    /// Empties the set.  Called when the listener is (re)started.
    pub fn reset(&mut self) {
        self.devices.clear();
        self.seen_ids.clear();
    }

    pub fn devices(&self) -> &[DiscoveredDevice] {
        &self.devices
    }

    pub fn get(&self, id: &str) -> Option<&DiscoveredDevice> {
        self.devices.iter().find(|d| d.id == id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use babylink_core::DeviceType;
    use std::net::{IpAddr, Ipv4Addr};

    fn from(last_octet: u8) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, last_octet)), 40000)
    }

    #[test]
    fn test_valid_announcement_adds_device_with_source_address() {
        // Arrange
        let mut set = DiscoveredDeviceSet::new();

        // Act
        let added = set.observe(b"BABYPHONE|EMITTER|AA:BB:CC:DD:EE:FF", from(42));

        // Assert
        let expected = DiscoveredDevice {
            id: "AA:BB:CC:DD:EE:FF".to_string(),
            device_type: DeviceType::Emitter,
            network_address: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 42)),
        };
        assert_eq!(added, Some(expected.clone()));
        assert_eq!(set.devices(), &[expected]);
    }

    #[test]
    fn test_repeated_id_keeps_first_seen_type_and_address() {
        let mut set = DiscoveredDeviceSet::new();
        set.observe(b"BABYPHONE|EMITTER|AA:BB:CC:DD:EE:FF", from(42));

        let repeat = set.observe(b"BABYPHONE|RECEIVER|AA:BB:CC:DD:EE:FF", from(77));

        assert_eq!(repeat, None);
        assert_eq!(set.len(), 1);
        let kept = set.get("AA:BB:CC:DD:EE:FF").unwrap();
        assert_eq!(kept.device_type, DeviceType::Emitter);
        assert_eq!(kept.network_address, from(42).ip());
    }

    #[test]
    fn test_malformed_datagrams_leave_set_unchanged() {
        // Arrange
        let mut set = DiscoveredDeviceSet::new();
        set.observe(b"BABYPHONE|RECEIVER|11:22:33:44:55:66", from(9));
        let junk: [&[u8]; 6] = [
            b"",
            b"HELLO|EMITTER|AA",
            b"BABYPHONE|EMITTER",
            b"BABYPHONE|EMITTER|AA|extra",
            b"BABYPHONE|TOASTER|AA",
            &[0xff, 0xfe, 0x00],
        ];

        // Act
        for datagram in junk {
            assert_eq!(set.observe(datagram, from(1)), None);
        }

        // Assert
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_reset_discards_previous_devices() {
        let mut set = DiscoveredDeviceSet::new();
        set.observe(b"BABYPHONE|EMITTER|AA", from(2));
        set.observe(b"BABYPHONE|RECEIVER|BB", from(3));

        set.reset();
        let readded = set.observe(b"BABYPHONE|EMITTER|AA", from(4));

        assert!(readded.is_some());
        assert_eq!(set.len(), 1);
        assert_eq!(set.devices()[0].network_address, from(4).ip());
    }

    #[test]
    fn test_devices_are_kept_in_arrival_order() {
        let mut set = DiscoveredDeviceSet::new();
        for id in ["C", "A", "B", "A"] {
            set.observe(format!("BABYPHONE|EMITTER|{id}").as_bytes(), from(5));
        }

        let ids: Vec<&str> = set.devices().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["C", "A", "B"]);
    }
}
