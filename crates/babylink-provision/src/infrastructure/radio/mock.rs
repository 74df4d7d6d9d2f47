//! Mock radio central for unit testing.
//!
//! Lets tests script which peripherals a scan finds, and how each link
//! behaves (network list value, refused connect, failed write, a read that
//! never answers), without a Bluetooth adapter.  Clones share state, so a
//! test keeps one handle for inspection and passes another to the code
//! under test.
//!
//! By default the mock behaves like a mobile BLE stack and presents values
//! as base64 text; [`MockRadioCentral::with_value_encoding`] switches it to
//! raw bytes.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use babylink_core::protocol::radio::CharacteristicEncoding;
use babylink_core::DiscoveredPeripheral;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use uuid::Uuid;

use super::{RadioCentral, RadioError, RadioLink};

/// How a scripted peripheral's link behaves.
#[derive(Debug, Clone, Default)]
pub struct LinkBehaviour {
    /// Raw value returned when the networks characteristic is read.
    pub networks_value: Vec<u8>,
    pub connect_error: Option<RadioError>,
    pub discover_error: Option<RadioError>,
    pub write_error: Option<RadioError>,
    /// The connect call never completes.
    pub hang_on_connect: bool,
    /// The read call never completes.
    pub hang_on_read: bool,
}

impl LinkBehaviour {
    /// A well-behaved unit whose networks characteristic holds base64 of `pipe_list`.
    pub fn networks(pipe_list: &str) -> Self {
        Self {
            networks_value: STANDARD.encode(pipe_list).into_bytes(),
            ..Self::default()
        }
    }

    /// A well-behaved unit whose networks characteristic holds `pipe_list` as is.
    pub fn raw_networks(pipe_list: &str) -> Self {
        Self {
            networks_value: pipe_list.as_bytes().to_vec(),
            ..Self::default()
        }
    }
}

#[derive(Debug)]
struct ScriptedPeripheral {
    id: String,
    advertised_name: String,
    behaviour: LinkBehaviour,
    /// Number of polls after which the peripheral shows up in results.
    visible_after_polls: u32,
    connected: bool,
    disconnects: u32,
    requested_mtu: Option<u16>,
    writes: Vec<Vec<u8>>,
}

#[derive(Debug, Default)]
struct CentralState {
    peripherals: Vec<ScriptedPeripheral>,
    scan_error: Option<RadioError>,
    scanning: bool,
    polls: u32,
    stop_scans: u32,
}

impl CentralState {
    fn peripheral_mut(&mut self, id: &str) -> Result<&mut ScriptedPeripheral, RadioError> {
        self.peripherals
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| RadioError::UnknownPeripheral(id.to_string()))
    }

    fn peripheral(&self, id: &str) -> Option<&ScriptedPeripheral> {
        self.peripherals.iter().find(|p| p.id == id)
    }
}

/// A mock implementation of [`RadioCentral`].
#[derive(Debug, Clone)]
pub struct MockRadioCentral {
    state: Arc<Mutex<CentralState>>,
    encoding: CharacteristicEncoding,
}

impl Default for MockRadioCentral {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            encoding: CharacteristicEncoding::Base64,
        }
    }
}

impl MockRadioCentral {
    pub fn new() -> Self {
        Self::default()
    }

    /// Presents characteristic values with `encoding` instead of base64.
    pub fn with_value_encoding(mut self, encoding: CharacteristicEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Adds a peripheral visible from the first poll.
    pub fn add_peripheral(&self, id: &str, advertised_name: &str, behaviour: LinkBehaviour) {
        self.add_peripheral_after(id, advertised_name, behaviour, 0);
    }

    /// Adds a peripheral that shows up only after `polls` peripheral listings.
    pub fn add_peripheral_after(
        &self,
        id: &str,
        advertised_name: &str,
        behaviour: LinkBehaviour,
        polls: u32,
    ) {
        self.lock().peripherals.push(ScriptedPeripheral {
            id: id.to_string(),
            advertised_name: advertised_name.to_string(),
            behaviour,
            visible_after_polls: polls,
            connected: false,
            disconnects: 0,
            requested_mtu: None,
            writes: Vec::new(),
        });
    }

    /// Makes the next `start_scan` fail with `error`.
    pub fn fail_scan_with(&self, error: RadioError) {
        self.lock().scan_error = Some(error);
    }

    pub fn is_scanning(&self) -> bool {
        self.lock().scanning
    }

    pub fn stop_scan_count(&self) -> u32 {
        self.lock().stop_scans
    }

    /// Values written to the credentials characteristic of `id`.
    pub fn written(&self, id: &str) -> Vec<Vec<u8>> {
        self.lock()
            .peripheral(id)
            .map(|p| p.writes.clone())
            .unwrap_or_default()
    }

    pub fn requested_mtu(&self, id: &str) -> Option<u16> {
        self.lock().peripheral(id).and_then(|p| p.requested_mtu)
    }

    pub fn disconnects(&self, id: &str) -> u32 {
        self.lock().peripheral(id).map_or(0, |p| p.disconnects)
    }

    pub fn is_connected(&self, id: &str) -> bool {
        self.lock().peripheral(id).is_some_and(|p| p.connected)
    }

    fn lock(&self) -> MutexGuard<'_, CentralState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RadioCentral for MockRadioCentral {
    async fn start_scan(&self) -> Result<(), RadioError> {
        let mut state = self.lock();
        if let Some(error) = state.scan_error.take() {
            return Err(error);
        }
        state.scanning = true;
        state.polls = 0;
        Ok(())
    }

    async fn stop_scan(&self) -> Result<(), RadioError> {
        let mut state = self.lock();
        state.scanning = false;
        state.stop_scans += 1;
        Ok(())
    }

    async fn peripherals(&self) -> Result<Vec<DiscoveredPeripheral>, RadioError> {
        let mut state = self.lock();
        let polls = state.polls;
        state.polls += 1;
        Ok(state
            .peripherals
            .iter()
            .filter(|p| p.visible_after_polls <= polls)
            .map(|p| DiscoveredPeripheral {
                id: p.id.clone(),
                advertised_name: p.advertised_name.clone(),
            })
            .collect())
    }

    async fn link(&self, peripheral_id: &str) -> Result<Arc<dyn RadioLink>, RadioError> {
        self.lock().peripheral_mut(peripheral_id)?;
        Ok(Arc::new(MockRadioLink {
            id: peripheral_id.to_string(),
            central: self.clone(),
        }))
    }

    fn value_encoding(&self) -> CharacteristicEncoding {
        self.encoding
    }
}

/// Link handed out by [`MockRadioCentral`].
#[derive(Debug)]
pub struct MockRadioLink {
    id: String,
    central: MockRadioCentral,
}

#[async_trait]
impl RadioLink for MockRadioLink {
    async fn connect(&self, mtu: u16) -> Result<(), RadioError> {
        let hang = {
            let mut state = self.central.lock();
            let peripheral = state.peripheral_mut(&self.id)?;
            peripheral.requested_mtu = Some(mtu);
            if let Some(error) = peripheral.behaviour.connect_error.clone() {
                return Err(error);
            }
            peripheral.behaviour.hang_on_connect
        };
        if hang {
            std::future::pending::<()>().await;
        }

        self.central.lock().peripheral_mut(&self.id)?.connected = true;
        Ok(())
    }

    async fn discover_services(&self) -> Result<(), RadioError> {
        let mut state = self.central.lock();
        let peripheral = state.peripheral_mut(&self.id)?;
        match peripheral.behaviour.discover_error.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn read(&self, _service: Uuid, _characteristic: Uuid) -> Result<Vec<u8>, RadioError> {
        let (hang, value) = {
            let mut state = self.central.lock();
            let peripheral = state.peripheral_mut(&self.id)?;
            if !peripheral.connected {
                return Err(RadioError::Link("not connected".to_string()));
            }
            (
                peripheral.behaviour.hang_on_read,
                peripheral.behaviour.networks_value.clone(),
            )
        };
        if hang {
            std::future::pending::<()>().await;
        }
        Ok(value)
    }

    async fn write_with_response(
        &self,
        _service: Uuid,
        _characteristic: Uuid,
        value: &[u8],
    ) -> Result<(), RadioError> {
        let mut state = self.central.lock();
        let peripheral = state.peripheral_mut(&self.id)?;
        if let Some(error) = peripheral.behaviour.write_error.clone() {
            peripheral.connected = false;
            return Err(error);
        }
        peripheral.writes.push(value.to_vec());
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), RadioError> {
        let mut state = self.central.lock();
        let peripheral = state.peripheral_mut(&self.id)?;
        peripheral.connected = false;
        peripheral.disconnects += 1;
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.central.is_connected(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_peripherals_appear_after_scripted_poll_count() {
        // Arrange
        let central = MockRadioCentral::new();
        central.add_peripheral("AA", "Baby-1", LinkBehaviour::default());
        central.add_peripheral_after("BB", "Pico-2", LinkBehaviour::default(), 2);
        central.start_scan().await.unwrap();

        // Act
        let first = central.peripherals().await.unwrap();
        let _second = central.peripherals().await.unwrap();
        let third = central.peripherals().await.unwrap();

        // Assert
        assert_eq!(first.len(), 1);
        assert_eq!(third.len(), 2);
    }

    #[tokio::test]
    async fn test_scripted_scan_error_is_returned_once() {
        let central = MockRadioCentral::new();
        central.fail_scan_with(RadioError::PermissionDenied("location off".into()));

        assert!(central.start_scan().await.is_err());
        assert!(central.start_scan().await.is_ok());
        assert!(central.is_scanning());
    }

    #[tokio::test]
    async fn test_failed_write_drops_connection() {
        let central = MockRadioCentral::new();
        let behaviour = LinkBehaviour {
            write_error: Some(RadioError::Link("link lost".into())),
            ..LinkBehaviour::default()
        };
        central.add_peripheral("AA", "Baby-1", behaviour);
        let link = central.link("AA").await.unwrap();
        link.connect(23).await.unwrap();

        let result = link.write_with_response(Uuid::nil(), Uuid::nil(), b"x").await;

        assert_eq!(result, Err(RadioError::Link("link lost".into())));
        assert!(!link.is_connected().await);
    }
}
