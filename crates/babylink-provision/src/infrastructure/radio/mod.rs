//! Radio (Bluetooth LE) provisioning infrastructure.
//!
//! The unit exposes one GATT service with two characteristics:
//!
//! | Characteristic | Direction | Value |
//! |---|---|---|
//! | networks | read | `name1\|name2\|...` |
//! | credentials | write with response | `<ssid>\|<password>\n` |
//!
//! Each [`RadioCentral`] reports whether its stack hands values over as raw
//! bytes or as base64 text, and [`RadioTransport`] encodes and decodes
//! accordingly.  `radio.value_encoding` in the config overrides that.
//!
//! # Testability
//!
//! The [`RadioCentral`] and [`RadioLink`] traits hide the Bluetooth stack.
//! Production code uses [`btle::BtleCentral`]; tests use
//! [`mock::MockRadioCentral`], which scripts peripherals and link behaviour
//! without an adapter.
//!
//! # Timeouts
//!
//! [`RadioTransport`] arms one timer per step (connect, discover, read,
//! write) and disarms it when the step completes.  A step whose timer fires
//! is treated exactly like a failed step: the link is torn down before the
//! error reaches the caller.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use babylink_core::protocol::radio::{
    decode_network_list, encode_credentials, CharacteristicEncoding,
    CREDENTIALS_CHARACTERISTIC_UUID, NETWORKS_CHARACTERISTIC_UUID, SERVICE_UUID,
};
use babylink_core::{Credentials, DiscoveredPeripheral, TransportKind};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::application::error::ProvisionError;
use crate::application::provision::{NetworkScan, ProvisioningTransport};
use crate::infrastructure::storage::config::RadioConfig;

pub mod btle;
pub mod mock;
pub mod provisioner;

/// Error type reported by radio stack adapters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RadioError {
    /// The OS refused scanning or connecting.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The host has no usable radio adapter.
    #[error("no Bluetooth adapter available")]
    NoAdapter,

    /// The id does not name a peripheral seen by the central.
    #[error("peripheral {0} is not known")]
    UnknownPeripheral(String),

    /// Service discovery did not yield the expected characteristic.
    #[error("characteristic {0} not found")]
    MissingCharacteristic(Uuid),

    /// The stack timed out on its own.
    #[error("radio operation timed out")]
    TimedOut,

    /// Any other stack error, message kept verbatim.
    #[error("{0}")]
    Link(String),
}

impl RadioError {
    /// Maps a stack error onto the caller-facing taxonomy.
    ///
    /// `step_timeout` is reported for errors the stack flags as timeouts.
    pub fn into_provision_error(self, step_timeout: Duration) -> ProvisionError {
        match self {
            RadioError::PermissionDenied(msg) => ProvisionError::PermissionDenied(msg),
            RadioError::NoAdapter => ProvisionError::PermissionDenied(self.to_string()),
            RadioError::TimedOut => ProvisionError::ResponseTimeout {
                after: step_timeout,
            },
            RadioError::UnknownPeripheral(_)
            | RadioError::MissingCharacteristic(_)
            | RadioError::Link(_) => ProvisionError::ConnectionFailed(self.to_string()),
        }
    }
}

/// The host-side radio: scanning and opening links.
#[async_trait]
pub trait RadioCentral: Send + Sync {
    /// Starts passive scanning.
    async fn start_scan(&self) -> Result<(), RadioError>;

    /// Stops scanning.  Must succeed when no scan is running.
    async fn stop_scan(&self) -> Result<(), RadioError>;

    /// Peripherals seen so far that advertise a name.
    async fn peripherals(&self) -> Result<Vec<DiscoveredPeripheral>, RadioError>;

    /// Returns a link handle for a peripheral seen during the scan.
    async fn link(&self, peripheral_id: &str) -> Result<Arc<dyn RadioLink>, RadioError>;

    /// How this stack presents characteristic values to the application.
    fn value_encoding(&self) -> CharacteristicEncoding {
        CharacteristicEncoding::Raw
    }
}

/// A link to one peripheral.
#[async_trait]
pub trait RadioLink: Send + Sync {
    /// Opens the connection, requesting `mtu`.
    async fn connect(&self, mtu: u16) -> Result<(), RadioError>;

    async fn discover_services(&self) -> Result<(), RadioError>;

    async fn read(&self, service: Uuid, characteristic: Uuid) -> Result<Vec<u8>, RadioError>;

    /// Writes and waits for the peripheral's confirmation.
    async fn write_with_response(
        &self,
        service: Uuid,
        characteristic: Uuid,
        value: &[u8],
    ) -> Result<(), RadioError>;

    async fn disconnect(&self) -> Result<(), RadioError>;

    async fn is_connected(&self) -> bool;
}

// ── Transport ─────────────────────────────────────────────────────────────────

/// [`ProvisioningTransport`] over one radio peripheral.
pub struct RadioTransport {
    central: Arc<dyn RadioCentral>,
    peripheral_id: String,
    link: Option<Arc<dyn RadioLink>>,
    requested_mtu: u16,
    step_timeout: Duration,
    encoding: CharacteristicEncoding,
}

impl RadioTransport {
    pub fn new(central: Arc<dyn RadioCentral>, peripheral_id: impl Into<String>, config: &RadioConfig) -> Self {
        let encoding = config
            .value_encoding
            .unwrap_or_else(|| central.value_encoding());
        Self {
            central,
            peripheral_id: peripheral_id.into(),
            link: None,
            requested_mtu: config.requested_mtu,
            step_timeout: config.step_timeout(),
            encoding,
        }
    }

    pub fn encoding(&self) -> CharacteristicEncoding {
        self.encoding
    }

    pub fn peripheral_id(&self) -> &str {
        &self.peripheral_id
    }

    pub fn is_linked(&self) -> bool {
        self.link.is_some()
    }

    fn connected_link(&self) -> Result<Arc<dyn RadioLink>, ProvisionError> {
        self.link
            .clone()
            .ok_or_else(|| ProvisionError::ConnectionFailed("not connected".to_string()))
    }

    /// Runs one radio step under the step timer.
    async fn step<T, F>(&self, label: &'static str, fut: F) -> Result<T, ProvisionError>
    where
        F: Future<Output = Result<T, RadioError>> + Send,
    {
        trace!("radio step {label} on {}", self.peripheral_id);
        match timeout(self.step_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e.into_provision_error(self.step_timeout)),
            Err(_) => Err(ProvisionError::ResponseTimeout {
                after: self.step_timeout,
            }),
        }
    }
}

#[async_trait]
impl ProvisioningTransport for RadioTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Radio
    }

    fn discovers_services(&self) -> bool {
        true
    }

    fn device_id(&self) -> Option<String> {
        Some(self.peripheral_id.clone())
    }

    async fn connect(&mut self) -> Result<(), ProvisionError> {
        let central = Arc::clone(&self.central);
        let link = self
            .step("link", central.link(&self.peripheral_id))
            .await
            .map_err(unreachable_unit)?;
        self.link = Some(Arc::clone(&link));

        self.step("connect", link.connect(self.requested_mtu))
            .await
            .map_err(unreachable_unit)?;
        debug!("connected to {}", self.peripheral_id);
        Ok(())
    }

    async fn discover_services(&mut self) -> Result<(), ProvisionError> {
        let link = self.connected_link()?;
        self.step("discover services", link.discover_services()).await
    }

    async fn request_network_list(&mut self) -> Result<NetworkScan, ProvisionError> {
        let link = self.connected_link()?;
        let value = self
            .step(
                "read networks",
                link.read(SERVICE_UUID, NETWORKS_CHARACTERISTIC_UUID),
            )
            .await?;
        let networks = decode_network_list(&value, self.encoding)?;
        Ok(NetworkScan::Networks(networks))
    }

    async fn send_credentials(&mut self, credentials: &Credentials) -> Result<(), ProvisionError> {
        let link = self.connected_link()?;
        let value = encode_credentials(credentials, self.encoding);
        self.step(
            "write credentials",
            link.write_with_response(SERVICE_UUID, CREDENTIALS_CHARACTERISTIC_UUID, &value),
        )
        .await
    }

    async fn release(&mut self) {
        let Some(link) = self.link.take() else {
            return;
        };
        if link.is_connected().await {
            if let Err(e) = link.disconnect().await {
                debug!("disconnect from {} failed: {e}", self.peripheral_id);
            }
        }
        debug!("released link to {}", self.peripheral_id);
    }
}

/// A connect step that never completes means the unit is out of reach.
fn unreachable_unit(error: ProvisionError) -> ProvisionError {
    match error {
        ProvisionError::ResponseTimeout { after } => ProvisionError::ConnectionFailed(format!(
            "connection attempt timed out after {after:?}"
        )),
        other => other,
    }
}

impl Drop for RadioTransport {
    fn drop(&mut self) {
        let Some(link) = self.link.take() else {
            return;
        };
        // Abandoned without release(); close the link in the background.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if link.is_connected().await {
                        let _ = link.disconnect().await;
                    }
                });
            }
            Err(_) => warn!(
                "radio link to {} dropped outside a runtime; it stays open until the stack closes it",
                self.peripheral_id
            ),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::radio::mock::{LinkBehaviour, MockRadioCentral};
    use babylink_core::{NetworkList, ProtocolError};

    fn transport(central: &MockRadioCentral, id: &str) -> RadioTransport {
        RadioTransport::new(Arc::new(central.clone()), id, &RadioConfig::default())
    }

    #[test]
    fn test_radio_error_mapping_keeps_categories_apart() {
        let limit = Duration::from_secs(10);

        assert_eq!(
            RadioError::PermissionDenied("scan".into()).into_provision_error(limit),
            ProvisionError::PermissionDenied("scan".into())
        );
        assert_eq!(
            RadioError::TimedOut.into_provision_error(limit),
            ProvisionError::ResponseTimeout { after: limit }
        );
        assert_eq!(
            RadioError::Link("GATT error 133".into()).into_provision_error(limit),
            ProvisionError::ConnectionFailed("GATT error 133".into())
        );
    }

    #[tokio::test]
    async fn test_connect_read_and_write_happy_path() {
        // Arrange
        let central = MockRadioCentral::new();
        central.add_peripheral("AA", "Baby-1", LinkBehaviour::networks("Home|Office"));
        let mut transport = transport(&central, "AA");

        // Act
        transport.connect().await.unwrap();
        transport.discover_services().await.unwrap();
        let scan = transport.request_network_list().await.unwrap();
        transport
            .send_credentials(&Credentials::new("Home", "pw"))
            .await
            .unwrap();

        // Assert
        assert_eq!(
            scan,
            NetworkScan::Networks(NetworkList::from_names(["Home", "Office"]))
        );
        assert_eq!(central.written("AA"), vec![b"SG9tZXxwdwo=".to_vec()]);
        assert_eq!(central.requested_mtu("AA"), Some(23));
    }

    #[tokio::test]
    async fn test_raw_central_exchanges_plain_bytes() {
        // Arrange
        let central = MockRadioCentral::new().with_value_encoding(CharacteristicEncoding::Raw);
        central.add_peripheral("AA", "Baby-1", LinkBehaviour::raw_networks("Home|Office"));
        let mut transport = transport(&central, "AA");

        // Act
        transport.connect().await.unwrap();
        let scan = transport.request_network_list().await.unwrap();
        transport
            .send_credentials(&Credentials::new("Home", "pw"))
            .await
            .unwrap();

        // Assert
        assert_eq!(transport.encoding(), CharacteristicEncoding::Raw);
        assert_eq!(
            scan,
            NetworkScan::Networks(NetworkList::from_names(["Home", "Office"]))
        );
        assert_eq!(central.written("AA"), vec![b"Home|pw\n".to_vec()]);
    }

    #[test]
    fn test_configured_encoding_overrides_central() {
        let central = MockRadioCentral::new().with_value_encoding(CharacteristicEncoding::Raw);
        let config = RadioConfig {
            value_encoding: Some(CharacteristicEncoding::Base64),
            ..RadioConfig::default()
        };

        let transport = RadioTransport::new(Arc::new(central), "AA", &config);

        assert_eq!(transport.encoding(), CharacteristicEncoding::Base64);
    }

    #[tokio::test]
    async fn test_empty_networks_value_is_malformed() {
        let central = MockRadioCentral::new();
        central.add_peripheral("AA", "Baby-1", LinkBehaviour::networks(""));
        let mut transport = transport(&central, "AA");
        transport.connect().await.unwrap();

        let err = transport.request_network_list().await.unwrap_err();

        assert_eq!(
            err,
            ProvisionError::MalformedPayload(ProtocolError::EmptyNetworkList)
        );
    }

    #[tokio::test]
    async fn test_refused_connect_surfaces_stack_message() {
        let central = MockRadioCentral::new();
        let behaviour = LinkBehaviour {
            connect_error: Some(RadioError::Link("connection refused".into())),
            ..LinkBehaviour::networks("Home")
        };
        central.add_peripheral("AA", "Baby-1", behaviour);
        let mut transport = transport(&central, "AA");

        let err = transport.connect().await.unwrap_err();

        assert_eq!(err, ProvisionError::ConnectionFailed("connection refused".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_read_times_out_after_step_timeout() {
        // Arrange
        let central = MockRadioCentral::new();
        let behaviour = LinkBehaviour {
            hang_on_read: true,
            ..LinkBehaviour::networks("Home")
        };
        central.add_peripheral("AA", "Baby-1", behaviour);
        let mut transport = transport(&central, "AA");
        transport.connect().await.unwrap();

        // Act
        let err = transport.request_network_list().await.unwrap_err();

        // Assert
        assert_eq!(
            err,
            ProvisionError::ResponseTimeout {
                after: Duration::from_secs(10)
            }
        );
    }

    #[tokio::test]
    async fn test_release_disconnects_once_and_is_idempotent() {
        let central = MockRadioCentral::new();
        central.add_peripheral("AA", "Baby-1", LinkBehaviour::networks("Home"));
        let mut transport = transport(&central, "AA");
        transport.connect().await.unwrap();

        transport.release().await;
        transport.release().await;

        assert_eq!(central.disconnects("AA"), 1);
        assert!(!central.is_connected("AA"));
        assert!(!transport.is_linked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_link_lookup_is_connection_failure() {
        // Arrange: a central whose link lookup never answers.
        struct StalledCentral;

        #[async_trait]
        impl RadioCentral for StalledCentral {
            async fn start_scan(&self) -> Result<(), RadioError> {
                Ok(())
            }
            async fn stop_scan(&self) -> Result<(), RadioError> {
                Ok(())
            }
            async fn peripherals(&self) -> Result<Vec<DiscoveredPeripheral>, RadioError> {
                Ok(Vec::new())
            }
            async fn link(&self, _peripheral_id: &str) -> Result<Arc<dyn RadioLink>, RadioError> {
                std::future::pending().await
            }
        }
        let mut transport =
            RadioTransport::new(Arc::new(StalledCentral), "AA", &RadioConfig::default());

        // Act
        let err = transport.connect().await.unwrap_err();

        // Assert
        assert!(matches!(err, ProvisionError::ConnectionFailed(_)), "{err:?}");
        assert!(!transport.is_linked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_connect_is_connection_failure() {
        let central = MockRadioCentral::new();
        let behaviour = LinkBehaviour {
            hang_on_connect: true,
            ..LinkBehaviour::networks("Home")
        };
        central.add_peripheral("AA", "Baby-1", behaviour);
        let mut transport = transport(&central, "AA");

        let err = transport.connect().await.unwrap_err();

        assert!(matches!(err, ProvisionError::ConnectionFailed(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_unknown_peripheral_fails_connect() {
        let central = MockRadioCentral::new();
        let mut transport = transport(&central, "ZZ");

        let err = transport.connect().await.unwrap_err();

        assert!(matches!(err, ProvisionError::ConnectionFailed(_)));
    }
}
