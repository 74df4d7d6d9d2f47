//! [`RadioCentral`] backed by the host Bluetooth stack through `btleplug`.
//!
//! Peripherals are identified by their Bluetooth address string.  The
//! requested MTU is logged only: `btleplug` leaves MTU negotiation to the
//! platform, and the unit's values fit the 23-byte minimum.
//!
//! `btleplug` reads and writes the characteristic bytes as they travel on
//! the air, so this central reports [`CharacteristicEncoding::Raw`].

use std::sync::Arc;

use async_trait::async_trait;
use babylink_core::protocol::radio::CharacteristicEncoding;
use babylink_core::DiscoveredPeripheral;
use btleplug::api::{Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tracing::{debug, info};
use uuid::Uuid;

use super::{RadioCentral, RadioError, RadioLink};

impl From<btleplug::Error> for RadioError {
    fn from(e: btleplug::Error) -> Self {
        match e {
            btleplug::Error::PermissionDenied => RadioError::PermissionDenied(e.to_string()),
            btleplug::Error::TimedOut(_) => RadioError::TimedOut,
            other => RadioError::Link(other.to_string()),
        }
    }
}

/// The first Bluetooth adapter reported by the host.
pub struct BtleCentral {
    adapter: Adapter,
}

impl BtleCentral {
    /// Value view of the `btleplug` stack: plain bytes.
    pub const VALUE_ENCODING: CharacteristicEncoding = CharacteristicEncoding::Raw;

    /// Opens the host's first adapter.
    ///
    /// # Errors
    ///
    /// [`RadioError::NoAdapter`] when the host reports none.
    pub async fn first_adapter() -> Result<Self, RadioError> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(RadioError::NoAdapter)?;
        info!("using Bluetooth adapter {}", adapter.adapter_info().await.unwrap_or_default());
        Ok(Self { adapter })
    }

    async fn find(&self, peripheral_id: &str) -> Result<Peripheral, RadioError> {
        for peripheral in self.adapter.peripherals().await? {
            if peripheral.address().to_string() == peripheral_id {
                return Ok(peripheral);
            }
        }
        Err(RadioError::UnknownPeripheral(peripheral_id.to_string()))
    }
}

#[async_trait]
impl RadioCentral for BtleCentral {
    async fn start_scan(&self) -> Result<(), RadioError> {
        self.adapter.start_scan(ScanFilter::default()).await?;
        Ok(())
    }

    async fn stop_scan(&self) -> Result<(), RadioError> {
        self.adapter.stop_scan().await?;
        Ok(())
    }

    async fn peripherals(&self) -> Result<Vec<DiscoveredPeripheral>, RadioError> {
        let mut found = Vec::new();
        for peripheral in self.adapter.peripherals().await? {
            let Some(props) = peripheral.properties().await? else {
                continue;
            };
            if let Some(name) = props.local_name {
                found.push(DiscoveredPeripheral {
                    id: peripheral.address().to_string(),
                    advertised_name: name,
                });
            }
        }
        Ok(found)
    }

    async fn link(&self, peripheral_id: &str) -> Result<Arc<dyn RadioLink>, RadioError> {
        let peripheral = self.find(peripheral_id).await?;
        Ok(Arc::new(BtleLink {
            id: peripheral_id.to_string(),
            peripheral,
        }))
    }

    fn value_encoding(&self) -> CharacteristicEncoding {
        Self::VALUE_ENCODING
    }
}

/// Link to one peripheral found by [`BtleCentral`].
pub struct BtleLink {
    id: String,
    peripheral: Peripheral,
}

impl BtleLink {
    fn characteristic(&self, service: Uuid, uuid: Uuid) -> Result<Characteristic, RadioError> {
        self.peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == uuid && c.service_uuid == service)
            .ok_or(RadioError::MissingCharacteristic(uuid))
    }
}

#[async_trait]
impl RadioLink for BtleLink {
    async fn connect(&self, mtu: u16) -> Result<(), RadioError> {
        debug!("connecting to {} (requested MTU {mtu})", self.id);
        self.peripheral.connect().await?;
        Ok(())
    }

    async fn discover_services(&self) -> Result<(), RadioError> {
        self.peripheral.discover_services().await?;
        debug!(
            "{} exposes {} characteristic(s)",
            self.id,
            self.peripheral.characteristics().len()
        );
        Ok(())
    }

    async fn read(&self, service: Uuid, characteristic: Uuid) -> Result<Vec<u8>, RadioError> {
        let c = self.characteristic(service, characteristic)?;
        Ok(self.peripheral.read(&c).await?)
    }

    async fn write_with_response(
        &self,
        service: Uuid,
        characteristic: Uuid,
        value: &[u8],
    ) -> Result<(), RadioError> {
        let c = self.characteristic(service, characteristic)?;
        self.peripheral
            .write(&c, value, WriteType::WithResponse)
            .await?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), RadioError> {
        self.peripheral.disconnect().await?;
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }
}
