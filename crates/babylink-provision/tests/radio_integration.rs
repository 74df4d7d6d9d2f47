//! Integration tests for radio provisioning through the public API.
//!
//! Uses the scripted mock central in place of a Bluetooth adapter and a
//! recording association writer in place of the app's data layer.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use babylink_core::{AssociationRequest, DeviceType, SessionState, TransportKind};
use babylink_provision::application::associate_device::{
    AssociateDeviceUseCase, AssociationTarget, AssociationWriter, ProvisioningOutcome,
};
use babylink_provision::application::error::ProvisionError;
use babylink_provision::application::exclusive::ProvisioningLock;
use babylink_provision::infrastructure::radio::mock::{LinkBehaviour, MockRadioCentral};
use babylink_provision::infrastructure::radio::provisioner::RadioProvisioner;
use babylink_provision::infrastructure::socket::{SocketProvisioner, SocketTransport};
use babylink_provision::infrastructure::storage::config::{RadioConfig, SocketConfig};

#[derive(Default)]
struct RecordingWriter {
    requests: Mutex<Vec<AssociationRequest>>,
}

#[async_trait]
impl AssociationWriter for RecordingWriter {
    async fn associate(&self, request: AssociationRequest) -> Result<(), String> {
        self.requests.lock().unwrap().push(request);
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_radio_flow_provisions_and_links_unit() {
    // Arrange
    let central = MockRadioCentral::new();
    central.add_peripheral("C0:FF:EE:00:00:01", "Shield-A3", LinkBehaviour::networks("Home_WiFi|Neighbor_5G"));
    central.add_peripheral("C0:FF:EE:00:00:02", "RandomSpeaker", LinkBehaviour::default());
    let writer = Arc::new(RecordingWriter::default());
    let mut provisioner = RadioProvisioner::new(
        Arc::new(central.clone()),
        RadioConfig::default(),
        ProvisioningLock::new(),
    )
    .with_association(
        AssociateDeviceUseCase::new(writer.clone()),
        AssociationTarget::new("child-7", DeviceType::Emitter),
    );

    // Act
    let found = provisioner.start_scan().await.unwrap();
    provisioner.select_device(&found[0].id).await.unwrap();
    provisioner.read_networks().await.unwrap();
    provisioner.select_network("Neighbor_5G").unwrap();
    let outcome = provisioner.submit_password("hunter22").await.unwrap();

    // Assert
    assert_eq!(found.len(), 1);
    assert_eq!(provisioner.state(), SessionState::Done);
    assert_eq!(
        outcome,
        ProvisioningOutcome::Linked {
            device_id: "C0:FF:EE:00:00:01".to_string(),
            person_id: "child-7".to_string()
        }
    );
    assert_eq!(
        *writer.requests.lock().unwrap(),
        vec![AssociationRequest {
            device_id: "C0:FF:EE:00:00:01".to_string(),
            target_person_id: "child-7".to_string(),
            device_type: DeviceType::Emitter,
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_radio_and_socket_flows_exclude_each_other() {
    // Arrange
    let lock = ProvisioningLock::new();
    let central = MockRadioCentral::new();
    central.add_peripheral("AA", "Baby-1", LinkBehaviour::networks("Home"));
    let mut radio = RadioProvisioner::new(Arc::new(central), RadioConfig::default(), lock.clone());
    let mut socket = SocketProvisioner::new(
        SocketTransport::from_config(&SocketConfig::default()),
        lock.clone(),
    );

    // Act
    radio.start_scan().await.unwrap();
    let blocked = socket.scan_networks().await;
    radio.cleanup().await;

    // Assert
    assert_eq!(blocked, Err(ProvisionError::Busy));
    assert_eq!(socket.state(), SessionState::Instructing);
    assert!(!lock.is_held());
    assert!(lock.try_acquire(TransportKind::Socket).is_ok());
}
