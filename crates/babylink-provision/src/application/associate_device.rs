//! AssociateDeviceUseCase: link a unit to a person record.
//!
//! Persistence of the link belongs to the app's data layer, which this crate
//! only sees through the [`AssociationWriter`] trait.  The use case is called
//! in two places:
//!
//! 1. after a provisioner delivered credentials, when the caller named a
//!    target person up front ([`AssociationTarget`]);
//! 2. after the user picked a unit from the broadcast discovery list.
//!
//! A writer failure never undoes provisioning.  The unit stays configured and
//! the caller may retry the link on its own.

use std::sync::Arc;

use async_trait::async_trait;
use babylink_core::{AssociationRequest, DeviceType, DiscoveredDevice};
use tracing::{info, warn};

use super::error::ProvisionError;

/// External sink for device-to-person links.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssociationWriter: Send + Sync {
    /// Persists the link.  The error text is shown to the user as-is.
    async fn associate(&self, request: AssociationRequest) -> Result<(), String>;
}

/// Person (and unit role) a provisioning flow should link on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationTarget {
    pub person_id: String,
    pub device_type: DeviceType,
}

impl AssociationTarget {
    pub fn new(person_id: impl Into<String>, device_type: DeviceType) -> Self {
        Self {
            person_id: person_id.into(),
            device_type,
        }
    }
}

/// How a successful provisioning run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningOutcome {
    /// Credentials delivered; no association was requested (or the device id
    /// is unknown, as with socket provisioning).  The unit is expected to
    /// show up in broadcast discovery.
    Provisioned { device_id: Option<String> },
    /// Credentials delivered and the link was written.
    Linked {
        device_id: String,
        person_id: String,
    },
    /// Credentials delivered but the writer failed.  Retry the link only.
    NotLinked { device_id: String, reason: String },
}

/// Wraps an [`AssociationWriter`] with logging and error mapping.
#[derive(Clone)]
pub struct AssociateDeviceUseCase {
    writer: Arc<dyn AssociationWriter>,
}

impl AssociateDeviceUseCase {
    pub fn new(writer: Arc<dyn AssociationWriter>) -> Self {
        Self { writer }
    }

    /// Writes one link.
    ///
    /// # Errors
    ///
    /// [`ProvisionError::AssociationFailed`] carrying the writer's message.
    pub async fn link(&self, request: AssociationRequest) -> Result<(), ProvisionError> {
        let device_id = request.device_id.clone();
        let person_id = request.target_person_id.clone();
        match self.writer.associate(request).await {
            Ok(()) => {
                info!("linked device {device_id} to {person_id}");
                Ok(())
            }
            Err(reason) => {
                warn!("linking device {device_id} to {person_id} failed: {reason}");
                Err(ProvisionError::AssociationFailed(reason))
            }
        }
    }

    /// Links a unit the user picked from the discovery list.
    pub async fn link_discovered(
        &self,
        device: &DiscoveredDevice,
        person_id: &str,
    ) -> Result<(), ProvisionError> {
        self.link(AssociationRequest::for_discovered(device, person_id))
            .await
    }

    /// Completes a provisioning run: links the unit when both a target and a
    /// device id are known, and reports the outcome.
    ///
    /// Never fails; a writer error becomes [`ProvisioningOutcome::NotLinked`].
    pub async fn complete_provisioning(
        &self,
        device_id: Option<String>,
        target: Option<&AssociationTarget>,
    ) -> ProvisioningOutcome {
        let (device_id, target) = match (device_id, target) {
            (Some(device_id), Some(target)) => (device_id, target),
            (device_id, _) => return ProvisioningOutcome::Provisioned { device_id },
        };

        let request = AssociationRequest {
            device_id: device_id.clone(),
            target_person_id: target.person_id.clone(),
            device_type: target.device_type,
        };
        match self.link(request).await {
            Ok(()) => ProvisioningOutcome::Linked {
                device_id,
                person_id: target.person_id.clone(),
            },
            Err(e) => ProvisioningOutcome::NotLinked {
                device_id,
                reason: match e {
                    ProvisionError::AssociationFailed(reason) => reason,
                    other => other.to_string(),
                },
            },
        }
    }
}
