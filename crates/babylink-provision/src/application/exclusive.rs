//! Mutual exclusion between the radio and socket provisioning flows.
//!
//! Only one provisioning flow may own a transport at a time.  Both
//! provisioners are built with a clone of the same [`ProvisioningLock`]; a
//! flow takes a [`TransportLease`] when it starts and drops it on success,
//! failure or cleanup.  A second flow started in the meantime gets
//! [`ProvisionError::Busy`] instead of sharing the hardware.

use std::sync::Arc;

use babylink_core::TransportKind;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use super::error::ProvisionError;

/// Shared lock; clones refer to the same underlying slot.
#[derive(Debug, Clone, Default)]
pub struct ProvisioningLock {
    slot: Arc<Mutex<()>>,
}

/// Proof that a flow owns the provisioning transports.
///
/// Releases the lock when dropped.
#[derive(Debug)]
pub struct TransportLease {
    transport: TransportKind,
    _guard: OwnedMutexGuard<()>,
}

impl ProvisioningLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the lock for `transport` without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Busy`] if another flow holds it.
    pub fn try_acquire(&self, transport: TransportKind) -> Result<TransportLease, ProvisionError> {
        let guard = Arc::clone(&self.slot)
            .try_lock_owned()
            .map_err(|_| ProvisionError::Busy)?;
        debug!("{transport} flow acquired the provisioning lock");
        Ok(TransportLease {
            transport,
            _guard: guard,
        })
    }

    /// Returns `true` while some flow holds a lease.
    pub fn is_held(&self) -> bool {
        self.slot.try_lock().is_err()
    }
}

impl TransportLease {
    pub fn transport(&self) -> TransportKind {
        self.transport
    }
}

impl Drop for TransportLease {
    fn drop(&mut self) {
        debug!("{} flow released the provisioning lock", self.transport);
    }
}
