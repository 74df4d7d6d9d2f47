//! RadioProvisioner: scan, pick a unit, read its networks, send credentials.
//!
//! ```text
//! Idle ─start_scan─► Scanning ─select_device─► DeviceSelected ─► Connecting
//!      ─► DiscoveringServices ─read_networks─► ReadingNetworks ─► NetworkList
//!      ─select_network─► NetworkSelected ─► AwaitingPassword
//!      ─submit_password─► SendingCredentials ─► Done | Failed
//! ```
//!
//! The provisioner takes the provisioning lock when a scan starts and keeps
//! it until the flow ends or [`RadioProvisioner::cleanup`] runs, so the socket
//! flow cannot run at the same time.

use std::sync::Arc;

use babylink_core::protocol::radio::matches_allow_list;
use babylink_core::{DiscoveredPeripheral, NetworkList, SessionState, TransportKind};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::{RadioCentral, RadioTransport};
use crate::application::associate_device::{
    AssociateDeviceUseCase, AssociationTarget, ProvisioningOutcome,
};
use crate::application::error::ProvisionError;
use crate::application::exclusive::{ProvisioningLock, TransportLease};
use crate::application::provision::ProvisioningSession;
use crate::infrastructure::storage::config::RadioConfig;

/// Drives one radio provisioning flow at a time.
pub struct RadioProvisioner {
    central: Arc<dyn RadioCentral>,
    config: RadioConfig,
    lock: ProvisioningLock,
    lease: Option<TransportLease>,
    peripherals: Vec<DiscoveredPeripheral>,
    scanned: bool,
    session: Option<ProvisioningSession<RadioTransport>>,
    association: Option<(AssociateDeviceUseCase, AssociationTarget)>,
}

impl RadioProvisioner {
    pub fn new(central: Arc<dyn RadioCentral>, config: RadioConfig, lock: ProvisioningLock) -> Self {
        Self {
            central,
            config,
            lock,
            lease: None,
            peripherals: Vec::new(),
            scanned: false,
            session: None,
            association: None,
        }
    }

    /// Links the provisioned unit to `target` once credentials are delivered.
    pub fn with_association(mut self, use_case: AssociateDeviceUseCase, target: AssociationTarget) -> Self {
        self.association = Some((use_case, target));
        self
    }

    pub fn state(&self) -> SessionState {
        match &self.session {
            Some(session) => session.state(),
            None if self.scanned => SessionState::Scanning,
            None => SessionState::Idle,
        }
    }

    /// Peripherals that passed the name filter in the last scan, in first-seen order.
    pub fn peripherals(&self) -> &[DiscoveredPeripheral] {
        &self.peripherals
    }

    pub fn networks(&self) -> Option<&NetworkList> {
        self.session.as_ref().map(|s| s.networks())
    }

    /// Scans for the configured window and returns the matching peripherals.
    ///
    /// Scanning stops when the window elapses, however many results arrived.
    /// A new scan replaces the previous results.
    ///
    /// # Errors
    ///
    /// - [`ProvisionError::DiscoveryTimeout`] when nothing matched; the
    ///   caller may simply scan again.
    /// - [`ProvisionError::PermissionDenied`] when the OS refuses scanning.
    /// - [`ProvisionError::Busy`] while the socket flow holds the lock.
    pub async fn start_scan(&mut self) -> Result<Vec<DiscoveredPeripheral>, ProvisionError> {
        if self.session.is_some() {
            return Err(ProvisionError::InvalidState {
                operation: "start a scan",
                state: self.state(),
            });
        }
        if self.lease.is_none() {
            self.lease = Some(self.lock.try_acquire(TransportKind::Radio)?);
        }
        self.peripherals.clear();
        self.scanned = false;

        let window = self.config.scan_window();
        if let Err(e) = self.central.start_scan().await {
            self.lease = None;
            return Err(e.into_provision_error(window));
        }
        info!("radio scan started for {window:?}");

        let collected = self.collect_until(Instant::now() + window).await;
        self.stop_scan().await;

        if let Err(e) = collected {
            self.lease = None;
            return Err(e);
        }
        if self.peripherals.is_empty() {
            self.lease = None;
            return Err(ProvisionError::DiscoveryTimeout { window });
        }

        self.scanned = true;
        info!("radio scan found {} device(s)", self.peripherals.len());
        Ok(self.peripherals.clone())
    }

    /// Connects to a peripheral from the last scan and discovers its services.
    ///
    /// # Errors
    ///
    /// On connection failure the flow returns to `Idle` and the lock is
    /// released; nothing is retried.
    pub async fn select_device(&mut self, peripheral_id: &str) -> Result<(), ProvisionError> {
        if self.session.is_some() || !self.scanned {
            return Err(ProvisionError::InvalidState {
                operation: "select a device",
                state: self.state(),
            });
        }
        if !self.peripherals.iter().any(|p| p.id == peripheral_id) {
            return Err(ProvisionError::InvalidInput(format!(
                "device {peripheral_id} was not found by the last scan"
            )));
        }

        self.stop_scan().await;
        self.scanned = false;
        info!("connecting to {peripheral_id}");

        let transport = RadioTransport::new(Arc::clone(&self.central), peripheral_id, &self.config);
        let mut session = ProvisioningSession::new(transport, SessionState::DeviceSelected);
        match session.connect().await {
            Ok(()) => {
                self.session = Some(session);
                Ok(())
            }
            Err(e) => {
                // The session already released the link.
                self.peripherals.clear();
                self.lease = None;
                Err(e)
            }
        }
    }

    /// Reads and decodes the unit's network list.
    ///
    /// # Errors
    ///
    /// An empty or undecodable value fails the flow.
    pub async fn read_networks(&mut self) -> Result<NetworkList, ProvisionError> {
        let session = self.session_mut("read networks")?;
        let result = session.read_networks().await;
        let networks = session.networks().clone();
        self.settle();
        result.map(|_| networks)
    }

    pub fn select_network(&mut self, name: &str) -> Result<(), ProvisionError> {
        self.session_mut("select a network")?.select_network(name)
    }

    /// Writes the credentials and, when configured, links the unit.
    ///
    /// # Errors
    ///
    /// Write failures and disconnects fail the flow with the stack's message.
    /// An association failure is not an error here: it is reported as
    /// [`ProvisioningOutcome::NotLinked`].
    pub async fn submit_password(&mut self, password: &str) -> Result<ProvisioningOutcome, ProvisionError> {
        let session = self.session_mut("submit a password")?;
        let result = session.submit_password(password).await;
        let device_id = session.device_id();
        self.settle();
        result?;

        Ok(match &self.association {
            Some((use_case, target)) => use_case.complete_provisioning(device_id, Some(target)).await,
            None => ProvisioningOutcome::Provisioned { device_id },
        })
    }

    /// Stops any scan, releases any link, and returns to `Idle`.
    ///
    /// Safe to call from any state and any number of times.
    pub async fn cleanup(&mut self) {
        self.stop_scan().await;
        if let Some(mut session) = self.session.take() {
            session.cleanup().await;
        }
        self.peripherals.clear();
        self.scanned = false;
        if self.lease.take().is_some() {
            debug!("radio flow cleaned up");
        }
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    /// Polls the central until `deadline`, keeping new allow-listed peripherals.
    async fn collect_until(&mut self, deadline: Instant) -> Result<(), ProvisionError> {
        let poll = self.config.scan_poll_interval();
        loop {
            let seen = self
                .central
                .peripherals()
                .await
                .map_err(|e| e.into_provision_error(self.config.scan_window()))?;
            for peripheral in seen {
                self.keep_if_new(peripheral);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            sleep(poll.min(deadline - now)).await;
        }
    }

    fn keep_if_new(&mut self, peripheral: DiscoveredPeripheral) {
        if !matches_allow_list(&peripheral.advertised_name, &self.config.name_allow_list) {
            return;
        }
        if self.peripherals.iter().any(|p| p.id == peripheral.id) {
            return;
        }
        debug!(
            "found {} ({})",
            peripheral.advertised_name, peripheral.id
        );
        self.peripherals.push(peripheral);
    }

    async fn stop_scan(&self) {
        if let Err(e) = self.central.stop_scan().await {
            warn!("stopping radio scan failed: {e}");
        }
    }

    fn session_mut(
        &mut self,
        operation: &'static str,
    ) -> Result<&mut ProvisioningSession<RadioTransport>, ProvisionError> {
        let state = self.state();
        self.session
            .as_mut()
            .ok_or(ProvisionError::InvalidState { operation, state })
    }

    /// Releases the lock once the session can make no further progress.
    fn settle(&mut self) {
        if self.session.as_ref().is_some_and(|s| s.state().is_terminal()) {
            self.lease = None;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
