//! ProvisioningSession: the state machine shared by every provisioning transport.
//!
//! Radio and socket provisioning express the same four phases:
//!
//! ```text
//! reach the unit ─► list its networks ─► pick one ─► deliver credentials
//! ```
//!
//! The phases are implemented once, here, against the
//! [`ProvisioningTransport`] trait.  Each transport supplies its own framing
//! and timing; the session supplies sequencing, input validation and
//! teardown.
//!
//! # Ownership
//!
//! A session owns its transport by value.  The caller holds the session
//! (usually inside a provisioner facade) and drives it with `&mut self`
//! calls, so there is exactly one writer and no shared mutable state.
//!
//! # Failure handling
//!
//! Every transport error goes through [`ProvisioningSession::fail`], which
//! releases the transport *before* the error is returned.  The caller never
//! observes a failed session that still holds an open connection.

use async_trait::async_trait;
use babylink_core::{Credentials, NetworkList, SessionState, TransportKind};
use tracing::{debug, info, warn};

use super::error::ProvisionError;

/// What a unit reported when asked for its networks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkScan {
    Networks(NetworkList),
    /// The unit sees no network at all.  An outcome, not an error.
    NoNetworks,
}

/// Transport adapter driven by [`ProvisioningSession`].
///
/// Implementations own their connection resource, apply their own step
/// timeout, and convert transport errors into [`ProvisionError`].
#[async_trait]
pub trait ProvisioningTransport: Send {
    /// Which transport this is, for logs and the exclusivity lock.
    fn kind(&self) -> TransportKind;

    /// Returns `true` if the transport needs a service-discovery step after
    /// connecting.
    fn discovers_services(&self) -> bool {
        false
    }

    /// Identifier of the unit on the far end, when the transport knows it.
    fn device_id(&self) -> Option<String> {
        None
    }

    /// Reaches the unit.
    async fn connect(&mut self) -> Result<(), ProvisionError>;

    /// Enumerates services on the connected unit.
    async fn discover_services(&mut self) -> Result<(), ProvisionError> {
        Ok(())
    }

    /// Asks the unit which networks it can see.
    async fn request_network_list(&mut self) -> Result<NetworkScan, ProvisionError>;

    /// Delivers credentials and waits for the unit's confirmation.
    async fn send_credentials(&mut self, credentials: &Credentials) -> Result<(), ProvisionError>;

    /// Releases any held connection.  Idempotent; swallows already-closed errors.
    async fn release(&mut self);
}

/// One provisioning attempt over one transport.
pub struct ProvisioningSession<T: ProvisioningTransport> {
    transport: T,
    initial_state: SessionState,
    state: SessionState,
    networks: NetworkList,
    chosen_network: Option<String>,
}

impl<T: ProvisioningTransport> ProvisioningSession<T> {
    /// Creates a session whose sequence starts at `initial_state`.
    ///
    /// Radio sessions start at `DeviceSelected`, socket sessions at
    /// `Instructing`.
    pub fn new(transport: T, initial_state: SessionState) -> Self {
        Self {
            transport,
            initial_state,
            state: initial_state,
            networks: NetworkList::new(),
            chosen_network: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn networks(&self) -> &NetworkList {
        &self.networks
    }

    pub fn chosen_network(&self) -> Option<&str> {
        self.chosen_network.as_deref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// Reaches the unit and, for transports that need it, discovers services.
    ///
    /// # Errors
    ///
    /// Transport errors fail the session; [`ProvisionError::InvalidState`] is
    /// returned without touching the session when called out of order.
    pub async fn connect(&mut self) -> Result<(), ProvisionError> {
        self.advance("connect", SessionState::Connecting)?;
        if let Err(e) = self.transport.connect().await {
            return Err(self.fail(e).await);
        }

        if self.transport.discovers_services() {
            self.advance("discover services", SessionState::DiscoveringServices)?;
            if let Err(e) = self.transport.discover_services().await {
                return Err(self.fail(e).await);
            }
        }
        info!("{} session connected", self.transport.kind());
        Ok(())
    }

    /// Reads the unit's network list.
    ///
    /// # Errors
    ///
    /// Any transport or decoding error fails the session: provisioning
    /// cannot continue without a target network.
    pub async fn read_networks(&mut self) -> Result<NetworkScan, ProvisionError> {
        if !matches!(
            self.state,
            SessionState::Connecting | SessionState::DiscoveringServices
        ) {
            return Err(self.invalid("read networks"));
        }
        self.advance("read networks", SessionState::ReadingNetworks)?;

        let scan = match self.transport.request_network_list().await {
            Ok(scan) => scan,
            Err(e) => return Err(self.fail(e).await),
        };

        self.networks = match &scan {
            NetworkScan::Networks(list) => list.clone(),
            NetworkScan::NoNetworks => NetworkList::new(),
        };
        self.advance("list networks", SessionState::NetworkList)?;
        info!(
            "{} session received {} network(s)",
            self.transport.kind(),
            self.networks.len()
        );
        Ok(scan)
    }

    /// Chooses the target network and moves on to the password step.
    ///
    /// # Errors
    ///
    /// [`ProvisionError::InvalidInput`] if `name` was not in the reported list.
    pub fn select_network(&mut self, name: &str) -> Result<(), ProvisionError> {
        if self.state != SessionState::NetworkList {
            return Err(self.invalid("select a network"));
        }
        // Exact match first: a radio-reported SSID may carry spaces of its own.
        let name = if self.networks.contains(name) { name } else { name.trim() };
        if !self.networks.contains(name) {
            return Err(ProvisionError::InvalidInput(format!(
                "network {name:?} was not reported by the device"
            )));
        }

        self.advance("select a network", SessionState::NetworkSelected)?;
        self.chosen_network = Some(name.to_string());
        self.advance("await password", SessionState::AwaitingPassword)?;
        debug!("network {name:?} selected");
        Ok(())
    }

    /// Sends the credentials for the chosen network.
    ///
    /// On success the session is `Done` and the transport has been released.
    ///
    /// # Errors
    ///
    /// An empty password is rejected before anything is sent.  Any transport
    /// error fails the session.
    pub async fn submit_password(&mut self, password: &str) -> Result<(), ProvisionError> {
        if self.state != SessionState::AwaitingPassword {
            return Err(self.invalid("submit a password"));
        }
        if password.is_empty() {
            return Err(ProvisionError::InvalidInput("password is required".to_string()));
        }
        let ssid = match &self.chosen_network {
            Some(ssid) => ssid.clone(),
            None => return Err(self.invalid("submit a password")),
        };

        self.advance("send credentials", SessionState::SendingCredentials)?;
        let credentials = Credentials::new(ssid, password);
        if let Err(e) = self.transport.send_credentials(&credentials).await {
            return Err(self.fail(e).await);
        }

        self.transport.release().await;
        self.advance("finish", SessionState::Done)?;
        info!(
            "{} provisioning delivered credentials for {:?}",
            self.transport.kind(),
            credentials.ssid
        );
        Ok(())
    }

    /// Releases the transport and resets the session to its initial values.
    ///
    /// Safe to call any number of times, from any state.
    pub async fn cleanup(&mut self) {
        self.transport.release().await;
        if self.state != self.initial_state {
            debug!(
                "{} session reset from {}",
                self.transport.kind(),
                self.state
            );
        }
        self.state = self.initial_state;
        self.networks = NetworkList::new();
        self.chosen_network = None;
    }

    /// Returns the identifier of the unit, when the transport knows it.
    pub fn device_id(&self) -> Option<String> {
        self.transport.device_id()
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    fn advance(&mut self, operation: &'static str, next: SessionState) -> Result<(), ProvisionError> {
        if !self.state.can_advance_to(next) {
            return Err(self.invalid(operation));
        }
        debug!("{} session {} -> {}", self.transport.kind(), self.state, next);
        self.state = next;
        Ok(())
    }

    fn invalid(&self, operation: &'static str) -> ProvisionError {
        ProvisionError::InvalidState {
            operation,
            state: self.state,
        }
    }

    /// Tears the transport down, marks the session failed and hands the error back.
    async fn fail(&mut self, error: ProvisionError) -> ProvisionError {
        self.transport.release().await;
        warn!(
            "{} session failed in {}: {error}",
            self.transport.kind(),
            self.state
        );
        self.state = SessionState::Failed;
        error
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
