//! Socket provisioning over the unit's own access point.
//!
//! The user first joins the unit's temporary Wi-Fi network (an out-of-band
//! step this module cannot check).  The unit then answers plain-text commands
//! on TCP port 80 at a fixed address:
//!
//! ```text
//! app  ── "SCAN\n" ──────────────────►  unit
//! app  ◄── "Home\nOffice\nENDLIST" ───  unit     (or "NONE")
//!
//! app  ── "Home|secret\n" ──────────►  unit     (new connection)
//! app  ◄── "OK" ─────────────────────  unit
//! ```
//!
//! Every command opens its own connection, and one timer covers the connect,
//! the write and the wait for a complete reply.  When the timer fires the
//! connection is dropped and the caller sees
//! [`ProvisionError::ResponseTimeout`], kept distinct from
//! [`ProvisionError::ConnectionFailed`] (wrong network) so the two get
//! different remediation text.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use babylink_core::protocol::socket::{
    check_acknowledgement, parse_scan_response, Command, ScanResponse,
};
use babylink_core::{Credentials, NetworkList, ProtocolError, SessionState, TransportKind};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, trace};

use crate::application::error::ProvisionError;
use crate::application::exclusive::{ProvisioningLock, TransportLease};
use crate::application::provision::{NetworkScan, ProvisioningSession, ProvisioningTransport};
use crate::infrastructure::storage::config::SocketConfig;

/// Size of each read from the stream.
const READ_CHUNK: usize = 512;

/// [`ProvisioningTransport`] speaking the unit's line protocol over TCP.
#[derive(Debug, Clone)]
pub struct SocketTransport {
    address: SocketAddr,
    command_timeout: Duration,
}

impl SocketTransport {
    pub fn new(address: SocketAddr, command_timeout: Duration) -> Self {
        Self {
            address,
            command_timeout,
        }
    }

    pub fn from_config(config: &SocketConfig) -> Self {
        Self::new(
            SocketAddr::new(config.device_address, config.port),
            config.command_timeout(),
        )
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Opens a connection, sends `command` and returns the complete reply.
    ///
    /// # Errors
    ///
    /// - [`ProvisionError::ConnectionFailed`] if the connection cannot be
    ///   opened, breaks, or is closed before any reply byte.
    /// - [`ProvisionError::ResponseTimeout`] if the whole exchange exceeds
    ///   the command timeout.
    /// - [`ProvisionError::MalformedPayload`] if the unit closed the
    ///   connection after an incomplete reply.
    pub async fn send_command(&self, command: &Command) -> Result<String, ProvisionError> {
        let address = self.address;
        let limit = self.command_timeout;
        debug!("sending {} command to {address}", command.label());

        let attempt = async {
            let mut stream = TcpStream::connect(address)
                .await
                .map_err(|e| ProvisionError::ConnectionFailed(e.to_string()))?;
            run_exchange(&mut stream, command).await
        };
        match timeout(limit, attempt).await {
            Ok(result) => result,
            Err(_) => Err(ProvisionError::ResponseTimeout { after: limit }),
        }
    }
}

#[async_trait]
impl ProvisioningTransport for SocketTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Socket
    }

    /// Connections are opened per command, so there is nothing to hold here.
    async fn connect(&mut self) -> Result<(), ProvisionError> {
        trace!("socket transport targets {}", self.address);
        Ok(())
    }

    async fn request_network_list(&mut self) -> Result<NetworkScan, ProvisionError> {
        let reply = self.send_command(&Command::Scan).await?;
        Ok(match parse_scan_response(&reply) {
            ScanResponse::Networks(list) => NetworkScan::Networks(list),
            ScanResponse::NoNetworks => NetworkScan::NoNetworks,
        })
    }

    async fn send_credentials(&mut self, credentials: &Credentials) -> Result<(), ProvisionError> {
        let reply = self
            .send_command(&Command::Credentials(credentials.clone()))
            .await?;
        check_acknowledgement(&reply)?;
        Ok(())
    }

    async fn release(&mut self) {
        // Each command's stream is dropped when its exchange ends or times out.
        trace!("socket transport released");
    }
}

/// Writes one command and reads until the reply is complete.
///
/// Applies no timeout; callers wrap it with one.
pub(crate) async fn run_exchange<S>(stream: &mut S, command: &Command) -> Result<String, ProvisionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream
        .write_all(&command.to_wire())
        .await
        .map_err(|e| ProvisionError::ConnectionFailed(e.to_string()))?;
    stream
        .flush()
        .await
        .map_err(|e| ProvisionError::ConnectionFailed(e.to_string()))?;

    let mut received = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let n = stream
            .read(&mut chunk)
            .await
            .map_err(|e| ProvisionError::ConnectionFailed(e.to_string()))?;

        if n == 0 {
            return Err(closed_early(&received));
        }
        received.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&received);
        if command.is_complete(&text) {
            trace!("{} reply complete after {} bytes", command.label(), received.len());
            return Ok(text.into_owned());
        }
    }
}

fn closed_early(received: &[u8]) -> ProvisionError {
    if received.is_empty() {
        ProvisionError::ConnectionFailed("device closed the connection without replying".to_string())
    } else {
        let text = String::from_utf8_lossy(received).trim().to_string();
        ProvisionError::MalformedPayload(ProtocolError::UnexpectedResponse(text))
    }
}

// ── Provisioner facade ────────────────────────────────────────────────────────

/// Socket provisioning flow: instruct, scan remotely, pick a network, send.
///
/// Holds the provisioning lock from the first scan until the flow ends.
pub struct SocketProvisioner {
    session: ProvisioningSession<SocketTransport>,
    lock: ProvisioningLock,
    lease: Option<TransportLease>,
}

impl SocketProvisioner {
    pub fn new(transport: SocketTransport, lock: ProvisioningLock) -> Self {
        Self {
            session: ProvisioningSession::new(transport, SessionState::Instructing),
            lock,
            lease: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn networks(&self) -> &NetworkList {
        self.session.networks()
    }

    pub fn chosen_network(&self) -> Option<&str> {
        self.session.chosen_network()
    }

    /// Asks the unit for the networks it can see.
    ///
    /// `NoNetworks` is an outcome: the state becomes `NetworkList` with an
    /// empty list and [`cleanup`](Self::cleanup) is needed before rescanning.
    ///
    /// # Errors
    ///
    /// [`ProvisionError::Busy`] if the radio flow is running; any transport
    /// error fails the session.
    pub async fn scan_networks(&mut self) -> Result<NetworkScan, ProvisionError> {
        if self.session.state() != SessionState::Instructing {
            return Err(ProvisionError::InvalidState {
                operation: "scan networks",
                state: self.session.state(),
            });
        }
        if self.lease.is_none() {
            self.lease = Some(self.lock.try_acquire(TransportKind::Socket)?);
        }

        let result = async {
            self.session.connect().await?;
            self.session.read_networks().await
        }
        .await;

        match &result {
            Ok(NetworkScan::NoNetworks) => {
                info!("device reported no networks");
                self.lease = None;
            }
            Ok(NetworkScan::Networks(_)) => {}
            Err(_) => self.settle(),
        }
        result
    }

    /// Picks the network the credentials are for.  Surrounding whitespace is ignored.
    pub fn select_network(&mut self, name: &str) -> Result<(), ProvisionError> {
        self.session.select_network(name)
    }

    /// Sends `<ssid>|<password>` and waits for the acknowledgement.
    pub async fn send_credentials(&mut self, password: &str) -> Result<(), ProvisionError> {
        let result = self.session.submit_password(password).await;
        self.settle();
        if result.is_ok() {
            info!("configuration saved; the device will restart");
        }
        result
    }

    /// Releases everything and returns to `Instructing`.  Idempotent.
    pub async fn cleanup(&mut self) {
        self.session.cleanup().await;
        self.lease = None;
    }

    /// Drops the lease once the session can make no further progress.
    fn settle(&mut self) {
        if self.session.state().is_terminal() {
            self.lease = None;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
