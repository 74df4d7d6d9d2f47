//! UDP broadcast discovery listener.
//!
//! Provisioned units periodically broadcast a short text announcement on the
//! discovery port (default 12345):
//!
//! ```text
//! BABYPHONE|EMITTER|AA:BB:CC:DD:EE:FF
//! ```
//!
//! The listener binds a UDP socket on that port and spawns a Tokio task that
//! feeds every datagram into a [`DiscoveredDeviceSet`].  Each newly seen unit
//! is published two ways:
//!
//! - the full, de-duplicated list goes into a `watch` channel, so a UI can
//!   always render the current snapshot ([`DiscoveryListener::subscribe`]);
//! - a [`DiscoveryEvent`] goes onto the `mpsc` channel returned by
//!   [`DiscoveryListener::start_listening`], for callers that react to arrivals.
//!
//! # How UDP discovery works (for beginners)
//!
//! UDP is connectionless: a unit sends one packet to the LAN broadcast
//! address and every host on the LAN that listens on the port receives it.
//! Nothing guarantees delivery, and foreign devices may use the same port
//! for their own traffic, so anything that does not parse is dropped
//! quietly and the listener keeps going.
//!
//! # Lifecycle
//!
//! There is no self-timeout.  The listener runs until
//! [`DiscoveryListener::stop_listening`] is called or the listener is
//! dropped.  Every start resets the device list; stop keeps the last list
//! readable.

use std::net::{IpAddr, SocketAddr};

use babylink_core::protocol::broadcast::DEFAULT_DISCOVERY_PORT;
use babylink_core::DiscoveredDevice;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::application::discover_devices::DiscoveredDeviceSet;
use crate::infrastructure::storage::config::DiscoveryConfig;

/// Largest datagram read in one call; announcements are far shorter.
const MAX_DATAGRAM: usize = 1024;

/// Capacity of the arrival-event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Error type for discovery listener operations.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The UDP socket could not be bound.
    #[error("failed to bind discovery socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Emitted once per newly discovered unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryEvent {
    pub device: DiscoveredDevice,
    /// Full source address (IP and port) of the announcing datagram.
    pub source: SocketAddr,
}

/// Owns the discovery socket task and the published device list.
pub struct DiscoveryListener {
    bind_addr: SocketAddr,
    devices_tx: watch::Sender<Vec<DiscoveredDevice>>,
    task: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl DiscoveryListener {
    pub fn new(bind_addr: SocketAddr) -> Self {
        let (devices_tx, _) = watch::channel(Vec::new());
        Self {
            bind_addr,
            devices_tx,
            task: None,
            local_addr: None,
        }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(SocketAddr::new(config.bind_address, config.port))
    }

    /// Binds the socket and starts collecting announcements.
    ///
    /// A running listener is stopped first.  The device list is reset.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::BindFailed`] if the port is unavailable.
    pub async fn start_listening(
        &mut self,
    ) -> Result<mpsc::Receiver<DiscoveryEvent>, DiscoveryError> {
        self.stop_listening().await;

        let addr = self.bind_addr;
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| DiscoveryError::BindFailed { addr, source })?;
        self.local_addr = socket.local_addr().ok();

        self.devices_tx.send_replace(Vec::new());
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let devices_tx = self.devices_tx.clone();
        self.task = Some(tokio::spawn(listen_loop(socket, devices_tx, events_tx)));

        info!(
            "discovery listener on UDP {}",
            self.local_addr.unwrap_or(addr)
        );
        Ok(events_rx)
    }

    /// Stops the listener task and releases the socket.
    ///
    /// Returns once the task has been torn down, so the port is free to bind
    /// again and the old task can no longer publish into the device list.
    /// Safe to call when already stopped.  The device list stays readable.
    pub async fn stop_listening(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            // An aborted task resolves only after its future (and the socket
            // it owns) has been dropped.
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!("discovery listener task ended abnormally: {e}");
                }
            }
            info!("discovery listener stopped");
        }
        self.local_addr = None;
    }

    pub fn is_listening(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Address actually bound, useful when the configured port was 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Snapshot of the units discovered since the last start.
    pub fn devices(&self) -> Vec<DiscoveredDevice> {
        self.devices_tx.borrow().clone()
    }

    /// Receiver that observes every change to the device list.
    pub fn subscribe(&self) -> watch::Receiver<Vec<DiscoveredDevice>> {
        self.devices_tx.subscribe()
    }
}

impl Default for DiscoveryListener {
    fn default() -> Self {
        Self::new(SocketAddr::new(
            IpAddr::from([0, 0, 0, 0]),
            DEFAULT_DISCOVERY_PORT,
        ))
    }
}

impl Drop for DiscoveryListener {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Receive loop executed on the spawned task.
async fn listen_loop(
    socket: UdpSocket,
    devices_tx: watch::Sender<Vec<DiscoveredDevice>>,
    events_tx: mpsc::Sender<DiscoveryEvent>,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    let mut set = DiscoveredDeviceSet::new();

    loop {
        let (len, source) = match socket.recv_from(&mut buf).await {
            Ok(pair) => pair,
            Err(e) if is_transient_error(&e) => {
                debug!("discovery recv interrupted: {e}");
                continue;
            }
            Err(e) => {
                error!("discovery recv error, listener exiting: {e}");
                break;
            }
        };

        let Some(device) = set.observe(&buf[..len], source) else {
            continue;
        };
        devices_tx.send_replace(set.devices().to_vec());

        match events_tx.try_send(DiscoveryEvent { device, source }) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!("discovery event for {} dropped: consumer is behind", event.device.id);
            }
            // Nobody reads events; the watch snapshot is still maintained.
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

/// Returns `true` for errors after which the socket is still usable.
///
/// Windows reports ICMP port-unreachable replies as `ConnectionReset` on the
/// next UDP receive.
fn is_transient_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock
            | std::io::ErrorKind::TimedOut
            | std::io::ErrorKind::Interrupted
            | std::io::ErrorKind::ConnectionReset
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
