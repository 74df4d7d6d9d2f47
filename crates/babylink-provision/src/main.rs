//! BabyLink provisioning host entry point.
//!
//! Loads the configuration, initialises logging and runs one of three modes:
//!
//! ```text
//! babylink [discover]     -- listen for unit announcements until Ctrl-C
//! babylink radio-scan     -- scan for unprovisioned units over Bluetooth LE
//! babylink socket-scan    -- ask a unit's access point for its network list
//! ```
//!
//! The interactive provisioning steps (pick a network, type the password)
//! belong to the app's UI, which drives the same provisioners through the
//! library API.

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use babylink_provision::application::exclusive::ProvisioningLock;
use babylink_provision::application::provision::NetworkScan;
use babylink_provision::infrastructure::network::discovery::DiscoveryListener;
use babylink_provision::infrastructure::radio::btle::BtleCentral;
use babylink_provision::infrastructure::radio::provisioner::RadioProvisioner;
use babylink_provision::infrastructure::socket::{SocketProvisioner, SocketTransport};
use babylink_provision::infrastructure::storage::config::{self, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match config::load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("config unavailable, using defaults: {e}");
            AppConfig::default()
        }
    };

    // Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level)),
        )
        .init();

    let mode = std::env::args().nth(1).unwrap_or_else(|| "discover".to_string());
    info!("BabyLink provisioning host starting ({mode})");

    match mode.as_str() {
        "discover" => discover(&config).await,
        "radio-scan" => radio_scan(&config).await,
        "socket-scan" => socket_scan(&config).await,
        other => anyhow::bail!("unknown mode {other:?}; expected discover, radio-scan or socket-scan"),
    }
}

async fn discover(config: &AppConfig) -> anyhow::Result<()> {
    let mut listener = DiscoveryListener::from_config(&config.discovery);
    let mut events = listener
        .start_listening()
        .await
        .context("failed to start discovery listener")?;

    // ── Discovery event pump ──────────────────────────────────────────────────
    let pump = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            info!(
                "discovered {} {} at {}",
                event.device.device_type, event.device.id, event.device.network_address
            );
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to wait for Ctrl-C")?;

    listener.stop_listening().await;
    pump.abort();
    info!("{} device(s) discovered", listener.devices().len());
    Ok(())
}

async fn radio_scan(config: &AppConfig) -> anyhow::Result<()> {
    let central = BtleCentral::first_adapter()
        .await
        .context("no usable Bluetooth adapter")?;
    let mut provisioner =
        RadioProvisioner::new(Arc::new(central), config.radio.clone(), ProvisioningLock::new());

    let result = provisioner.start_scan().await;
    provisioner.cleanup().await;
    match result {
        Ok(found) => {
            for peripheral in found {
                info!("{} ({})", peripheral.advertised_name, peripheral.id);
            }
            Ok(())
        }
        Err(e) => {
            error!("{}", e.category().hint());
            Err(e.into())
        }
    }
}

async fn socket_scan(config: &AppConfig) -> anyhow::Result<()> {
    let transport = SocketTransport::from_config(&config.socket);
    let mut provisioner = SocketProvisioner::new(transport, ProvisioningLock::new());

    let result = provisioner.scan_networks().await;
    provisioner.cleanup().await;
    match result {
        Ok(NetworkScan::Networks(list)) => {
            for network in list.iter() {
                info!("network: {network}");
            }
            Ok(())
        }
        Ok(NetworkScan::NoNetworks) => {
            info!("the unit sees no Wi-Fi network");
            Ok(())
        }
        Err(e) => {
            error!("{}", e.category().hint());
            Err(e.into())
        }
    }
}
