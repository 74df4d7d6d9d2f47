//! # babylink-core
//!
//! Shared library for BabyLink containing the domain entities and the wire
//! formats spoken by the baby-monitor units during provisioning and discovery.
//!
//! This crate has zero dependencies on OS APIs, radio stacks, or network
//! sockets.  Everything here is pure data and pure parsing, so it can be
//! tested and benchmarked on any host.
//!
//! # Architecture overview (for beginners)
//!
//! A BabyLink unit (an emitter next to the cot, or a receiver next to the
//! parents) boots without knowing the family's Wi-Fi.  The app has to hand it
//! the network name and password, then find it again once it has joined the
//! network.  Three transports are involved:
//!
//! - **Radio** (Bluetooth LE): the unit exposes a GATT service with one
//!   characteristic listing the networks it can see and one accepting
//!   credentials.
//! - **Socket** (TCP): the unit runs its own access point and accepts
//!   newline-terminated text commands on port 80.
//! - **Broadcast** (UDP): once on the network, the unit periodically announces
//!   itself with a small `BABYPHONE|<TYPE>|<ID>` datagram.
//!
//! This crate defines:
//!
//! - **`domain`** – the entities shared by every transport: discovered
//!   peripherals, Wi-Fi networks, discovered devices, credentials, and the
//!   provisioning session state.
//!
//! - **`protocol`** – the three wire formats, one sub-module per transport,
//!   plus the network-list framing they have in common.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `babylink_core::NetworkList` instead of `babylink_core::domain::network::NetworkList`.
pub use domain::device::{AssociationRequest, DeviceType, DiscoveredDevice, DiscoveredPeripheral};
pub use domain::network::{Credentials, NetworkList, WifiNetwork};
pub use domain::session::{SessionState, TransportKind};
pub use protocol::ProtocolError;
