//! babylink-provision library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does babylink-provision do? (for beginners)
//!
//! A new BabyLink unit cannot reach the family's Wi-Fi until someone tells it
//! the network name and password.  This crate contains the three flows the
//! app uses around that moment:
//!
//! 1. **Radio provisioning** – find the unit over Bluetooth LE, read the list
//!    of networks it can see, write the chosen credentials.
//! 2. **Socket provisioning** – the phone joins the unit's own access point
//!    and exchanges newline-terminated text commands with it over TCP.
//! 3. **Broadcast discovery** – once provisioned, units announce themselves
//!    over UDP; the app collects them so the user can link a unit to a
//!    family member or child.
//!
//! Linking itself (the association write) belongs to the app's data layer
//! and is reached through the [`application::associate_device::AssociationWriter`]
//! trait.

/// Application layer: transport-agnostic use cases.
pub mod application;

/// Infrastructure layer: radio, socket, UDP and configuration adapters.
pub mod infrastructure;
