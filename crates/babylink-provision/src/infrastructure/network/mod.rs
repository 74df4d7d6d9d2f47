//! Network infrastructure.
//!
//! # Sub-modules
//!
//! - **`discovery`** – Listens for UDP announcements from provisioned units
//!   on the local network and publishes the de-duplicated device list.
//!   This is how units are found after they joined the home Wi-Fi.

pub mod discovery;
