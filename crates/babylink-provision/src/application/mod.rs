//! Application layer use cases for provisioning and discovery.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure data and parsing, here `babylink-core`) and the infrastructure
//! (Bluetooth, sockets, files).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil a user goal (e.g., "deliver
//!   these credentials to the unit I picked").
//! - **Depend on abstractions** (traits) rather than concrete implementations,
//!   so a Bluetooth transport can be swapped for a socket transport, or for a
//!   test double, without changing this code.
//! - **Contain no radio calls, no socket I/O, no file system access**.
//!
//! # Sub-modules
//!
//! - **`provision`** – the one provisioning state machine shared by every
//!   transport, driven through the [`provision::ProvisioningTransport`] trait.
//!
//! - **`discover_devices`** – the de-duplicated set of units collected from
//!   broadcast announcements.
//!
//! - **`associate_device`** – hands a device id and a person id to the
//!   external association writer.
//!
//! - **`exclusive`** – the lock keeping radio and socket provisioning from
//!   running at the same time.
//!
//! - **`error`** – the closed set of error categories callers see.

pub mod associate_device;
pub mod discover_devices;
pub mod error;
pub mod exclusive;
pub mod provision;
