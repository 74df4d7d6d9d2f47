//! Infrastructure layer: OS-facing adapters.
//!
//! Contains the Bluetooth LE radio adapter, the TCP socket transport, the
//! UDP discovery listener and the configuration file reader.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `babylink_core`, but MUST NOT be imported by the `application` or domain
//! layers.

pub mod network;
pub mod radio;
pub mod socket;
pub mod storage;
