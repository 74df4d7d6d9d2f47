//! Storage infrastructure: configuration file loading.
//!
//! The `config` sub-module reads the optional TOML configuration file from
//! the platform-appropriate directory and supplies defaults for anything the
//! file leaves out.  Nothing is ever written back: provisioning state lives
//! in memory for the length of one session.

pub mod config;
