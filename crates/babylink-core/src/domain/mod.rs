//! Domain entities shared by the provisioning and discovery flows.
//!
//! Nothing in this module performs I/O.  Every type is either produced by a
//! parser in [`crate::protocol`] or by the application layer while it drives a
//! provisioning session.

pub mod device;
pub mod network;
pub mod session;
