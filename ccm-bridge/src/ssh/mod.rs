//! SSH session management for remote deployments.
//!
//! The cryptographic handshake is libssh2's business; this module only
//! decides when a session exists and how a command's output is drained.

mod session;

pub use session::{SessionManager, SessionSettings};
