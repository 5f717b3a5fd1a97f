//! QuickIM is a small instant-messaging backend over a custom binary
//! protocol.
//!
//! It provides one binary:
//! - `quickim-server`: accepts TCP clients, authenticates them, tracks who
//!   is online, and routes messages, attention signals and avatars.
//!
//! The library side also carries a blocking client used by tests and tools.

/// Blocking protocol client.
pub mod client;
/// Wall-clock helpers.
pub mod clock;
/// Handles configuration loading and management.
pub mod config;
/// Logging utilities for the server.
pub mod log;
/// Wire codec: frames, messages, stream helpers.
pub mod protocol;
/// Listener, per-connection dispatch and the online registry.
pub mod server;
/// Accounts, contacts and avatars behind the `Store` trait.
pub mod store;
