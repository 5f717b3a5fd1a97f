//! Blocking client for the QuickIM protocol.

mod client_error;
mod im_client;

pub use client_error::ClientError;
pub use im_client::{ImClient, REPLY_TIMEOUT};
