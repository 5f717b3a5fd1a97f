//! Persistent store: accounts, contact edges, avatar blobs.
//!
//! The server only talks to the [`Store`] trait; `MemoryStore` backs tests
//! and ephemeral runs, `FileStore` keeps everything under one directory.

mod backend;
mod directory;
mod file_store;
mod memory_store;
mod password;
mod store_error;

pub use backend::{Store, UserId};
pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use password::{Credential, PasswordHasher};
pub use store_error::StoreError;
