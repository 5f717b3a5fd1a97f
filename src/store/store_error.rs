use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Username already exists")]
    UsernameTaken,
    #[error("Invalid username")]
    InvalidUsername,
    #[error("User not found")]
    UnknownUser,
    #[error("Invalid password")]
    InvalidPassword,
    #[error("Cannot add yourself")]
    SelfContact,
    #[error("Contact already exists")]
    ContactExists,
    #[error("Contact not in list")]
    ContactMissing,
    #[error("storage io error: {0}")]
    Io(#[from] io::Error),
    #[error("internal store error: {0}")]
    Internal(&'static str),
}

impl StoreError {
    /// True for failures of the backend itself rather than of the request.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Internal(_))
    }
}
