use std::io;

use thiserror::Error;

use crate::protocol::{ActionCode, FrameError};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("protocol error: {0}")]
    Frame(FrameError),
    #[error("server closed the connection")]
    Closed,
    #[error("timed out waiting for the server")]
    Timeout,
    #[error("{action:?} refused: {reason}")]
    Rejected { action: ActionCode, reason: String },
}

impl From<FrameError> for ClientError {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::Closed => Self::Closed,
            FrameError::Io(io)
                if matches!(io.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) =>
            {
                Self::Timeout
            }
            FrameError::Io(io) if io.kind() == io::ErrorKind::UnexpectedEof => Self::Closed,
            other => Self::Frame(other),
        }
    }
}
