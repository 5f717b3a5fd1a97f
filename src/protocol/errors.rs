use std::io;

use thiserror::Error;

/// Protocol-level errors (header validation, body parsing).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtoError {
    #[error("frame header truncated: need {need} bytes, got {got}")]
    HeaderTruncated { need: usize, got: usize },
    #[error("bad magic {0:02x?}")]
    BadMagic([u8; 2]),
    #[error("unsupported protocol version {0:#04x}")]
    UnsupportedVersion(u8),
    #[error("unknown command {0:#06x}")]
    UnknownCommand(u16),
    #[error("payload of {len} bytes exceeds maximum of {max}")]
    TooLarge { len: usize, max: usize },
    #[error("payload truncated")]
    Truncated,
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,
    #[error("invalid value {value:#04x} for {field}")]
    InvalidValue { field: &'static str, value: u8 },
    #[error("invalid format: {0}")]
    InvalidFormat(&'static str),
    #[error("string of {actual} bytes exceeds maximum of {max}")]
    StringTooLong { max: usize, actual: usize },
    #[error("list of {actual} entries exceeds maximum of {max}")]
    ListTooLong { max: usize, actual: usize },
}

/// Frame-level error wrapper: IO vs protocol.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The peer closed the stream on a frame boundary.
    #[error("connection closed by peer")]
    Closed,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("protocol error: {0}")]
    Proto(#[from] ProtoError),
}
