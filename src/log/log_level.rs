/// Defines the severity levels for log messages, least severe first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Per-frame detail.
    Trace,
    /// Fine-grained events useful when debugging a connection.
    Debug,
    /// Logins, logouts, deliveries, server lifecycle.
    Info,
    /// Rejected requests and failed deliveries.
    Warn,
    /// Errors that still allow the server to keep running.
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}
