use crate::log::log_level::LogLevel;

/// A single log event on its way to the logger worker.
#[derive(Debug, Clone)]
pub struct LogMsg {
    pub level: LogLevel,
    /// Milliseconds since the UNIX epoch.
    pub ts_ms: u128,
    pub text: String,
    /// Module path of the call site.
    pub target: &'static str,
}

impl LogMsg {
    pub fn new(
        level: LogLevel,
        text: impl Into<String>,
        target: &'static str,
        ts_ms: u128,
    ) -> Self {
        Self {
            level,
            ts_ms,
            text: text.into(),
            target,
        }
    }

    /// One line as written to the log file (no trailing newline).
    pub fn render(&self) -> String {
        format!(
            "[{}] {} {} | {}",
            self.level.as_str(),
            self.ts_ms,
            self.target,
            self.text
        )
    }
}
