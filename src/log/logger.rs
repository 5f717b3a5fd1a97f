use crate::{
    clock,
    config::Config,
    log::{log_level::LogLevel, log_msg::LogMsg, logger_handle::LoggerHandle},
};

use std::{
    fs::{self, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::mpsc,
    thread,
};

/// Flush to disk every 16 lines when debugging, so a crash loses little.
#[cfg(feature = "log-debug")]
const FLUSH_BATCH_SIZE: u32 = 16;

/// Flush to disk every 256 lines otherwise.
#[cfg(not(feature = "log-debug"))]
const FLUSH_BATCH_SIZE: u32 = 256;

/// Bounded, non-blocking logger that writes to a per-process log file.
///
/// Producers (connection threads) enqueue through a [`LoggerHandle`]; one
/// background worker drains the queue, appends to the file, and mirrors
/// Warn/Error lines to stderr when asked to. Dropping the `Logger` does not
/// stop the worker: it exits once every handle is gone.
pub struct Logger {
    handle: LoggerHandle,
    _thread: Option<thread::JoinHandle<()>>,
    file_path: PathBuf,
}

impl Logger {
    /// Starts the server logger using the `[Logging]` section of `config`.
    ///
    /// Keys: `server_log_path` (directory, `~` expanded), `server_log_filename`
    /// (file name prefix), `stderr` (mirror Warn/Error, default true).
    #[must_use]
    pub fn start_server(cap: usize, config: &Config) -> Self {
        let app_name = config.get_non_empty("Logging", "server_log_filename");
        let echo = config.get_bool("Logging", "stderr").unwrap_or(true);

        let dir = config
            .get_non_empty("Logging", "server_log_path")
            .map(expand_path)
            .unwrap_or_else(|| exe_dir_fallback_cwd().join("logs"));

        Self::start_in_dir(dir, app_name.or(Some("quickim-server")), cap, echo)
    }

    /// Starts the logger in a specific directory.
    ///
    /// Creates the directory if missing and names the file
    /// `<app>-YYYYMMDD_HHMMSS-pid<N>.log`. If the file cannot be opened the
    /// worker falls back to a temp-dir file, then to a sink; it never panics.
    pub fn start_in_dir<D: AsRef<Path>>(
        dir: D,
        app_name: Option<&str>,
        cap: usize,
        echo_stderr: bool,
    ) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let _ = fs::create_dir_all(&dir);

        let ts = clock::timestamp_for_filename();
        let pid = std::process::id();
        let fname = match app_name {
            Some(name) => format!("{name}-{ts}-pid{pid}.log"),
            None => format!("{ts}-pid{pid}.log"),
        };
        let file_path = dir.join(fname);

        let (tx, rx) = mpsc::sync_channel::<LogMsg>(cap.max(1));
        let handle = LoggerHandle { tx };

        let path_for_worker = file_path.clone();
        let _thread = thread::Builder::new()
            .name("logger-worker".into())
            .spawn(move || run_worker(&path_for_worker, &rx, echo_stderr))
            .ok();

        Self {
            handle,
            _thread,
            file_path,
        }
    }

    /// Returns a cloneable handle to the logger sink.
    #[must_use]
    pub fn handle(&self) -> LoggerHandle {
        self.handle.clone()
    }

    /// Path of the active log file.
    #[must_use]
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

fn run_worker(path: &Path, rx: &mpsc::Receiver<LogMsg>, echo_stderr: bool) {
    let writer: Box<dyn Write + Send> = match OpenOptions::new().create(true).append(true).open(path)
    {
        Ok(f) => Box::new(f),
        Err(_) => {
            let fallback = std::env::temp_dir().join("quickim-fallback.log");
            match OpenOptions::new().create(true).append(true).open(&fallback) {
                Ok(f) => Box::new(f),
                Err(_) => Box::new(io::sink()),
            }
        }
    };
    let mut out = BufWriter::new(writer);
    let mut lines_written: u32 = 0;

    while let Ok(m) = rx.recv() {
        let line = m.render();
        let _ = writeln!(&mut out, "{line}");
        lines_written = lines_written.wrapping_add(1);

        if echo_stderr && m.level >= LogLevel::Warn {
            eprintln!("{line}");
        }

        // Errors go to disk right away; everything else in batches.
        if m.level == LogLevel::Error || lines_written % FLUSH_BATCH_SIZE == 0 {
            let _ = out.flush();
        }
    }

    let _ = out.flush();
}

/// Directory of the running executable, or the current directory on error.
fn exe_dir_fallback_cwd() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Expands a leading `~` to the user's home directory.
fn expand_path(path_str: &str) -> PathBuf {
    if let Some(rest) = path_str.strip_prefix('~') {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .ok()
            .map(PathBuf::from);

        if let Some(mut home_path) = home {
            if rest.is_empty() {
                return home_path;
            }
            if let Some(tail) = rest.strip_prefix('/').or_else(|| rest.strip_prefix('\\')) {
                home_path.push(tail);
                return home_path;
            }
        }
    }
    PathBuf::from(path_str)
}
