use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;

use quickim::config::Config;
use quickim::log::{LogSink, Logger};
use quickim::server::{ServerSettings, run_server};

/// QuickIM instant-messaging server.
#[derive(Debug, Parser)]
#[command(name = "quickim-server", version, about)]
struct Args {
    /// INI config file (`[Server]` and `[Logging]` sections).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:9999.
    #[arg(short, long)]
    bind: Option<String>,

    /// Directory for accounts, contacts and avatars.
    #[arg(long, conflicts_with = "ephemeral")]
    store_dir: Option<PathBuf>,

    /// Keep all data in memory; nothing survives a restart.
    #[arg(long)]
    ephemeral: bool,
}

fn main() {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("[quickim-server] {e}");
                process::exit(2);
            }
        },
        None => Config::empty(),
    };

    let mut settings = match ServerSettings::from_config(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[quickim-server] {e}");
            process::exit(2);
        }
    };
    if let Some(bind) = args.bind {
        settings.bind_addr = bind;
    }
    if let Some(dir) = args.store_dir {
        settings.store_dir = Some(dir);
    }
    if args.ephemeral {
        settings.store_dir = None;
    }

    // --- Start process logger ----------------------------------------------
    let logger = Logger::start_server(1024, &config);
    let log_sink: Arc<dyn LogSink> = Arc::new(logger.handle());

    eprintln!(
        "[quickim-server] starting on {} (log file {})",
        settings.bind_addr,
        logger.file_path().display()
    );

    // --- Serve (blocks) ----------------------------------------------------
    if let Err(e) = run_server(&settings, log_sink) {
        eprintln!("[quickim-server] {e}");
        process::exit(1);
    }
}
