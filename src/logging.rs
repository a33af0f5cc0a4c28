//! File logging for the taxondist binary.

use std::error::Error;
use std::path::PathBuf;

use chrono::Utc;
use env_logger::{Builder, Target};
use log::{debug, error, info};

use crate::distance::DistanceConfig;

/// Log to a timestamped file under `~/.taxondist/logs/`. Returns the file path.
pub fn init_logging() -> Result<PathBuf, Box<dyn Error>> {
    let log_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".taxondist")
        .join("logs");

    std::fs::create_dir_all(&log_dir)?;

    let log_file = log_dir.join(format!("taxondist_{}.log", Utc::now().format("%Y%m%d_%H%M%S")));

    Builder::from_default_env()
        .target(Target::Pipe(Box::new(std::fs::File::create(&log_file)?)))
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "{} [{}] [{}:{}] [{}] {}",
                Utc::now().format("%Y-%m-%d %H:%M:%S%.3f UTC"),
                record.level(),
                record.module_path().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                std::thread::current().name().unwrap_or("main"),
                record.args()
            )
        })
        .try_init()?;

    info!("Logging to {log_file:?}");
    debug!("Log directory: {log_dir:?}");

    Ok(log_file)
}

fn level_filter(raw: &str) -> Option<&'static str> {
    match raw.trim().to_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" => Some("warn"),
        "error" => Some("error"),
        _ => None,
    }
}

/// Translate `TAXONDIST_LOG_LEVEL` into `RUST_LOG`. Call before [`init_logging`].
pub fn set_log_level() {
    let level = std::env::var("TAXONDIST_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let filter = level_filter(&level).unwrap_or_else(|| {
        eprintln!("Invalid log level '{level}', defaulting to 'info'");
        "info"
    });

    std::env::set_var("RUST_LOG", format!("taxondist={filter}"));
}

pub fn log_system_info(config: &DistanceConfig) {
    info!("=== taxondist {} starting ===", env!("CARGO_PKG_VERSION"));
    info!("Platform: {} / {}", std::env::consts::OS, std::env::consts::ARCH);
    info!("Available CPU cores: {}", num_cpus::get());
    info!(
        "Distance settings: metric={}, minimum overlap={}, ambiguity={}, cache limit={:.0}%",
        config.metric,
        config.minimum_overlap,
        config.ambiguous_bases_allowed,
        config.cache.memory_limit * 100.0
    );

    for (key, value) in std::env::vars() {
        if key.starts_with("TAXONDIST_") || key == "RUST_LOG" {
            debug!("  {key}: {value}");
        }
    }
}

pub fn log_shutdown() {
    info!("=== taxondist finished at {} ===", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
}

/// Log an error that ends the run, echoing it to stderr in case logging is not set up.
pub fn log_critical_error(error: &str, context: Option<&str>) {
    let message = match context {
        Some(ctx) => format!("CRITICAL ERROR [{ctx}]: {error}"),
        None => format!("CRITICAL ERROR: {error}"),
    };
    error!("{message}");
    eprintln!("[{}] {message}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
}
