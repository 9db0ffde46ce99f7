use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "ADMIN_PANEL_LOG";

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Log to a file while the TUI owns the terminal.
///
/// Returns the log file path, or `None` if no cache directory is available
/// (logging is then disabled).
pub fn init_file(default_level: &str) -> Option<PathBuf> {
    let dirs = directories::ProjectDirs::from("org", "admin-panel", "admin-panel")?;
    let dir = dirs.cache_dir();
    std::fs::create_dir_all(dir).ok()?;
    let path = dir.join("admin-panel.log");
    let file = OpenOptions::new().create(true).append(true).open(&path).ok()?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(default_level))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
    Some(path)
}

/// Log to stderr for the one-shot subcommands.
pub fn init_stderr(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(default_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
