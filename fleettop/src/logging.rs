//! File-backed tracing. The terminal belongs to the UI, so nothing is logged
//! to stdout or stderr while it runs.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "fleettop=info";

/// `$FLEETTOP_LOG`, else `<data dir>/fleettop/fleettop.log`.
pub fn log_path() -> PathBuf {
    if let Some(p) = std::env::var_os("FLEETTOP_LOG") {
        return PathBuf::from(p);
    }
    dirs_next::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fleettop")
        .join("fleettop.log")
}

/// Installs the global subscriber. Filter comes from `RUST_LOG`.
pub fn init() -> anyhow::Result<PathBuf> {
    let path = log_path();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))?;
    Ok(path)
}
