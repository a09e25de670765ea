use anyhow::{Context, Result};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::state::logs_dir;

/// Route `tracing` output to `~/.i9chat/logs/i9chat.log` (the TUI owns the
/// terminal) or to stderr. Filter comes from `I9CHAT_LOG`, default `info`.
pub fn init(to_stderr: bool) -> Result<()> {
    let filter = EnvFilter::try_from_env("I9CHAT_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    if to_stderr {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(());
    }

    let path = logs_dir()?.join("i9chat.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}
