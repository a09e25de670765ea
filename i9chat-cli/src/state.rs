use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$I9CHAT_HOME`, or `~/.i9chat`.
pub fn i9chat_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("I9CHAT_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".i9chat"))
}

pub fn ensure_i9chat_home() -> Result<PathBuf> {
    let dir = i9chat_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn default_store_root() -> Result<PathBuf> {
    Ok(ensure_i9chat_home()?.join("store"))
}

pub fn logs_dir() -> Result<PathBuf> {
    let dir = ensure_i9chat_home()?.join("logs");
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}
