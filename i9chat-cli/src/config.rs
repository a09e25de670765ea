use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::state::{default_store_root, ensure_i9chat_home};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmSection,
    pub chat: ChatSection,
    pub user: UserSection,
    pub store: StoreSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// "gemini" or "openai" (any OpenAI-compatible endpoint)
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSection {
    /// Use the streaming endpoint and concatenate chunks.
    pub stream: bool,
    /// Characters revealed per UI tick for the newest bot reply.
    pub typing_speed: usize,
    /// Re-label new conversations with a one-shot summary of the first message.
    pub summarize_titles: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSection {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Defaults to ~/.i9chat/store
    pub root: Option<PathBuf>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            temperature: 0.4,
        }
    }
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            stream: true,
            typing_speed: 3,
            summarize_titles: true,
        }
    }
}

impl Default for UserSection {
    fn default() -> Self {
        Self {
            id: "demo".to_string(),
            display_name: "Usuário".to_string(),
        }
    }
}

impl Config {
    pub fn store_root(&self) -> Result<PathBuf> {
        match &self.store.root {
            Some(p) => Ok(p.clone()),
            None => default_store_root(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_i9chat_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

pub fn show_config() -> Result<()> {
    let cfg = load_config()?;
    println!("# {}", config_path()?.display());
    print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
[llm]
provider = "openai"
model = "gpt-4o-mini"

[chat]
stream = false
"#,
        )
        .unwrap();
        assert_eq!(cfg.llm.provider, "openai");
        assert_eq!(cfg.llm.temperature, 0.4);
        assert!(!cfg.chat.stream);
        assert!(cfg.chat.summarize_titles);
        assert_eq!(cfg.user.id, "demo");
        assert!(cfg.store.root.is_none());
    }

    #[test]
    fn test_default_config_round_trips() {
        let s = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&s).unwrap();
        assert_eq!(back.llm.model, "gemini-2.0-flash");
        assert_eq!(back.chat.typing_speed, 3);
    }
}
