//! Per-user theme preference.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::document::DocumentStore;
use crate::error::Result;

pub const COLLECTION: &str = "preferences";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" | "claro" => Ok(Theme::Light),
            "dark" | "escuro" => Ok(Theme::Dark),
            other => Err(format!("unknown theme {other:?} (expected light or dark)")),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Preferences {
    #[serde(default)]
    theme: Theme,
}

pub fn theme(store: &DocumentStore, user_id: &str) -> Result<Theme> {
    Ok(store
        .get::<Preferences>(COLLECTION, user_id)?
        .unwrap_or_default()
        .theme)
}

pub fn set_theme(store: &DocumentStore, user_id: &str, theme: Theme) -> Result<()> {
    store.set(COLLECTION, user_id, &Preferences { theme })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_defaults_to_light_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        assert_eq!(theme(&store, "demo").unwrap(), Theme::Light);
        set_theme(&store, "demo", Theme::Dark).unwrap();
        assert_eq!(theme(&store, "demo").unwrap(), Theme::Dark);
        assert_eq!(theme(&store, "other").unwrap(), Theme::Light);
    }

    #[test]
    fn test_theme_parse() {
        assert_eq!("Escuro".parse::<Theme>(), Ok(Theme::Dark));
        assert_eq!("light".parse::<Theme>(), Ok(Theme::Light));
        assert!("blue".parse::<Theme>().is_err());
    }
}
