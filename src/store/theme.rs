use std::env;
use std::str::FromStr;

use crate::config::Theme;
use crate::storage::{KeyValueStore, StorageError};

/// One tier of the theme fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeSource {
    Persisted,
    System,
    Default,
}

/// Tiers in the order they are consulted.
pub const FALLBACK_CHAIN: [ThemeSource; 3] =
    [ThemeSource::Persisted, ThemeSource::System, ThemeSource::Default];

/// Reports the host's preferred colour scheme, when it has one.
pub trait SystemAppearance {
    fn detect(&self) -> Option<Theme>;
}

/// Reads the `COLORFGBG` convention terminals use to advertise their colours.
#[derive(Debug, Clone, Default)]
pub struct ColorFgBg {
    value: Option<String>,
}

impl ColorFgBg {
    pub fn from_env() -> Self {
        Self {
            value: env::var("COLORFGBG").ok(),
        }
    }

    pub fn from_value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
        }
    }
}

impl SystemAppearance for ColorFgBg {
    fn detect(&self) -> Option<Theme> {
        self.value.as_deref().and_then(parse_colorfgbg)
    }
}

/// A fixed answer, used when the config pins the system tier.
#[derive(Debug, Clone, Copy)]
pub struct FixedAppearance(pub Option<Theme>);

impl SystemAppearance for FixedAppearance {
    fn detect(&self) -> Option<Theme> {
        self.0
    }
}

/// Background is the last `;`-separated field; ANSI 0-6 and 8 are dark.
pub fn parse_colorfgbg(value: &str) -> Option<Theme> {
    let background = value.rsplit(';').next()?.trim();
    match background.parse::<u8>().ok()? {
        0..=6 | 8 => Some(Theme::Dark),
        7 | 9..=15 => Some(Theme::Light),
        _ => None,
    }
}

/// Walks `chain` and returns the first tier that yields a theme.
pub fn resolve_theme(
    chain: &[ThemeSource],
    persisted: Option<&str>,
    system: &dyn SystemAppearance,
) -> (Theme, ThemeSource) {
    for source in chain {
        let candidate = match source {
            ThemeSource::Persisted => persisted.and_then(|raw| Theme::from_str(raw.trim()).ok()),
            ThemeSource::System => system.detect(),
            ThemeSource::Default => Some(Theme::default()),
        };
        if let Some(theme) = candidate {
            return (theme, *source);
        }
    }
    (Theme::default(), ThemeSource::Default)
}

pub struct ThemeStore<S> {
    backend: S,
    key: String,
    system: Box<dyn SystemAppearance>,
    current: Theme,
}

impl<S: KeyValueStore> ThemeStore<S> {
    pub fn load(backend: S, key: impl Into<String>, system: Box<dyn SystemAppearance>) -> Self {
        let mut store = Self {
            backend,
            key: key.into(),
            system,
            current: Theme::default(),
        };
        store.current = store.get_preferred();
        store
    }

    pub fn current(&self) -> Theme {
        self.current
    }

    pub fn get_preferred(&self) -> Theme {
        self.resolve().0
    }

    pub fn resolve(&self) -> (Theme, ThemeSource) {
        let persisted = match self.backend.get(&self.key) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "reading theme failed");
                None
            }
        };
        let (theme, source) = resolve_theme(&FALLBACK_CHAIN, persisted.as_deref(), &*self.system);
        tracing::debug!(%theme, ?source, "theme resolved");
        (theme, source)
    }

    /// Flips the theme and persists it immediately.
    pub fn toggle(&mut self) -> Theme {
        if let Err(err) = self.try_toggle() {
            tracing::warn!(key = %self.key, error = %err, "persisting theme failed");
        }
        self.current
    }

    /// Like `toggle`, but hands a failed write back to the caller. The new
    /// theme stays active either way.
    pub fn try_toggle(&mut self) -> Result<Theme, StorageError> {
        self.current = self.current.toggled();
        tracing::info!(theme = %self.current, "theme toggled");
        self.persist()?;
        Ok(self.current)
    }

    fn persist(&self) -> Result<(), StorageError> {
        self.backend.set(&self.key, self.current.as_ref())
    }
}
