use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

pub mod themes;

pub use themes::{Palette, Theme};

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "TwoPane";
const APP_NAME: &str = "twopane";

pub const CONFIG_ENV: &str = "TWOPANE_CONFIG";
pub const DATA_ENV: &str = "TWOPANE_DATA";

const DEFAULT_NOTES_KEY: &str = "notes";
const DEFAULT_THEME_KEY: &str = "theme";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn from_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let mut default_cfg = AppConfig::default();
            default_cfg.post_load(&self.paths);
            self.write_default_config(&default_cfg)?;
            tracing::info!(path = %self.paths.config_file.display(), "wrote default config");
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load(&self.paths);
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub log_dir: PathBuf,
    pub state_dir: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var(CONFIG_ENV).ok().map(PathBuf::from);
        let override_data = env::var(DATA_ENV).ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let data_root = override_data.unwrap_or_else(|| project_dirs.data_dir().to_path_buf());
        let database_path = data_root.join("notes.db");

        let state_dir = project_dirs
            .state_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| data_root.join("state"));
        let log_dir = state_dir.join("logs");

        Ok(Self {
            config_dir,
            config_file,
            data_dir: data_root,
            database_path,
            log_dir,
            state_dir,
        })
    }

    /// Lays every path out under a single root; used for tests and portable installs.
    pub fn rooted_at(root: &Path) -> Self {
        let data_dir = root.join("data");
        let state_dir = root.join("state");
        Self {
            config_dir: root.join("config"),
            config_file: root.join("config").join("config.toml"),
            database_path: data_dir.join("notes.db"),
            data_dir,
            log_dir: state_dir.join("logs"),
            state_dir,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            &self.config_dir,
            &self.data_dir,
            &self.log_dir,
            &self.state_dir,
        ] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageOptions,
    pub ui: UiOptions,
}

impl AppConfig {
    fn post_load(&mut self, paths: &ConfigPaths) {
        self.storage.resolve(paths);
        self.ui.normalize();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    #[serde(skip)]
    pub database_path: PathBuf,
    pub wal_autocheckpoint: u32,
    pub notes_key: String,
    pub theme_key: String,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            database_path: PathBuf::new(),
            wal_autocheckpoint: 1000,
            notes_key: DEFAULT_NOTES_KEY.to_string(),
            theme_key: DEFAULT_THEME_KEY.to_string(),
        }
    }
}

impl StorageOptions {
    fn resolve(&mut self, paths: &ConfigPaths) {
        if self.database_path.as_os_str().is_empty() {
            self.database_path = paths.database_path.clone();
        }
        if self.notes_key.trim().is_empty() {
            tracing::warn!("empty notes_key in config, falling back to default");
            self.notes_key = DEFAULT_NOTES_KEY.to_string();
        }
        if self.theme_key.trim().is_empty() {
            tracing::warn!("empty theme_key in config, falling back to default");
            self.theme_key = DEFAULT_THEME_KEY.to_string();
        }
        if self.notes_key == self.theme_key {
            tracing::warn!(
                key = %self.notes_key,
                "notes_key and theme_key collide, falling back to defaults"
            );
            self.notes_key = DEFAULT_NOTES_KEY.to_string();
            self.theme_key = DEFAULT_THEME_KEY.to_string();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiOptions {
    /// Terminal width (columns) at or above which the sidebar opens on resize
    pub sidebar_breakpoint: u16,
    pub sidebar_width: u16,
    pub preview_chars: usize,
    pub title_max_len: usize,
    pub tick_rate_ms: u64,
    /// Pins the "system" tier of theme detection instead of reading COLORFGBG
    pub system_theme: Option<Theme>,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            sidebar_breakpoint: 100,
            sidebar_width: 34,
            preview_chars: 32,
            title_max_len: 100,
            tick_rate_ms: 250,
            system_theme: None,
        }
    }
}

impl UiOptions {
    fn normalize(&mut self) {
        let defaults = Self::default();
        if self.sidebar_width == 0 {
            self.sidebar_width = defaults.sidebar_width;
        }
        if self.title_max_len == 0 {
            self.title_max_len = defaults.title_max_len;
        }
        if self.tick_rate_ms == 0 {
            self.tick_rate_ms = defaults.tick_rate_ms;
        }
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_or_init_writes_defaults_on_first_run() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let loader = ConfigLoader::from_paths(ConfigPaths::rooted_at(temp.path()));

        let cfg = loader.load_or_init()?;
        assert!(loader.paths().config_file.exists());
        assert_eq!(cfg.storage.notes_key, "notes");
        assert_eq!(cfg.storage.theme_key, "theme");
        assert_eq!(cfg.storage.database_path, loader.paths().database_path);
        assert_eq!(cfg.ui.preview_chars, 32);

        let reloaded = loader.load()?;
        assert_eq!(reloaded.ui.sidebar_breakpoint, cfg.ui.sidebar_breakpoint);
        Ok(())
    }

    #[test]
    fn colliding_keys_fall_back_to_defaults() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let loader = ConfigLoader::from_paths(ConfigPaths::rooted_at(temp.path()));
        loader.paths().ensure_directories()?;
        fs::write(
            &loader.paths().config_file,
            "[storage]\nnotes_key = \"shared\"\ntheme_key = \"shared\"\n",
        )?;

        let cfg = loader.load()?;
        assert_eq!(cfg.storage.notes_key, "notes");
        assert_eq!(cfg.storage.theme_key, "theme");
        Ok(())
    }

    #[test]
    fn partial_ui_section_keeps_other_defaults() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let loader = ConfigLoader::from_paths(ConfigPaths::rooted_at(temp.path()));
        loader.paths().ensure_directories()?;
        fs::write(
            &loader.paths().config_file,
            "[ui]\nsystem_theme = \"dark\"\nsidebar_width = 0\n",
        )?;

        let cfg = loader.load()?;
        assert_eq!(cfg.ui.system_theme, Some(Theme::Dark));
        assert_eq!(cfg.ui.sidebar_width, 34);
        assert_eq!(cfg.ui.title_max_len, 100);
        Ok(())
    }
}
