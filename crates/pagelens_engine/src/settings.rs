use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use lens_logging::{lens_info, lens_warn};
use pagelens_core::{PromptTemplate, Settings, SettingsError};
use tempfile::NamedTempFile;
use thiserror::Error;

pub const SETTINGS_FILENAME: &str = "settings.ron";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid settings: {0}")]
    Invalid(#[from] SettingsError),
    #[error("could not serialize settings: {0}")]
    Serialize(String),
    #[error("settings directory missing or not writable: {0}")]
    Dir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Settings persisted as a RON file.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A store for `settings.ron` inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(SETTINGS_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Never fails: unreadable or malformed files yield defaults.
    pub fn get_settings(&self) -> Settings {
        let content = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Settings::default(),
            Err(err) => {
                lens_warn!("Failed to read settings from {:?}: {}", self.path, err);
                return Settings::default();
            }
        };
        match ron::from_str(&content) {
            Ok(settings) => settings,
            Err(err) => {
                lens_warn!("Failed to parse settings from {:?}: {}", self.path, err);
                Settings::default()
            }
        }
    }

    /// Validates and writes `settings`, returning what was stored.
    pub fn save_settings(&self, settings: Settings) -> Result<Settings, StoreError> {
        let settings = settings.validated()?;
        let content = ron::ser::to_string_pretty(&settings, ron::ser::PrettyConfig::new())
            .map_err(|err| StoreError::Serialize(err.to_string()))?;
        self.write_atomic(&content)?;
        lens_info!("Saved settings to {:?}", self.path);
        Ok(settings)
    }

    /// Stored prompts, or the built-in set when none are stored.
    pub fn custom_prompts(&self) -> Vec<PromptTemplate> {
        self.get_settings().prompts()
    }

    /// Forgets stored prompts so the built-in set applies again.
    pub fn reset_prompts(&self) -> Result<Settings, StoreError> {
        let settings = Settings {
            custom_prompts: Vec::new(),
            ..self.get_settings()
        };
        self.save_settings(settings)
    }

    fn write_atomic(&self, content: &str) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| StoreError::Dir(e.to_string()))?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| StoreError::Dir(e.to_string()))?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}
