use crate::models::ColorMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Persisted cosmetic preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(rename = "color-mode", default)]
    pub color_mode: ColorMode,
    #[serde(
        rename = "detailed-mode",
        default = "default_detailed",
        deserialize_with = "de_bool_from_string_or_bool"
    )]
    pub detailed_mode: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            color_mode: ColorMode::default(),
            detailed_mode: default_detailed(),
        }
    }
}

fn default_detailed() -> bool {
    true
}

/// Older stores kept booleans as `"true"`/`"false"` strings.
fn de_bool_from_string_or_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Bool(b) => Ok(b),
        Raw::Text(s) => Ok(s.trim() == "true"),
    }
}

/// Key-value store behind [`Preferences`].
pub trait PreferenceStore {
    /// Stored preferences, or defaults when nothing usable is stored.
    fn load(&self) -> Preferences;
    fn save(&mut self, prefs: &Preferences) -> Result<()>;
}

/// Preferences kept as a small JSON file.
#[derive(Debug, Clone)]
pub struct FilePreferences {
    path: PathBuf,
}

impl FilePreferences {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// `<config dir>/freqmap/preferences.json`, or the working directory when
    /// the platform has no config dir.
    pub fn default_location() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join("freqmap").join("preferences.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for FilePreferences {
    fn load(&self) -> Preferences {
        if !self.path.exists() {
            return Preferences::default();
        }
        let parsed = fs::read_to_string(&self.path)
            .context("read preferences")
            .and_then(|s| serde_json::from_str(&s).context("parse preferences"));
        match parsed {
            Ok(prefs) => prefs,
            Err(err) => {
                log::warn!(
                    "using default preferences, {} is unusable: {err:#}",
                    self.path.display()
                );
                Preferences::default()
            }
        }
    }

    fn save(&mut self, prefs: &Preferences) -> Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)
                .with_context(|| format!("create {}", dir.display()))?;
        }
        let mut f = File::create(&self.path)
            .with_context(|| format!("create {}", self.path.display()))?;
        let s = serde_json::to_string_pretty(prefs)?;
        f.write_all(s.as_bytes())?;
        Ok(())
    }
}

/// Non-persistent store, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    stored: Option<Preferences>,
}

impl MemoryPreferences {
    pub fn with(prefs: Preferences) -> Self {
        Self {
            stored: Some(prefs),
        }
    }
}

impl PreferenceStore for MemoryPreferences {
    fn load(&self) -> Preferences {
        self.stored.unwrap_or_default()
    }

    fn save(&mut self, prefs: &Preferences) -> Result<()> {
        self.stored = Some(*prefs);
        Ok(())
    }
}
