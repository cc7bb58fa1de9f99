use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    persist::{load_json, save_json},
    undo::DEFAULT_UNDO_LIMIT,
};

/// Editor settings that are not part of any project.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    #[serde(skip_serializing, skip_deserializing)]
    pub modified: bool,
    pub recent_project: Option<PathBuf>,
    pub export_dir: Option<PathBuf>,
    pub undo_limit: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            modified: false,
            recent_project: None,
            export_dir: None,
            undo_limit: DEFAULT_UNDO_LIMIT,
        }
    }
}

pub fn get_config_path() -> Result<PathBuf> {
    let project_dirs = directories::ProjectDirs::from("", "", "SpriteEditor")
        .context("Unable to open global config directory.")?;
    let config_dir = project_dirs.config_dir();
    Ok(config_dir.join("config.json"))
}

impl EditorConfig {
    /// Load the config, falling back to defaults if there is none yet.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config at {}; using defaults", path.display());
            return Ok(EditorConfig::default());
        }
        load_json(path)
    }

    pub fn save(&mut self, path: &Path) -> Result<()> {
        if self.modified {
            save_json(path, self)?;
            self.modified = false;
        }
        Ok(())
    }

    pub fn set_recent_project(&mut self, path: &Path) {
        if self.recent_project.as_deref() != Some(path) {
            self.recent_project = Some(path.to_owned());
            self.modified = true;
        }
    }
}
