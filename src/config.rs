//! Config persistence
//!
//! JSON document under the user config dir holding the flat settings
//! plus the minimal form of every app group. Group UUIDs are not
//! persisted; groups are rehydrated at load through the workspace
//! resolver and get fresh ids. Older documents missing newer keys are
//! default-filled; a missing or corrupt file loads the default config
//! (first run and a broken file are the same path, never fatal).

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::constants;
use crate::group::AppGroup;
use crate::hotkey::HotKey;
use crate::types::BundleId;
use crate::workspace::{self, Workspace};

/// Global shortcut settings. All optional; an unset field simply
/// registers no listener for that action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub recent_group: Option<HotKey>,
    pub cycle_groups_next: Option<HotKey>,
    pub cycle_groups_previous: Option<HotKey>,
    /// Wrap around when cycling past the first/last group
    pub loop_groups: bool,
    pub next_app_in_group: Option<HotKey>,
    pub previous_app_in_group: Option<HotKey>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            recent_group: None,
            cycle_groups_next: None,
            cycle_groups_previous: None,
            loop_groups: true,
            next_app_in_group: None,
            previous_app_in_group: None,
        }
    }
}

/// On-disk form of a group: apps are stored as bare bundle ids and
/// re-resolved against the installed set at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedGroup {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<HotKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assign_shortcut: Option<HotKey>,
    #[serde(default)]
    pub apps: Vec<BundleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<BundleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_apps_on_activation: Option<bool>,
}

impl PersistedGroup {
    pub fn from_group(group: &AppGroup) -> Self {
        Self {
            name: group.name.clone(),
            shortcut: group.activate_shortcut.clone(),
            assign_shortcut: group.assign_app_shortcut.clone(),
            apps: group.apps.iter().map(|app| app.bundle_id.clone()).collect(),
            target: group.target_app.as_ref().map(|app| app.bundle_id.clone()),
            open_apps_on_activation: group.open_apps_on_activation,
        }
    }

    /// Rehydrate with a fresh id, substituting the broken marker for
    /// apps that no longer resolve.
    pub fn to_group(&self, workspace_impl: &dyn Workspace) -> AppGroup {
        let mut group = AppGroup::new(self.name.clone());
        group.activate_shortcut = self.shortcut.clone();
        group.assign_app_shortcut = self.assign_shortcut.clone();
        for bundle_id in &self.apps {
            group.push_app(workspace::rehydrate(workspace_impl, bundle_id));
        }
        group.target_app = self
            .target
            .as_ref()
            .map(|bundle_id| workspace::rehydrate(workspace_impl, bundle_id));
        group.open_apps_on_activation = self.open_apps_on_activation;
        group
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigDocument {
    pub settings: Settings,
    #[serde(rename = "appGroups")]
    pub app_groups: Vec<PersistedGroup>,
}

impl ConfigDocument {
    pub fn from_state(settings: &Settings, groups: &[AppGroup]) -> Self {
        Self {
            settings: settings.clone(),
            app_groups: groups.iter().map(PersistedGroup::from_group).collect(),
        }
    }
}

pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(constants::config::APP_DIR);
        path.push(constants::config::FILENAME);
        path
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn load(&self) -> ConfigDocument {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                info!(path = %self.path.display(), error = %e, "No config file, starting with defaults");
                return ConfigDocument::default();
            }
        };

        match serde_json::from_str::<ConfigDocument>(&contents) {
            Ok(document) => {
                info!(path = %self.path.display(), groups = document.app_groups.len(), "Loaded config");
                document
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Config file is corrupt, starting with defaults");
                ConfigDocument::default()
            }
        }
    }

    pub fn save(&self, document: &ConfigDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create config directory {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(document)
            .context("Failed to serialize config")?;
        fs::write(&self.path, contents)
            .context(format!("Failed to write config to {}", self.path.display()))?;
        info!(path = %self.path.display(), groups = document.app_groups.len(), "Saved config");
        Ok(())
    }
}
