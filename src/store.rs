//! App-group store
//!
//! Single source of truth for the ordered group list. Every other
//! component reads groups through `find`/`all`; mutations go through the
//! controller so that each one is followed by a save and a hotkey
//! refresh.

use std::collections::HashSet;

use thiserror::Error;
use tracing::info;

use crate::group::AppGroup;
use crate::types::{AppIdentity, GroupId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Reorder list is not a permutation of the current id set.
    #[error("reorder list does not match the current group set")]
    InvalidReorder,
    #[error("shortcut '{shortcut}' is already bound to group '{existing}'")]
    DuplicateShortcut { shortcut: String, existing: String },
    #[error("no group with id {0}")]
    UnknownGroup(GroupId),
}

#[derive(Debug, Default)]
pub struct AppGroupStore {
    groups: Vec<AppGroup>,
}

impl AppGroupStore {
    pub fn new(groups: Vec<AppGroup>) -> Self {
        Self { groups }
    }

    pub fn all(&self) -> &[AppGroup] {
        &self.groups
    }

    pub fn find(&self, id: GroupId) -> Option<&AppGroup> {
        self.groups.iter().find(|group| group.id == id)
    }

    pub fn add(&mut self, group: AppGroup) -> Result<(), StoreError> {
        self.check_shortcut_unique(&group)?;
        info!(group = %group.name, id = %group.id, "Adding app group");
        self.groups.push(group);
        Ok(())
    }

    /// Replace the stored group with the same id.
    pub fn update(&mut self, group: AppGroup) -> Result<(), StoreError> {
        self.check_shortcut_unique(&group)?;
        let slot = self
            .groups
            .iter_mut()
            .find(|existing| existing.id == group.id)
            .ok_or(StoreError::UnknownGroup(group.id))?;
        *slot = group;
        Ok(())
    }

    /// Remove every group in `ids`, returning the ids actually removed
    /// so the caller can scrub activation history.
    pub fn delete(&mut self, ids: &HashSet<GroupId>) -> Vec<GroupId> {
        let mut removed = Vec::new();
        self.groups.retain(|group| {
            if ids.contains(&group.id) {
                info!(group = %group.name, id = %group.id, "Deleting app group");
                removed.push(group.id);
                false
            } else {
                true
            }
        });
        removed
    }

    /// Apply a permutation of the current id set.
    pub fn reorder(&mut self, new_order: &[GroupId]) -> Result<(), StoreError> {
        if new_order.len() != self.groups.len() {
            return Err(StoreError::InvalidReorder);
        }
        let current: HashSet<GroupId> = self.groups.iter().map(|g| g.id).collect();
        let requested: HashSet<GroupId> = new_order.iter().copied().collect();
        if requested.len() != new_order.len() || requested != current {
            return Err(StoreError::InvalidReorder);
        }

        self.groups.sort_by_key(|group| {
            new_order
                .iter()
                .position(|id| *id == group.id)
                .unwrap_or(usize::MAX)
        });
        Ok(())
    }

    /// Append an app to a group, deduplicating by identity.
    /// Returns whether the group changed.
    pub fn assign_app(&mut self, id: GroupId, app: AppIdentity) -> Result<bool, StoreError> {
        let group = self
            .groups
            .iter_mut()
            .find(|group| group.id == id)
            .ok_or(StoreError::UnknownGroup(id))?;
        let changed = group.push_app(app);
        Ok(changed)
    }

    /// Scrub an app from every group's member list and target slot.
    pub fn remove_app_everywhere(&mut self, app: &AppIdentity) {
        for group in &mut self.groups {
            group.apps.retain(|member| member != app);
            if group.target_app.as_ref() == Some(app) {
                group.target_app = None;
            }
        }
    }

    /// Transfer apps between two groups. Apps already present in the
    /// target are dropped rather than duplicated; a moved target app
    /// loses its pin in the source group.
    pub fn move_apps(
        &mut self,
        apps: &[AppIdentity],
        from: GroupId,
        to: GroupId,
    ) -> Result<(), StoreError> {
        if self.find(to).is_none() {
            return Err(StoreError::UnknownGroup(to));
        }

        let source = self
            .groups
            .iter_mut()
            .find(|group| group.id == from)
            .ok_or(StoreError::UnknownGroup(from))?;

        if let Some(target_app) = &source.target_app
            && apps.contains(target_app)
        {
            source.target_app = None;
        }
        source.apps.retain(|member| !apps.contains(member));

        let destination = self
            .groups
            .iter_mut()
            .find(|group| group.id == to)
            .expect("destination checked above");
        for app in apps {
            destination.push_app(app.clone());
        }
        Ok(())
    }

    /// Duplicate activation shortcuts are rejected at assignment time
    /// so two groups can never race for the same binding.
    fn check_shortcut_unique(&self, candidate: &AppGroup) -> Result<(), StoreError> {
        let Some(shortcut) = &candidate.activate_shortcut else {
            return Ok(());
        };
        if let Some(existing) = self.groups.iter().find(|group| {
            group.id != candidate.id && group.activate_shortcut.as_ref() == Some(shortcut)
        }) {
            return Err(StoreError::DuplicateShortcut {
                shortcut: shortcut.to_string(),
                existing: existing.name.clone(),
            });
        }
        Ok(())
    }
}
