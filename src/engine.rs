//! Group activation engine
//!
//! Decides which member app to bring to the foreground when a group is
//! activated, and keeps the one-slot group history that backs the
//! alt-tab-like "recent group" action. The engine never mutates the
//! store; history is ephemeral and lives only here.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::group::AppGroup;
use crate::store::AppGroupStore;
use crate::types::{AppIdentity, BundleId, GroupId};
use crate::workspace::Workspace;

#[derive(Debug, Default)]
pub struct ActivationEngine {
    last_activated: Option<GroupId>,
    previous_activated: Option<GroupId>,
    /// bundle id -> last OS activation timestamp (ms). Only written by
    /// `record_app_became_active`; key count is bounded by the number of
    /// distinct apps ever seen, so it is never pruned.
    recent_activations: HashMap<BundleId, u64>,
}

impl ActivationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_activated(&self) -> Option<GroupId> {
        self.last_activated
    }

    pub fn previous_activated(&self) -> Option<GroupId> {
        self.previous_activated
    }

    /// Fed by the OS app-activation watcher on every focus change.
    pub fn record_app_became_active(&mut self, bundle_id: impl Into<BundleId>, timestamp_ms: u64) {
        self.recent_activations.insert(bundle_id.into(), timestamp_ms);
    }

    /// Drop any history reference to a deleted group.
    pub fn forget_group(&mut self, id: GroupId) {
        if self.last_activated == Some(id) {
            self.last_activated = None;
        }
        if self.previous_activated == Some(id) {
            self.previous_activated = None;
        }
    }

    /// Activate a group: update the one-slot history, then bring the
    /// resolved member app to the foreground.
    pub fn activate(&mut self, group: &AppGroup, workspace: &dyn Workspace) {
        info!(group = %group.name, id = %group.id, "Activating app group");

        if let Some(last) = self.last_activated
            && last != group.id
        {
            self.previous_activated = Some(last);
        }
        self.last_activated = Some(group.id);

        if group.open_apps_on_activation.unwrap_or(false) {
            self.open_missing_apps(group, workspace);
        }

        if let Some(target) = &group.target_app {
            // Pinned app always wins, launched even when not running
            info!(app = %target.name, bundle = %target.bundle_id, "Launching target app");
            workspace.launch(target);
            return;
        }

        match self.most_recent_running_app(group, workspace) {
            Some(app) => {
                info!(app = %app.name, bundle = %app.bundle_id, "Activating most recent running app");
                if !workspace.activate_running_app(&app.bundle_id) {
                    debug!(bundle = %app.bundle_id, "App vanished before activation");
                }
            }
            None => {
                debug!(group = %group.name, "No running app in group, nothing to activate");
            }
        }
    }

    /// Activate the neighbour of the last-activated group in store order.
    /// Anchors on the first group when nothing was activated yet; empty
    /// store is a no-op.
    pub fn activate_adjacent(
        &mut self,
        store: &AppGroupStore,
        workspace: &dyn Workspace,
        next: bool,
        wrap: bool,
    ) {
        let groups = store.all();
        let anchor = self
            .last_activated
            .and_then(|id| store.find(id))
            .or_else(|| groups.first());
        let Some(anchor) = anchor else {
            return;
        };

        let ordered: Vec<&AppGroup> = if next {
            groups.iter().collect()
        } else {
            groups.iter().rev().collect()
        };

        let candidate = ordered
            .iter()
            .skip_while(|group| group.id != anchor.id)
            .nth(1)
            .copied()
            .or_else(|| if wrap { ordered.first().copied() } else { None });

        let Some(candidate) = candidate else {
            debug!(anchor = %anchor.name, next = next, "No adjacent group in this direction");
            return;
        };
        // Single-group store: wrapping lands back on the anchor
        if candidate.id == anchor.id {
            return;
        }

        self.activate(candidate, workspace);
    }

    /// Alt-tab behavior: re-activate the previously activated group.
    /// Re-resolves by id, so edits since it was remembered are honored;
    /// no-op when there is no history or the group was deleted.
    pub fn activate_recent(&mut self, store: &AppGroupStore, workspace: &dyn Workspace) {
        let Some(previous) = self.previous_activated else {
            return;
        };
        let Some(group) = store.find(previous) else {
            debug!(id = %previous, "Previous group no longer exists");
            return;
        };
        self.activate(group, workspace);
    }

    /// Most recently OS-activated running member, ties broken by `apps`
    /// order. Members without a bundle id can never be running and are
    /// skipped.
    fn most_recent_running_app<'g>(
        &self,
        group: &'g AppGroup,
        workspace: &dyn Workspace,
    ) -> Option<&'g AppIdentity> {
        let running = workspace.list_running_apps();
        let mut best: Option<(&AppIdentity, u64)> = None;
        for app in &group.apps {
            if app.bundle_id.is_empty() || !running.contains(&app.bundle_id) {
                continue;
            }
            let timestamp = self
                .recent_activations
                .get(&app.bundle_id)
                .copied()
                .unwrap_or(0);
            match best {
                Some((_, best_ts)) if timestamp <= best_ts => {}
                _ => best = Some((app, timestamp)),
            }
        }
        best.map(|(app, _)| app)
    }

    fn open_missing_apps(&self, group: &AppGroup, workspace: &dyn Workspace) {
        let running = workspace.list_running_apps();
        for app in &group.apps {
            if !app.bundle_id.is_empty() && !running.contains(&app.bundle_id) {
                info!(app = %app.name, bundle = %app.bundle_id, "Opening group member");
                workspace.launch(app);
            }
        }
    }
}
