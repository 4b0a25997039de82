//! Central wiring
//!
//! Owns the store, engine, cycler, coordinator and config store, all
//! constructed once at startup and passed in explicitly. Every mutating
//! path runs through here so the save-then-refresh sequence has exactly
//! one audit point: mutate, persist the document, rebuild the hotkey
//! bindings. Deleting groups additionally scrubs the engine history.

use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::config::{ConfigDocument, ConfigStore, Settings};
use crate::coordinator::{HotKeyAction, HotKeyCoordinator, ListenSet};
use crate::cycler::FocusCycler;
use crate::engine::ActivationEngine;
use crate::group::AppGroup;
use crate::hotkey::HotKey;
use crate::listener::Event;
use crate::store::{AppGroupStore, StoreError};
use crate::types::{AppIdentity, GroupId};
use crate::workspace::Workspace;

#[derive(Debug, Error)]
pub enum AssignError {
    #[error("no application is frontmost")]
    NoFrontmostApp,
    /// Background-only apps have no identity we can manage
    #[error("the frontmost application cannot be managed")]
    Unmanageable,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Controller<W: Workspace> {
    store: AppGroupStore,
    engine: ActivationEngine,
    cycler: FocusCycler,
    coordinator: HotKeyCoordinator,
    config: ConfigStore,
    settings: Settings,
    workspace: W,
}

impl<W: Workspace> Controller<W> {
    /// Load the persisted document, rehydrate the groups against the
    /// installed app set and register the initial hotkey bindings.
    pub fn new(config: ConfigStore, workspace: W) -> Self {
        let document = config.load();
        let groups: Vec<AppGroup> = document
            .app_groups
            .iter()
            .map(|persisted| persisted.to_group(&workspace))
            .collect();
        let store = AppGroupStore::new(groups);
        let settings = document.settings;

        let mut coordinator = HotKeyCoordinator::new();
        coordinator.enable_all(&store, &settings);

        Self {
            store,
            engine: ActivationEngine::new(),
            cycler: FocusCycler::new(),
            coordinator,
            config,
            settings,
            workspace,
        }
    }

    pub fn store(&self) -> &AppGroupStore {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn coordinator(&self) -> &HotKeyCoordinator {
        &self.coordinator
    }

    pub fn workspace(&self) -> &W {
        &self.workspace
    }

    pub fn listen_set(&self) -> ListenSet {
        self.coordinator.listen_set()
    }

    pub fn document(&self) -> ConfigDocument {
        ConfigDocument::from_state(&self.settings, self.store.all())
    }

    /// One save per logical user action, then rebuild the bindings.
    /// A failed save is logged and the refresh still happens; the
    /// in-memory state is already mutated and stays authoritative.
    fn persist_and_refresh(&mut self) {
        if let Err(e) = self.config.save(&self.document()) {
            error!(error = %e, "Failed to persist config");
        }
        self.coordinator.refresh(&self.store, &self.settings);
    }

    // --- mutations -------------------------------------------------------

    pub fn add_group(&mut self, group: AppGroup) -> Result<GroupId, StoreError> {
        let id = group.id;
        self.store.add(group)?;
        self.persist_and_refresh();
        Ok(id)
    }

    pub fn update_group(&mut self, group: AppGroup) -> Result<(), StoreError> {
        self.store.update(group)?;
        self.persist_and_refresh();
        Ok(())
    }

    pub fn delete_groups(&mut self, ids: &HashSet<GroupId>) {
        let removed = self.store.delete(ids);
        if removed.is_empty() {
            return;
        }
        for id in removed {
            self.engine.forget_group(id);
        }
        self.persist_and_refresh();
    }

    pub fn reorder_groups(&mut self, new_order: &[GroupId]) -> Result<(), StoreError> {
        self.store.reorder(new_order)?;
        self.persist_and_refresh();
        Ok(())
    }

    pub fn remove_app_everywhere(&mut self, app: &AppIdentity) {
        self.store.remove_app_everywhere(app);
        self.persist_and_refresh();
    }

    pub fn move_apps(
        &mut self,
        apps: &[AppIdentity],
        from: GroupId,
        to: GroupId,
    ) -> Result<(), StoreError> {
        self.store.move_apps(apps, from, to)?;
        self.persist_and_refresh();
        Ok(())
    }

    pub fn update_settings(&mut self, settings: Settings) {
        self.settings = settings;
        self.persist_and_refresh();
    }

    /// Append the frontmost app to a group (the per-group assign
    /// shortcut). Apps without a usable identity are rejected.
    pub fn assign_frontmost_app(&mut self, group_id: GroupId) -> Result<(), AssignError> {
        let frontmost = self
            .workspace
            .frontmost_app()
            .ok_or(AssignError::NoFrontmostApp)?;
        if frontmost.bundle_id.is_empty() {
            return Err(AssignError::Unmanageable);
        }
        // Prefer the resolved identity (name + icon) over the raw one
        let app = self
            .workspace
            .resolve(&frontmost.bundle_id)
            .unwrap_or(frontmost);
        if self.store.assign_app(group_id, app)? {
            self.persist_and_refresh();
        }
        Ok(())
    }

    // --- event handling --------------------------------------------------

    /// Returns false when the loop should exit.
    pub fn handle_event(&mut self, event: Event) -> bool {
        match event {
            Event::HotKey(hotkey) => {
                self.dispatch(&hotkey);
                true
            }
            Event::AppActivated { bundle_id, timestamp_ms } => {
                self.engine.record_app_became_active(bundle_id, timestamp_ms);
                true
            }
            Event::KeyboardLayoutChanged => {
                // Key-code-to-character mapping may have changed;
                // re-register everything against the new layout
                self.coordinator.refresh(&self.store, &self.settings);
                true
            }
            Event::Shutdown => false,
        }
    }

    pub fn dispatch(&mut self, hotkey: &HotKey) {
        let Some(action) = self.coordinator.action_for(hotkey) else {
            debug!(hotkey = %hotkey, "No binding for hotkey");
            return;
        };
        debug!(hotkey = %hotkey, ?action, "Dispatching hotkey");

        match action {
            HotKeyAction::ActivateGroup(id) => {
                // Re-resolve: the group may have been edited or deleted
                // since the binding was registered
                if let Some(group) = self.store.find(id) {
                    self.engine.activate(group, &self.workspace);
                } else {
                    debug!(id = %id, "Bound group no longer exists");
                }
            }
            HotKeyAction::AssignFrontmost(id) => {
                if let Err(e) = self.assign_frontmost_app(id) {
                    warn!(error = %e, "Could not assign frontmost app");
                }
            }
            HotKeyAction::RecentGroup => {
                self.engine.activate_recent(&self.store, &self.workspace);
            }
            HotKeyAction::CycleGroupsNext => {
                self.engine
                    .activate_adjacent(&self.store, &self.workspace, true, self.settings.loop_groups);
            }
            HotKeyAction::CycleGroupsPrevious => {
                self.engine
                    .activate_adjacent(&self.store, &self.workspace, false, self.settings.loop_groups);
            }
            HotKeyAction::NextAppInGroup => {
                self.cycler.cycle_next(&self.store, &self.workspace);
            }
            HotKeyAction::PreviousAppInGroup => {
                self.cycler.cycle_previous(&self.store, &self.workspace);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PersistedGroup;
    use crate::workspace::fake::FakeWorkspace;
    use std::path::PathBuf;

    fn temp_config(name: &str) -> ConfigStore {
        let dir = std::env::temp_dir().join("appdeck-controller-tests");
        let _ = std::fs::create_dir_all(&dir);
        let path: PathBuf = dir.join(format!("{name}-{}.json", uuid::Uuid::new_v4()));
        ConfigStore::new(path)
    }

    fn controller_with(
        name: &str,
        workspace: FakeWorkspace,
    ) -> Controller<FakeWorkspace> {
        Controller::new(temp_config(name), workspace)
    }

    #[test]
    fn test_startup_from_empty_config() {
        let controller = controller_with("empty", FakeWorkspace::default());
        assert!(controller.store().all().is_empty());
        assert_eq!(controller.coordinator().binding_count(), 0);
    }

    #[test]
    fn test_mutation_persists_and_refreshes() {
        let config = temp_config("mutate");
        let path = config.path().clone();
        let mut controller = Controller::new(config, FakeWorkspace::default());

        let mut group = AppGroup::new("dev");
        group.activate_shortcut = Some(HotKey::new("super+1"));
        controller.add_group(group).unwrap();

        assert_eq!(controller.coordinator().binding_count(), 1);
        let reloaded = ConfigStore::new(path).load();
        assert_eq!(reloaded.app_groups.len(), 1);
        assert_eq!(reloaded.app_groups[0].name, "dev");
    }

    #[test]
    fn test_delete_scrubs_bindings_and_history() {
        let workspace = FakeWorkspace::default();
        let mut controller = controller_with("delete", workspace);

        let mut a = AppGroup::new("a");
        a.activate_shortcut = Some(HotKey::new("super+1"));
        let mut b = AppGroup::new("b");
        b.activate_shortcut = Some(HotKey::new("super+2"));
        let id_a = controller.add_group(a).unwrap();
        let id_b = controller.add_group(b).unwrap();

        // a then b: previous history slot now holds a
        controller.dispatch(&HotKey::new("super+1"));
        controller.dispatch(&HotKey::new("super+2"));

        controller.delete_groups(&HashSet::from([id_a]));
        assert_eq!(controller.coordinator().binding_count(), 1);

        // recent is a no-op now that a is gone
        controller.update_settings(Settings {
            recent_group: Some(HotKey::new("super+tab")),
            ..Settings::default()
        });
        controller.dispatch(&HotKey::new("super+tab"));
        assert!(controller.store().find(id_b).is_some());
    }

    #[test]
    fn test_dispatch_after_delete_is_noop() {
        let mut controller = controller_with("stale", FakeWorkspace::default());
        let mut group = AppGroup::new("dev");
        group.activate_shortcut = Some(HotKey::new("super+1"));
        let id = controller.add_group(group).unwrap();

        controller.delete_groups(&HashSet::from([id]));
        // Binding is gone after refresh; dispatch degrades to a no-op
        controller.dispatch(&HotKey::new("super+1"));
        assert_eq!(controller.coordinator().binding_count(), 0);
    }

    #[test]
    fn test_assign_frontmost_app() {
        let workspace = FakeWorkspace::default();
        workspace.set_frontmost(AppIdentity::new("firefox", "firefox"));
        workspace.install(AppIdentity::new("Firefox", "firefox"));
        let mut controller = controller_with("assign", workspace);

        let id = controller.add_group(AppGroup::new("web")).unwrap();
        controller.assign_frontmost_app(id).unwrap();

        let group = controller.store().find(id).unwrap();
        assert_eq!(group.apps.len(), 1);
        // Resolved identity wins over the raw frontmost one
        assert_eq!(group.apps[0].name, "Firefox");

        // Assigning again is a quiet no-op
        controller.assign_frontmost_app(id).unwrap();
        assert_eq!(controller.store().find(id).unwrap().apps.len(), 1);
    }

    #[test]
    fn test_assign_rejects_unmanageable_frontmost() {
        let workspace = FakeWorkspace::default();
        workspace.set_frontmost(AppIdentity::new("", ""));
        let mut controller = controller_with("agent", workspace);
        let id = controller.add_group(AppGroup::new("g")).unwrap();

        let err = controller.assign_frontmost_app(id).unwrap_err();
        assert!(matches!(err, AssignError::Unmanageable));
        assert!(controller.store().find(id).unwrap().apps.is_empty());
    }

    #[test]
    fn test_assign_without_frontmost() {
        let mut controller = controller_with("nofront", FakeWorkspace::default());
        let id = controller.add_group(AppGroup::new("g")).unwrap();
        let err = controller.assign_frontmost_app(id).unwrap_err();
        assert!(matches!(err, AssignError::NoFrontmostApp));
    }

    #[test]
    fn test_load_rehydrates_groups() {
        let config = temp_config("load");
        let document = ConfigDocument {
            settings: Settings::default(),
            app_groups: vec![PersistedGroup {
                name: "web".to_string(),
                shortcut: Some(HotKey::new("super+1")),
                assign_shortcut: None,
                apps: vec!["firefox".to_string()],
                target: None,
                open_apps_on_activation: None,
            }],
        };
        config.save(&document).unwrap();

        let workspace = FakeWorkspace::default();
        workspace.install(AppIdentity::new("Firefox", "firefox"));
        let controller = Controller::new(config, workspace);

        assert_eq!(controller.store().all().len(), 1);
        assert_eq!(controller.store().all()[0].apps[0].name, "Firefox");
        assert_eq!(controller.coordinator().binding_count(), 1);
    }

    #[test]
    fn test_hotkey_event_activates_group() {
        let workspace = FakeWorkspace::with_running(&["firefox"]);
        let mut controller = controller_with("activate", workspace);

        let mut group = AppGroup::new("web");
        group.push_app(AppIdentity::new("Firefox", "firefox"));
        group.activate_shortcut = Some(HotKey::new("super+1"));
        controller.add_group(group).unwrap();

        assert!(controller.handle_event(Event::HotKey(HotKey::new("super+1"))));
        assert_eq!(
            *controller.workspace().activated.borrow(),
            vec!["firefox".to_string()]
        );
    }

    #[test]
    fn test_app_activated_feeds_recency() {
        let workspace = FakeWorkspace::with_running(&["a", "b"]);
        let mut controller = controller_with("recency", workspace);

        let mut group = AppGroup::new("g");
        group.push_app(AppIdentity::new("A", "a"));
        group.push_app(AppIdentity::new("B", "b"));
        group.activate_shortcut = Some(HotKey::new("super+1"));
        controller.add_group(group).unwrap();

        controller.handle_event(Event::AppActivated {
            bundle_id: "b".to_string(),
            timestamp_ms: 42,
        });
        controller.dispatch(&HotKey::new("super+1"));
        assert_eq!(
            *controller.workspace().activated.borrow(),
            vec!["b".to_string()]
        );
    }

    #[test]
    fn test_shutdown_event_stops_loop() {
        let mut controller = controller_with("shutdown", FakeWorkspace::default());
        assert!(!controller.handle_event(Event::Shutdown));
    }

    #[test]
    fn test_layout_change_triggers_refresh() {
        let mut controller = controller_with("layout", FakeWorkspace::default());
        let mut group = AppGroup::new("dev");
        group.activate_shortcut = Some(HotKey::new("super+1"));
        controller.add_group(group).unwrap();

        assert!(controller.handle_event(Event::KeyboardLayoutChanged));
        assert_eq!(controller.coordinator().binding_count(), 1);
    }
}
