//! Hotkey coordination
//!
//! Owns the binding table between canonical hotkeys and actions, and the
//! shared combo set consumed by the evdev listener threads. `refresh()`
//! rebuilds both from the current store + settings; the listener set is
//! swapped wholesale under its write lock, so a combo belonging to a
//! deleted group can never linger. Actions carry group *ids*, never group
//! snapshots — dispatch re-resolves against the store at fire time.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::hotkey::{HotKey, KeyCombo};
use crate::store::AppGroupStore;
use crate::types::GroupId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotKeyAction {
    ActivateGroup(GroupId),
    AssignFrontmost(GroupId),
    RecentGroup,
    CycleGroupsNext,
    CycleGroupsPrevious,
    NextAppInGroup,
    PreviousAppInGroup,
}

/// Snapshot of registered combos, shared with the listener threads.
pub type ListenSet = Arc<RwLock<Vec<(KeyCombo, HotKey)>>>;

#[derive(Default)]
pub struct HotKeyCoordinator {
    bindings: HashMap<HotKey, HotKeyAction>,
    listen_set: ListenSet,
}

impl HotKeyCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for the listener threads; lives for the whole process.
    pub fn listen_set(&self) -> ListenSet {
        Arc::clone(&self.listen_set)
    }

    pub fn action_for(&self, hotkey: &HotKey) -> Option<HotKeyAction> {
        self.bindings.get(hotkey).copied()
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Unregister everything. Safe to call when nothing is registered.
    pub fn disable_all(&mut self) {
        self.bindings.clear();
        if let Ok(mut set) = self.listen_set.write() {
            set.clear();
        }
    }

    /// Register the fixed navigation shortcuts plus every group shortcut.
    /// Undecodable shortcuts are skipped with a warning; on a collision
    /// the first registration wins (fixed shortcuts first, then groups in
    /// store order), so a stale duplicate from an old config file cannot
    /// shadow anything non-deterministically.
    pub fn enable_all(&mut self, store: &AppGroupStore, settings: &Settings) {
        let mut combos: Vec<(KeyCombo, HotKey)> = Vec::new();

        let mut register = |bindings: &mut HashMap<HotKey, HotKeyAction>,
                            hotkey: &HotKey,
                            action: HotKeyAction| {
            let combo = match hotkey.decode() {
                Ok(combo) => combo,
                Err(e) => {
                    warn!(hotkey = %hotkey, error = %e, "Skipping undecodable shortcut");
                    return;
                }
            };
            if bindings.contains_key(hotkey) {
                warn!(hotkey = %hotkey, ?action, "Shortcut already bound, keeping first registration");
                return;
            }
            bindings.insert(hotkey.clone(), action);
            combos.push((combo, hotkey.clone()));
        };

        let fixed = [
            (&settings.recent_group, HotKeyAction::RecentGroup),
            (&settings.cycle_groups_next, HotKeyAction::CycleGroupsNext),
            (&settings.cycle_groups_previous, HotKeyAction::CycleGroupsPrevious),
            (&settings.next_app_in_group, HotKeyAction::NextAppInGroup),
            (&settings.previous_app_in_group, HotKeyAction::PreviousAppInGroup),
        ];
        for (hotkey, action) in fixed {
            if let Some(hotkey) = hotkey {
                register(&mut self.bindings, hotkey, action);
            }
        }

        for group in store.all() {
            if let Some(hotkey) = &group.activate_shortcut {
                register(&mut self.bindings, hotkey, HotKeyAction::ActivateGroup(group.id));
            }
            if let Some(hotkey) = &group.assign_app_shortcut {
                register(&mut self.bindings, hotkey, HotKeyAction::AssignFrontmost(group.id));
            }
        }

        info!(bindings = self.bindings.len(), "Registered global shortcuts");
        if let Ok(mut set) = self.listen_set.write() {
            *set = combos;
        }
    }

    /// Atomic from the caller's perspective: dispatch runs on the same
    /// thread, and the listener snapshot is replaced in one write.
    pub fn refresh(&mut self, store: &AppGroupStore, settings: &Settings) {
        debug!("Refreshing hotkey bindings");
        self.disable_all();
        self.enable_all(store, settings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::AppGroup;

    fn group_with_shortcut(name: &str, shortcut: &str) -> AppGroup {
        let mut group = AppGroup::new(name);
        group.activate_shortcut = Some(HotKey::new(shortcut));
        group
    }

    #[test]
    fn test_enable_all_registers_groups_and_settings() {
        let mut store = AppGroupStore::default();
        let group = group_with_shortcut("dev", "super+1");
        let id = group.id;
        store.add(group).unwrap();

        let settings = Settings {
            recent_group: Some(HotKey::new("super+tab")),
            ..Settings::default()
        };

        let mut coordinator = HotKeyCoordinator::new();
        coordinator.enable_all(&store, &settings);

        assert_eq!(coordinator.binding_count(), 2);
        assert_eq!(
            coordinator.action_for(&HotKey::new("super+1")),
            Some(HotKeyAction::ActivateGroup(id))
        );
        assert_eq!(
            coordinator.action_for(&HotKey::new("super+tab")),
            Some(HotKeyAction::RecentGroup)
        );
        assert_eq!(coordinator.listen_set().read().unwrap().len(), 2);
    }

    #[test]
    fn test_undecodable_shortcut_skipped_others_register() {
        let mut store = AppGroupStore::default();
        store.add(group_with_shortcut("bad", "hyper+zzz")).unwrap();
        store.add(group_with_shortcut("good", "super+2")).unwrap();

        let mut coordinator = HotKeyCoordinator::new();
        coordinator.enable_all(&store, &Settings::default());

        assert_eq!(coordinator.binding_count(), 1);
        assert!(coordinator.action_for(&HotKey::new("super+2")).is_some());
    }

    #[test]
    fn test_duplicate_binding_first_wins() {
        // Duplicates are rejected by the store, but an old config file
        // can still carry them through load
        let a = group_with_shortcut("a", "super+3");
        let b = group_with_shortcut("b", "super+3");
        let id_a = a.id;
        let store = AppGroupStore::new(vec![a, b]);

        let mut coordinator = HotKeyCoordinator::new();
        coordinator.enable_all(&store, &Settings::default());

        assert_eq!(coordinator.binding_count(), 1);
        assert_eq!(
            coordinator.action_for(&HotKey::new("super+3")),
            Some(HotKeyAction::ActivateGroup(id_a))
        );
        assert_eq!(coordinator.listen_set().read().unwrap().len(), 1);
    }

    #[test]
    fn test_disable_all_idempotent() {
        let mut coordinator = HotKeyCoordinator::new();
        coordinator.disable_all();
        coordinator.disable_all();
        assert_eq!(coordinator.binding_count(), 0);
    }

    #[test]
    fn test_refresh_drops_stale_bindings() {
        let mut store = AppGroupStore::default();
        let group = group_with_shortcut("dev", "super+1");
        let id = group.id;
        store.add(group).unwrap();

        let mut coordinator = HotKeyCoordinator::new();
        coordinator.refresh(&store, &Settings::default());
        assert_eq!(coordinator.binding_count(), 1);

        store.delete(&std::collections::HashSet::from([id]));
        coordinator.refresh(&store, &Settings::default());
        assert_eq!(coordinator.binding_count(), 0);
        assert!(coordinator.listen_set().read().unwrap().is_empty());
    }
}
