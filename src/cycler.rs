//! Within-group focus cycling
//!
//! Stateless: the "current" group is whichever one contains the frontmost
//! app, looked up fresh on every keypress. This deliberately differs from
//! the engine's cycling, which anchors on the last *activated* group.

use tracing::debug;

use crate::store::AppGroupStore;
use crate::types::AppIdentity;
use crate::workspace::Workspace;

#[derive(Debug, Default)]
pub struct FocusCycler;

impl FocusCycler {
    pub fn new() -> Self {
        Self
    }

    /// Focus the next running app in the frontmost app's group,
    /// wrapping past the end of the list.
    pub fn cycle_next(&self, store: &AppGroupStore, workspace: &dyn Workspace) {
        self.cycle(store, workspace, true);
    }

    /// Mirror traversal of `cycle_next` over the same list.
    pub fn cycle_previous(&self, store: &AppGroupStore, workspace: &dyn Workspace) {
        self.cycle(store, workspace, false);
    }

    fn cycle(&self, store: &AppGroupStore, workspace: &dyn Workspace, next: bool) {
        let Some(frontmost) = workspace.frontmost_app() else {
            debug!("No frontmost app, nothing to cycle");
            return;
        };

        // First group containing the frontmost app wins
        let Some(group) = store
            .all()
            .iter()
            .find(|group| group.contains_bundle(&frontmost.bundle_id))
        else {
            debug!(bundle = %frontmost.bundle_id, "Frontmost app is not in any group");
            return;
        };

        let index = group.index_of_bundle(&frontmost.bundle_id).unwrap_or(0);
        let apps = &group.apps;

        // next: rotate left past the current app; previous: scan backward
        let queue: Vec<&AppIdentity> = if next {
            apps[index + 1..].iter().chain(apps[..index].iter()).collect()
        } else {
            apps[..index]
                .iter()
                .rev()
                .chain(apps[index + 1..].iter().rev())
                .collect()
        };

        let running = workspace.list_running_apps();
        let Some(candidate) = queue
            .into_iter()
            .find(|app| !app.bundle_id.is_empty() && running.contains(&app.bundle_id))
        else {
            debug!(group = %group.name, "No other running app in group");
            return;
        };

        debug!(group = %group.name, app = %candidate.name, "Cycling focus within group");
        workspace.activate_running_app(&candidate.bundle_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::AppGroup;
    use crate::workspace::fake::FakeWorkspace;

    fn store_with_group(bundles: &[&str]) -> AppGroupStore {
        let mut group = AppGroup::new("g");
        for bundle in bundles {
            group.push_app(AppIdentity::new(bundle.to_uppercase(), *bundle));
        }
        let mut store = AppGroupStore::default();
        store.add(group).unwrap();
        store
    }

    #[test]
    fn test_cycle_next_picks_following_running_app() {
        let store = store_with_group(&["a", "b", "c"]);
        let workspace = FakeWorkspace::with_running(&["a", "b", "c"]);
        workspace.set_frontmost(AppIdentity::new("A", "a"));

        FocusCycler::new().cycle_next(&store, &workspace);
        assert_eq!(*workspace.activated.borrow(), vec!["b".to_string()]);
    }

    #[test]
    fn test_cycle_next_skips_non_running() {
        let store = store_with_group(&["a", "b", "c"]);
        let workspace = FakeWorkspace::with_running(&["a", "c"]);
        workspace.set_frontmost(AppIdentity::new("A", "a"));

        FocusCycler::new().cycle_next(&store, &workspace);
        assert_eq!(*workspace.activated.borrow(), vec!["c".to_string()]);
    }

    #[test]
    fn test_cycle_next_wraps_around() {
        let store = store_with_group(&["a", "b", "c"]);
        let workspace = FakeWorkspace::with_running(&["a", "c"]);
        workspace.set_frontmost(AppIdentity::new("C", "c"));

        FocusCycler::new().cycle_next(&store, &workspace);
        assert_eq!(*workspace.activated.borrow(), vec!["a".to_string()]);
    }

    #[test]
    fn test_cycle_previous_scans_backward() {
        let store = store_with_group(&["a", "b", "c"]);
        let workspace = FakeWorkspace::with_running(&["a", "b", "c"]);
        workspace.set_frontmost(AppIdentity::new("C", "c"));

        FocusCycler::new().cycle_previous(&store, &workspace);
        assert_eq!(*workspace.activated.borrow(), vec!["b".to_string()]);
    }

    #[test]
    fn test_cycle_previous_wraps_to_end() {
        let store = store_with_group(&["a", "b", "c"]);
        let workspace = FakeWorkspace::with_running(&["a", "b", "c"]);
        workspace.set_frontmost(AppIdentity::new("A", "a"));

        FocusCycler::new().cycle_previous(&store, &workspace);
        assert_eq!(*workspace.activated.borrow(), vec!["c".to_string()]);
    }

    #[test]
    fn test_next_then_previous_returns_to_start() {
        let store = store_with_group(&["a", "b", "c"]);
        let cycler = FocusCycler::new();

        let workspace = FakeWorkspace::with_running(&["a", "b", "c"]);
        workspace.set_frontmost(AppIdentity::new("B", "b"));
        cycler.cycle_next(&store, &workspace);
        assert_eq!(*workspace.activated.borrow(), vec!["c".to_string()]);

        // Frontmost follows the activation
        workspace.set_frontmost(AppIdentity::new("C", "c"));
        cycler.cycle_previous(&store, &workspace);
        assert_eq!(
            *workspace.activated.borrow(),
            vec!["c".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn test_noop_when_frontmost_not_grouped() {
        let store = store_with_group(&["a", "b"]);
        let workspace = FakeWorkspace::with_running(&["a", "b", "x"]);
        workspace.set_frontmost(AppIdentity::new("X", "x"));

        FocusCycler::new().cycle_next(&store, &workspace);
        assert!(workspace.activated.borrow().is_empty());
    }

    #[test]
    fn test_noop_without_frontmost() {
        let store = store_with_group(&["a"]);
        let workspace = FakeWorkspace::with_running(&["a"]);

        FocusCycler::new().cycle_next(&store, &workspace);
        assert!(workspace.activated.borrow().is_empty());
    }

    #[test]
    fn test_noop_when_alone_in_group() {
        let store = store_with_group(&["a", "b"]);
        let workspace = FakeWorkspace::with_running(&["a"]);
        workspace.set_frontmost(AppIdentity::new("A", "a"));

        FocusCycler::new().cycle_next(&store, &workspace);
        assert!(workspace.activated.borrow().is_empty());
    }

    #[test]
    fn test_first_matching_group_wins() {
        let shared = AppIdentity::new("Shared", "shared");
        let mut first = AppGroup::new("first");
        first.push_app(shared.clone());
        first.push_app(AppIdentity::new("A", "a"));
        let mut second = AppGroup::new("second");
        second.push_app(shared.clone());
        second.push_app(AppIdentity::new("B", "b"));

        let mut store = AppGroupStore::default();
        store.add(first).unwrap();
        store.add(second).unwrap();

        let workspace = FakeWorkspace::with_running(&["shared", "a", "b"]);
        workspace.set_frontmost(shared);

        FocusCycler::new().cycle_next(&store, &workspace);
        assert_eq!(*workspace.activated.borrow(), vec!["a".to_string()]);
    }
}
