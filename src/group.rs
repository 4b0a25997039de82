use uuid::Uuid;

use crate::hotkey::HotKey;
use crate::types::{AppIdentity, GroupId};

/// A named, ordered set of applications with optional shortcuts.
///
/// Value record keyed by `id`; the store is the only owner, everything
/// else looks groups up by id. The `apps` order is the cycling priority
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct AppGroup {
    pub id: GroupId,
    pub name: String,
    pub activate_shortcut: Option<HotKey>,
    pub assign_app_shortcut: Option<HotKey>,
    pub apps: Vec<AppIdentity>,
    /// Pinned app that is always launched on activation, even when not
    /// running. May be transiently absent from `apps` after edits.
    pub target_app: Option<AppIdentity>,
    /// Launch every non-running member app when the group is activated.
    pub open_apps_on_activation: Option<bool>,
}

impl AppGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            activate_shortcut: None,
            assign_app_shortcut: None,
            apps: Vec::new(),
            target_app: None,
            open_apps_on_activation: None,
        }
    }

    pub fn contains_bundle(&self, bundle_id: &str) -> bool {
        self.apps.iter().any(|app| app.bundle_id == bundle_id)
    }

    pub fn index_of_bundle(&self, bundle_id: &str) -> Option<usize> {
        self.apps.iter().position(|app| app.bundle_id == bundle_id)
    }

    /// Append an app unless an equal identity is already a member.
    /// Returns whether the group changed.
    pub fn push_app(&mut self, app: AppIdentity) -> bool {
        if self.apps.contains(&app) {
            return false;
        }
        self.apps.push(app);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_app_dedupes_by_identity() {
        let mut group = AppGroup::new("dev");
        assert!(group.push_app(AppIdentity::new("Code", "code")));
        assert!(!group.push_app(AppIdentity::new("Code OSS", "code")));
        assert_eq!(group.apps.len(), 1);
    }

    #[test]
    fn test_bundle_lookup() {
        let mut group = AppGroup::new("web");
        group.push_app(AppIdentity::new("Firefox", "firefox"));
        group.push_app(AppIdentity::new("Chromium", "chromium"));

        assert!(group.contains_bundle("chromium"));
        assert!(!group.contains_bundle("safari"));
        assert_eq!(group.index_of_bundle("firefox"), Some(0));
        assert_eq!(group.index_of_bundle("chromium"), Some(1));
    }
}
