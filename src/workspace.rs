//! OS collaborator contract
//!
//! The engine and cycler only ever talk to the desktop through this
//! trait. Failures stay inside the implementation (logged, degraded to
//! empty/None/false), never surface into the core.

use std::collections::HashSet;

use crate::types::{AppIdentity, BundleId};

pub trait Workspace {
    /// Start the app if needed and bring it to the foreground.
    /// Fire-and-forget: failures are logged by the implementation.
    fn launch(&self, app: &AppIdentity);

    /// Bring an already-running app to the foreground.
    /// Returns whether the app was found and activated.
    fn activate_running_app(&self, bundle_id: &str) -> bool;

    fn list_running_apps(&self) -> HashSet<BundleId>;

    fn frontmost_app(&self) -> Option<AppIdentity>;

    /// Name/icon lookup for a bundle id. `None` when the app is no
    /// longer installed.
    fn resolve(&self, bundle_id: &str) -> Option<AppIdentity>;
}

/// Resolve a persisted bundle id, substituting the empty-name broken
/// marker when the app is gone so the entry stays visible and editable.
pub fn rehydrate(workspace: &dyn Workspace, bundle_id: &str) -> AppIdentity {
    workspace
        .resolve(bundle_id)
        .unwrap_or_else(|| AppIdentity::broken(bundle_id))
}
