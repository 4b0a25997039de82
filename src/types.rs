use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of an app group (never persisted, regenerated at load)
pub type GroupId = Uuid;

/// Stable application identifier.
///
/// On X11 this is the WM_CLASS instance string (usually the binary name),
/// which doubles as the desktop-entry id for name/icon resolution.
pub type BundleId = String;

/// Identity of a managed application.
///
/// Equality is keyed on the bundle id when both sides have one; otherwise
/// it falls back to the name. The fallback covers apps whose id could not
/// be resolved anymore (moved or uninstalled).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppIdentity {
    pub name: String,
    pub bundle_id: BundleId,
    pub icon_path: Option<String>,
}

impl AppIdentity {
    pub fn new(name: impl Into<String>, bundle_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bundle_id: bundle_id.into(),
            icon_path: None,
        }
    }

    /// Marker for an app whose bundle id no longer resolves to anything
    /// installed. The empty name is what the UI layer keys on.
    pub fn broken(bundle_id: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            bundle_id: bundle_id.into(),
            icon_path: None,
        }
    }

    pub fn is_broken(&self) -> bool {
        self.name.is_empty()
    }
}

impl PartialEq for AppIdentity {
    fn eq(&self, other: &Self) -> bool {
        if self.bundle_id.is_empty() || other.bundle_id.is_empty() {
            self.name == other.name
        } else {
            self.bundle_id == other.bundle_id
        }
    }
}

impl Eq for AppIdentity {}

impl Hash for AppIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Keyed like equality: bundle id when present, name otherwise.
        // Identities are never stored in hashed containers (see DESIGN.md),
        // group membership is a linear scan over a short list.
        if self.bundle_id.is_empty() {
            self.name.hash(state);
        } else {
            self.bundle_id.hash(state);
        }
    }
}
