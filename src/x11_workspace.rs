//! X11 implementation of the workspace collaborator
//!
//! The WM_CLASS instance string is the app's bundle id: it is stable
//! across restarts and matches the desktop-entry file name for most
//! apps, which is what name/icon resolution and launching key on.
//! Every failure degrades to "not found" or an empty set; nothing here
//! propagates into the engine.

use std::collections::HashSet;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use freedesktop_desktop_entry::{default_paths, DesktopEntry, Iter as DesktopEntryIter};
use tracing::{debug, error, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    Atom, AtomEnum, ClientMessageData, ClientMessageEvent, ConfigureWindowAux, ConnectionExt,
    EventMask, StackMode, Window, CLIENT_MESSAGE_EVENT,
};
use x11rb::rust_connection::RustConnection;

use crate::constants::x11;
use crate::types::{AppIdentity, BundleId};
use crate::workspace::Workspace;

/// Pre-cached X11 atoms to avoid repeated roundtrips
pub struct CachedAtoms {
    pub net_client_list: Atom,
    pub net_active_window: Atom,
}

impl CachedAtoms {
    pub fn new(conn: &RustConnection) -> Result<Self> {
        Ok(Self {
            net_client_list: conn
                .intern_atom(false, b"_NET_CLIENT_LIST")
                .context("Failed to intern _NET_CLIENT_LIST atom")?
                .reply()
                .context("Failed to get reply for _NET_CLIENT_LIST atom")?
                .atom,
            net_active_window: conn
                .intern_atom(false, b"_NET_ACTIVE_WINDOW")
                .context("Failed to intern _NET_ACTIVE_WINDOW atom")?
                .reply()
                .context("Failed to get reply for _NET_ACTIVE_WINDOW atom")?
                .atom,
        })
    }
}

pub struct X11Workspace {
    conn: RustConnection,
    screen_num: usize,
    atoms: CachedAtoms,
}

impl X11Workspace {
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X11")?;
        let atoms = CachedAtoms::new(&conn)?;
        info!(screen = screen_num, "Connected to X11");
        Ok(Self { conn, screen_num, atoms })
    }

    fn root(&self) -> Window {
        self.conn.setup().roots[self.screen_num].root
    }

    fn client_windows(&self) -> Result<Vec<Window>> {
        let prop = self
            .conn
            .get_property(
                false,
                self.root(),
                self.atoms.net_client_list,
                AtomEnum::WINDOW,
                0,
                u32::MAX,
            )
            .context("Failed to query _NET_CLIENT_LIST")?
            .reply()
            .context("Failed to get reply for _NET_CLIENT_LIST")?;
        Ok(prop.value32().map(|values| values.collect()).unwrap_or_default())
    }

    fn window_for_bundle(&self, bundle_id: &str) -> Result<Option<Window>> {
        for window in self.client_windows()? {
            if let Some(class) = wm_class_instance(&self.conn, window)?
                && class == bundle_id
            {
                return Ok(Some(window));
            }
        }
        Ok(None)
    }

    /// Raise and focus a window via _NET_ACTIVE_WINDOW
    fn activate_window(&self, window: Window) -> Result<()> {
        self.conn
            .configure_window(
                window,
                &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
            )
            .context(format!("Failed to raise window {} to top of stack", window))?;

        let event = ClientMessageEvent {
            response_type: CLIENT_MESSAGE_EVENT,
            format: 32,
            sequence: 0,
            window,
            type_: self.atoms.net_active_window,
            data: ClientMessageData::from([
                x11::ACTIVE_WINDOW_SOURCE_PAGER,
                x11rb::CURRENT_TIME,
                0, // Requestor's currently active window (0 = none)
                0,
                0,
            ]),
        };

        self.conn
            .send_event(
                false,
                self.root(),
                EventMask::SUBSTRUCTURE_NOTIFY | EventMask::SUBSTRUCTURE_REDIRECT,
                &event,
            )
            .context(format!("Failed to send _NET_ACTIVE_WINDOW event for window {}", window))?;

        self.conn
            .flush()
            .context("Failed to flush X11 connection after window activation")?;
        Ok(())
    }

    fn collect_running(&self) -> Result<HashSet<BundleId>> {
        let mut running = HashSet::new();
        for window in self.client_windows()? {
            if let Some(class) = wm_class_instance(&self.conn, window)? {
                running.insert(class);
            }
        }
        Ok(running)
    }

    /// Exec line from the app's desktop entry, falling back to the
    /// bundle id as a bare command.
    fn launch_command(&self, app: &AppIdentity) -> (String, Vec<String>) {
        if let Some(path) = desktop_entry_path(&app.bundle_id)
            && let Ok(entry) = DesktopEntry::from_path(path, Some(&["en"]))
            && let Some(exec) = entry.exec()
            && let Ok(mut parts) = shell_words::split(exec)
            && !parts.is_empty()
        {
            let command = parts.remove(0);
            // Drop desktop-entry field codes (%f, %u, ...)
            let args = parts.into_iter().filter(|arg| !arg.starts_with('%')).collect();
            return (command, args);
        }
        (app.bundle_id.clone(), Vec::new())
    }
}

impl Workspace for X11Workspace {
    fn launch(&self, app: &AppIdentity) {
        // Already running: just bring it forward
        if self.activate_running_app(&app.bundle_id) {
            return;
        }

        let (command, args) = self.launch_command(app);
        match Command::new(&command).args(&args).spawn() {
            Ok(child) => {
                info!(app = %app.name, command = %command, pid = child.id(), "Launched app")
            }
            Err(e) => {
                error!(app = %app.name, command = %command, error = %e, "Failed to launch app")
            }
        }
    }

    fn activate_running_app(&self, bundle_id: &str) -> bool {
        match self.window_for_bundle(bundle_id) {
            Ok(Some(window)) => match self.activate_window(window) {
                Ok(()) => true,
                Err(e) => {
                    error!(bundle = %bundle_id, error = %e, "Failed to activate window");
                    false
                }
            },
            Ok(None) => {
                debug!(bundle = %bundle_id, "No window for bundle id");
                false
            }
            Err(e) => {
                error!(bundle = %bundle_id, error = %e, "Failed to search for window");
                false
            }
        }
    }

    fn list_running_apps(&self) -> HashSet<BundleId> {
        match self.collect_running() {
            Ok(running) => running,
            Err(e) => {
                warn!(error = %e, "Failed to enumerate running apps");
                HashSet::new()
            }
        }
    }

    fn frontmost_app(&self) -> Option<AppIdentity> {
        let window = active_window(&self.conn, self.root(), self.atoms.net_active_window)
            .ok()
            .flatten()?;
        let class = wm_class_instance(&self.conn, window).ok().flatten()?;
        // A running app is never "broken" even without a desktop entry
        Some(
            self.resolve(&class)
                .unwrap_or_else(|| AppIdentity::new(class.clone(), class.clone())),
        )
    }

    fn resolve(&self, bundle_id: &str) -> Option<AppIdentity> {
        let path = desktop_entry_path(bundle_id)?;
        let entry = DesktopEntry::from_path(path, Some(&["en"])).ok()?;
        let name = entry
            .name(&["en"])
            .map(|name| name.to_string())
            .unwrap_or_else(|| bundle_id.to_string());
        let mut identity = AppIdentity::new(name, bundle_id);
        identity.icon_path = entry.icon().map(|icon| icon.to_string());
        Some(identity)
    }
}

fn desktop_entry_path(bundle_id: &str) -> Option<PathBuf> {
    if bundle_id.is_empty() {
        return None;
    }
    DesktopEntryIter::new(default_paths()).find(|path| {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .map(|stem| stem.eq_ignore_ascii_case(bundle_id))
            .unwrap_or(false)
    })
}

/// WM_CLASS instance string (first null-terminated component)
pub(crate) fn wm_class_instance(conn: &RustConnection, window: Window) -> Result<Option<String>> {
    let prop = conn
        .get_property(false, window, AtomEnum::WM_CLASS, AtomEnum::STRING, 0, 1024)
        .context(format!("Failed to query WM_CLASS for window {}", window))?
        .reply()
        .context(format!("Failed to get WM_CLASS reply for window {}", window))?;
    if prop.value.is_empty() {
        return Ok(None);
    }
    let instance = prop
        .value
        .split(|byte| *byte == 0)
        .next()
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .filter(|instance| !instance.is_empty());
    Ok(instance)
}

/// Currently focused top-level window, if any
pub(crate) fn active_window(
    conn: &RustConnection,
    root: Window,
    net_active_window: Atom,
) -> Result<Option<Window>> {
    let prop = conn
        .get_property(false, root, net_active_window, AtomEnum::WINDOW, 0, 1)
        .context("Failed to query _NET_ACTIVE_WINDOW property")?
        .reply()
        .context("Failed to get reply for _NET_ACTIVE_WINDOW query")?;
    Ok(prop
        .value32()
        .and_then(|mut values| values.next())
        .filter(|window| *window != 0))
}
