//! External event sources
//!
//! Global key presses come from evdev keyboard devices (one thread per
//! device), OS focus changes and keyboard mapping changes come from an
//! X11 watcher thread, and SIGINT/SIGTERM become a shutdown event. All
//! of them funnel into the single mpsc channel drained by the main
//! loop, so handlers never overlap.

use std::sync::mpsc::Sender;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use evdev::{AttributeSet, Device, EventType, InputEventKind, Key};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::{debug, error, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::Event as XEvent;
use x11rb::protocol::xproto::{ChangeWindowAttributesAux, ConnectionExt, EventMask};

use crate::constants::{input, paths, permissions};
use crate::coordinator::ListenSet;
use crate::hotkey::{HotKey, Modifiers};
use crate::x11_workspace;

/// Everything the main loop reacts to.
#[derive(Debug)]
pub enum Event {
    HotKey(HotKey),
    AppActivated { bundle_id: String, timestamp_ms: u64 },
    KeyboardLayoutChanged,
    Shutdown,
}

/// Find all keyboard devices (anything exposing letter keys)
fn find_all_keyboard_devices() -> Result<Vec<Device>> {
    info!(path = %paths::DEV_INPUT, "Scanning for keyboard devices...");

    let mut devices = Vec::new();

    for entry in std::fs::read_dir(paths::DEV_INPUT).context(format!(
        "Failed to read {} - are you in the '{}' group?",
        paths::DEV_INPUT,
        permissions::INPUT_GROUP
    ))? {
        let entry = entry?;
        let path = entry.path();

        if let Ok(device) = Device::open(&path) {
            if let Some(keys) = device.supported_keys() {
                if keys.contains(Key::KEY_A) {
                    info!(device_path = %path.display(), name = ?device.name(), "Found keyboard device");
                    devices.push(device);
                }
            }
        }
    }

    if devices.is_empty() {
        anyhow::bail!(
            "No keyboard device found. Ensure you're in '{}' group:\n\
             {}\n\
             Then log out and back in.",
            permissions::INPUT_GROUP,
            permissions::ADD_TO_INPUT_GROUP
        )
    }

    info!(count = devices.len(), "Listening on keyboard device(s)");

    Ok(devices)
}

/// Spawn background threads matching key events against the registered
/// combo set. The set itself is owned by the coordinator and swapped on
/// every refresh; the threads only ever read the current snapshot.
pub fn spawn_keyboard_listeners(
    listen_set: ListenSet,
    sender: Sender<Event>,
) -> Result<Vec<thread::JoinHandle<()>>> {
    let devices = find_all_keyboard_devices()?;
    let mut handles = Vec::new();

    for device in devices {
        let sender = sender.clone();
        let listen_set = listen_set.clone();
        let handle = thread::spawn(move || {
            info!(device = ?device.name(), "Hotkey listener started");
            if let Err(e) = listen_on_device(device, listen_set, sender) {
                error!(error = %e, "Hotkey listener error");
            }
        });
        handles.push(handle);
    }

    Ok(handles)
}

fn listen_on_device(mut device: Device, listen_set: ListenSet, sender: Sender<Event>) -> Result<()> {
    loop {
        // Fetch events (blocks until available)
        let events = device.fetch_events().context("Failed to fetch events")?;

        // Collect presses first; the events iterator must be finished
        // with before the key state can be queried
        let mut presses = Vec::new();
        for event in events {
            if event.event_type() != EventType::KEY {
                continue;
            }
            if let InputEventKind::Key(key) = event.kind() {
                if event.value() == input::KEY_PRESS && !is_modifier(key) {
                    presses.push(key);
                }
            }
        }

        for key in presses {
            // Real-time modifier state at press time, not batched state
            let key_state = device
                .get_key_state()
                .context("Failed to get keyboard state")?;
            let modifiers = modifiers_from_state(&key_state);

            let matched = listen_set
                .read()
                .ok()
                .and_then(|set| {
                    set.iter()
                        .find(|(combo, _)| combo.key == key && combo.modifiers == modifiers)
                        .map(|(_, hotkey)| hotkey.clone())
                });

            if let Some(hotkey) = matched {
                info!(hotkey = %hotkey, "Global shortcut pressed");
                sender
                    .send(Event::HotKey(hotkey))
                    .context("Failed to send hotkey event")?;
            } else {
                debug!(key = ?key, ?modifiers, "Key press matched no registered shortcut");
            }
        }
    }
}

fn is_modifier(key: Key) -> bool {
    matches!(
        key,
        Key::KEY_LEFTCTRL
            | Key::KEY_RIGHTCTRL
            | Key::KEY_LEFTALT
            | Key::KEY_RIGHTALT
            | Key::KEY_LEFTSHIFT
            | Key::KEY_RIGHTSHIFT
            | Key::KEY_LEFTMETA
            | Key::KEY_RIGHTMETA
    )
}

fn modifiers_from_state(state: &AttributeSet<Key>) -> Modifiers {
    Modifiers {
        ctrl: state.contains(Key::KEY_LEFTCTRL) || state.contains(Key::KEY_RIGHTCTRL),
        alt: state.contains(Key::KEY_LEFTALT) || state.contains(Key::KEY_RIGHTALT),
        shift: state.contains(Key::KEY_LEFTSHIFT) || state.contains(Key::KEY_RIGHTSHIFT),
        super_key: state.contains(Key::KEY_LEFTMETA) || state.contains(Key::KEY_RIGHTMETA),
    }
}

/// Check if hotkeys are available (user has input group permissions)
pub fn check_permissions() -> bool {
    std::fs::read_dir(paths::DEV_INPUT).is_ok()
}

/// Print helpful error message if permissions missing
pub fn print_permission_error() {
    error!(path = %paths::DEV_INPUT, "Cannot access input devices");
    error!(group = %permissions::INPUT_GROUP, "Global shortcuts require group membership");
    error!(command = %permissions::ADD_TO_INPUT_GROUP, "Add user to input group");
    error!("  Then log out and back in");
    warn!(continuing = true, "Continuing without global shortcut support...");
}

/// Watch the X11 root window for focus changes (feeds the engine's
/// recency map) and for keyboard mapping changes (triggers a hotkey
/// refresh).
pub fn spawn_focus_watcher(sender: Sender<Event>) -> Result<thread::JoinHandle<()>> {
    let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X11")?;
    let root = conn.setup().roots[screen_num].root;
    let net_active_window = conn
        .intern_atom(false, b"_NET_ACTIVE_WINDOW")
        .context("Failed to intern _NET_ACTIVE_WINDOW atom")?
        .reply()
        .context("Failed to get reply for _NET_ACTIVE_WINDOW atom")?
        .atom;

    conn.change_window_attributes(
        root,
        &ChangeWindowAttributesAux::new().event_mask(EventMask::PROPERTY_CHANGE),
    )
    .context("Failed to select property events on root window")?;
    conn.flush().context("Failed to flush X11 connection")?;

    Ok(thread::spawn(move || {
        info!("App activation watcher started");
        if let Err(e) = watch_focus(conn, root, net_active_window, sender) {
            error!(error = %e, "App activation watcher error");
        }
    }))
}

fn watch_focus(
    conn: x11rb::rust_connection::RustConnection,
    root: u32,
    net_active_window: u32,
    sender: Sender<Event>,
) -> Result<()> {
    loop {
        let event = conn.wait_for_event().context("Failed to wait for X11 event")?;
        match event {
            XEvent::PropertyNotify(e) if e.atom == net_active_window => {
                let window = match x11_workspace::active_window(&conn, root, net_active_window) {
                    Ok(Some(window)) => window,
                    Ok(None) => continue,
                    Err(e) => {
                        debug!(error = %e, "Could not read active window");
                        continue;
                    }
                };
                match x11_workspace::wm_class_instance(&conn, window) {
                    Ok(Some(bundle_id)) => {
                        sender
                            .send(Event::AppActivated { bundle_id, timestamp_ms: now_ms() })
                            .context("Failed to send activation event")?;
                    }
                    Ok(None) => {}
                    Err(e) => debug!(window = window, error = %e, "Could not read WM_CLASS"),
                }
            }
            XEvent::MappingNotify(_) => {
                info!("Keyboard mapping changed, requesting hotkey refresh");
                sender
                    .send(Event::KeyboardLayoutChanged)
                    .context("Failed to send layout change event")?;
            }
            _ => {}
        }
    }
}

/// SIGINT/SIGTERM end the main loop cleanly.
pub fn spawn_signal_listener(sender: Sender<Event>) -> Result<thread::JoinHandle<()>> {
    let mut signals =
        Signals::new([SIGINT, SIGTERM]).context("Failed to register signal handler")?;
    Ok(thread::spawn(move || {
        if signals.forever().next().is_some() {
            let _ = sender.send(Event::Shutdown);
        }
    }))
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
