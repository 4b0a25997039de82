//! Canonical hotkey encoding
//!
//! A `HotKey` is the layout-independent string form stored in the config
//! file ("ctrl+shift+a"). Decoding resolves it to an evdev key code plus a
//! modifier set for the global listener; encoding a combo always produces
//! the canonical form (modifiers in fixed order, key name lowercase), so
//! `encode(decode(s)) == s` holds for any canonical string.

use std::fmt;

use evdev::Key;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HotKeyError {
    #[error("empty shortcut string")]
    Empty,
    #[error("unknown key name: {0}")]
    UnknownKey(String),
    #[error("unknown modifier: {0}")]
    UnknownModifier(String),
}

/// Modifier keys of a combo, in canonical encoding order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub super_key: bool,
}

/// A decoded, registrable key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub modifiers: Modifiers,
    pub key: Key,
}

/// Opaque canonical-string shortcut. Two hotkeys are equal iff their
/// strings match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HotKey {
    value: String,
}

impl HotKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Canonical encoding of a combo.
    ///
    /// Returns `None` for keys outside the supported table (such a combo
    /// can never have been registered in the first place).
    pub fn from_combo(combo: &KeyCombo) -> Option<Self> {
        let key_name = key_name(combo.key)?;
        let mut parts: Vec<&str> = Vec::with_capacity(5);
        if combo.modifiers.ctrl {
            parts.push("ctrl");
        }
        if combo.modifiers.alt {
            parts.push("alt");
        }
        if combo.modifiers.shift {
            parts.push("shift");
        }
        if combo.modifiers.super_key {
            parts.push("super");
        }
        parts.push(key_name);
        Some(Self::new(parts.join("+")))
    }

    /// Decode into a registrable combo. Accepts a few modifier aliases
    /// ("cmd", "control", "option", "meta") from hand-edited configs.
    pub fn decode(&self) -> Result<KeyCombo, HotKeyError> {
        let tokens: Vec<String> = self
            .value
            .split('+')
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        let Some((key_token, modifier_tokens)) = tokens.split_last() else {
            return Err(HotKeyError::Empty);
        };

        let mut modifiers = Modifiers::default();
        for token in modifier_tokens {
            match token.as_str() {
                "ctrl" | "control" => modifiers.ctrl = true,
                "alt" | "option" | "meta" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                "super" | "cmd" => modifiers.super_key = true,
                other => return Err(HotKeyError::UnknownModifier(other.to_string())),
            }
        }

        let key = key_from_name(key_token)
            .ok_or_else(|| HotKeyError::UnknownKey(key_token.clone()))?;

        Ok(KeyCombo { modifiers, key })
    }
}

impl fmt::Display for HotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Name ⇄ key code table for every combo key we register.
/// Modifier keys themselves are intentionally absent.
const KEY_TABLE: &[(&str, Key)] = &[
    ("a", Key::KEY_A),
    ("b", Key::KEY_B),
    ("c", Key::KEY_C),
    ("d", Key::KEY_D),
    ("e", Key::KEY_E),
    ("f", Key::KEY_F),
    ("g", Key::KEY_G),
    ("h", Key::KEY_H),
    ("i", Key::KEY_I),
    ("j", Key::KEY_J),
    ("k", Key::KEY_K),
    ("l", Key::KEY_L),
    ("m", Key::KEY_M),
    ("n", Key::KEY_N),
    ("o", Key::KEY_O),
    ("p", Key::KEY_P),
    ("q", Key::KEY_Q),
    ("r", Key::KEY_R),
    ("s", Key::KEY_S),
    ("t", Key::KEY_T),
    ("u", Key::KEY_U),
    ("v", Key::KEY_V),
    ("w", Key::KEY_W),
    ("x", Key::KEY_X),
    ("y", Key::KEY_Y),
    ("z", Key::KEY_Z),
    ("0", Key::KEY_0),
    ("1", Key::KEY_1),
    ("2", Key::KEY_2),
    ("3", Key::KEY_3),
    ("4", Key::KEY_4),
    ("5", Key::KEY_5),
    ("6", Key::KEY_6),
    ("7", Key::KEY_7),
    ("8", Key::KEY_8),
    ("9", Key::KEY_9),
    ("f1", Key::KEY_F1),
    ("f2", Key::KEY_F2),
    ("f3", Key::KEY_F3),
    ("f4", Key::KEY_F4),
    ("f5", Key::KEY_F5),
    ("f6", Key::KEY_F6),
    ("f7", Key::KEY_F7),
    ("f8", Key::KEY_F8),
    ("f9", Key::KEY_F9),
    ("f10", Key::KEY_F10),
    ("f11", Key::KEY_F11),
    ("f12", Key::KEY_F12),
    ("tab", Key::KEY_TAB),
    ("space", Key::KEY_SPACE),
    ("enter", Key::KEY_ENTER),
    ("escape", Key::KEY_ESC),
    ("backspace", Key::KEY_BACKSPACE),
    ("delete", Key::KEY_DELETE),
    ("home", Key::KEY_HOME),
    ("end", Key::KEY_END),
    ("pageup", Key::KEY_PAGEUP),
    ("pagedown", Key::KEY_PAGEDOWN),
    ("up", Key::KEY_UP),
    ("down", Key::KEY_DOWN),
    ("left", Key::KEY_LEFT),
    ("right", Key::KEY_RIGHT),
    ("minus", Key::KEY_MINUS),
    ("equal", Key::KEY_EQUAL),
    ("comma", Key::KEY_COMMA),
    ("period", Key::KEY_DOT),
    ("slash", Key::KEY_SLASH),
    ("semicolon", Key::KEY_SEMICOLON),
    ("apostrophe", Key::KEY_APOSTROPHE),
    ("backslash", Key::KEY_BACKSLASH),
    ("leftbracket", Key::KEY_LEFTBRACE),
    ("rightbracket", Key::KEY_RIGHTBRACE),
    ("grave", Key::KEY_GRAVE),
];

fn key_from_name(name: &str) -> Option<Key> {
    KEY_TABLE
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, key)| *key)
}

fn key_name(key: Key) -> Option<&'static str> {
    KEY_TABLE
        .iter()
        .find(|(_, k)| *k == key)
        .map(|(name, _)| *name)
}
