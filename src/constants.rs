//! Application-wide constants

/// Config file location under `dirs::config_dir()`
pub mod config {
    pub const APP_DIR: &str = "appdeck";
    pub const FILENAME: &str = "config.json";
}

/// Input event constants (from evdev)
pub mod input {
    /// Key press event value
    pub const KEY_PRESS: i32 = 1;
}

pub mod paths {
    pub const DEV_INPUT: &str = "/dev/input";
}

pub mod permissions {
    pub const INPUT_GROUP: &str = "input";
    pub const ADD_TO_INPUT_GROUP: &str = "sudo usermod -aG input $USER";
}

/// X11 protocol constants
pub mod x11 {
    /// Source indication for _NET_ACTIVE_WINDOW (2 = pager/direct user action)
    pub const ACTIVE_WINDOW_SOURCE_PAGER: u32 = 2;
}
