#![forbid(unsafe_code)]

mod config;
mod constants;
mod controller;
mod coordinator;
mod cycler;
mod engine;
mod group;
mod hotkey;
mod listener;
mod store;
mod types;
mod workspace;
mod x11_workspace;

use std::path::PathBuf;
use std::sync::mpsc;

use clap::Parser;
use tracing::{error, info, warn, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use config::ConfigStore;
use controller::Controller;
use x11_workspace::X11Workspace;

/// App groups bound to global keyboard shortcuts
#[derive(Parser)]
#[command(name = "appdeck", version, about)]
struct Args {
    /// Path to the config file (defaults to the user config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the effective config as JSON and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = ConfigStore::new(args.config.unwrap_or_else(ConfigStore::default_path));

    if args.print_config {
        let document = config.load();
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    let workspace = X11Workspace::connect()?;
    let mut controller = Controller::new(config, workspace);
    info!(
        groups = controller.store().all().len(),
        bindings = controller.coordinator().binding_count(),
        "appdeck started"
    );

    // Channel for listener threads → main loop
    let (sender, receiver) = mpsc::channel();

    // Global shortcut listeners (optional - skip if permissions denied)
    let _keyboard_handles = if listener::check_permissions() {
        match listener::spawn_keyboard_listeners(controller.listen_set(), sender.clone()) {
            Ok(handles) => {
                info!("Global shortcut support enabled");
                Some(handles)
            }
            Err(e) => {
                error!(error = %e, "Failed to start keyboard listeners");
                listener::print_permission_error();
                None
            }
        }
    } else {
        listener::print_permission_error();
        None
    };

    // Focus watcher feeds app recency and layout-change refreshes;
    // without it activation falls back to apps-order ties
    if let Err(e) = listener::spawn_focus_watcher(sender.clone()) {
        warn!(error = %e, "App activation tracking unavailable");
    }

    let _signal_handle = listener::spawn_signal_listener(sender)?;

    for event in receiver {
        if !controller.handle_event(event) {
            break;
        }
    }

    info!("Shutting down");
    Ok(())
}
