use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use focuscase_core::bluetooth::BleDriver;
use focuscase_core::config::default_data_dir;
use focuscase_core::contacts::resolution_error;
use focuscase_core::{
    AppMode, ConfigStore, ConnectionEvent, ContactResolver, FocusCore, JsonConfigStore, ModeEvent,
    Profile, ProfileStore, SurfaceHandle,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "focuscase")]
#[command(about = "Companion daemon for the focus-switch phone case")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Set data directory
    #[arg(long)]
    data_dir: Option<String>,

    /// ISO country code phone numbers are canonicalized against
    #[arg(long, default_value = "US")]
    region: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the case and run interactively
    Run,
    /// Scan for nearby devices to pair with
    Pair,
    /// Show the current app mode
    Mode,
    /// Screen a number against the stored profile (offline)
    Screen {
        /// The incoming number to check
        number: String,
    },
}

/// Profiles as edited by the user, stored next to the settings file.
#[derive(Debug, Deserialize)]
struct ProfileFile {
    active: Option<String>,
    #[serde(default)]
    profiles: Vec<Profile>,
}

/// Profile store backed by profiles.json in the data directory. Re-read
/// on every query so edits take effect on the next reload.
struct JsonProfileStore {
    path: PathBuf,
}

impl JsonProfileStore {
    fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("profiles.json"),
        }
    }
}

impl ProfileStore for JsonProfileStore {
    fn active_profile(&self) -> Option<Profile> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        let file: ProfileFile = serde_json::from_str(&content).ok()?;
        let active = file.active?;
        file.profiles.into_iter().find(|p| p.id == active)
    }
}

/// Contact resolver backed by contacts.json: a map from contact id to
/// phone numbers, standing in for the platform address book.
struct FileContactResolver {
    path: PathBuf,
}

impl FileContactResolver {
    fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("contacts.json"),
        }
    }
}

impl ContactResolver for FileContactResolver {
    fn phone_numbers(&self, contact_id: &str) -> focuscase_core::Result<Vec<String>> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| resolution_error(contact_id, e.to_string()))?;
        let book: HashMap<String, Vec<String>> = serde_json::from_str(&content)
            .map_err(|e| resolution_error(contact_id, e.to_string()))?;
        book.get(contact_id)
            .cloned()
            .ok_or_else(|| resolution_error(contact_id, "not in contacts.json"))
    }
}

/// Headless stand-in for raising the phone UI on focus entry.
struct LogSurface;

impl SurfaceHandle for LogSurface {
    fn bring_to_front(&self) {
        println!("🎯 Focus engaged");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    let data_dir = cli
        .data_dir
        .map(PathBuf::from)
        .unwrap_or_else(default_data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;

    info!("Starting focuscase with data dir: {}", data_dir.display());

    match cli.command {
        Some(Commands::Run) | None => run_interactive(&data_dir, &cli.region).await,
        Some(Commands::Pair) => run_pairing(&data_dir, &cli.region).await,
        Some(Commands::Mode) => show_mode(&data_dir),
        Some(Commands::Screen { number }) => screen_number(&data_dir, &cli.region, &number).await,
    }
}

fn build_core(data_dir: &Path, region: &str) -> Result<Arc<FocusCore>> {
    let config = JsonConfigStore::open(data_dir.join("settings.json"))?;
    let core = FocusCore::new(
        Arc::new(config),
        Arc::new(JsonProfileStore::new(data_dir)),
        Arc::new(FileContactResolver::new(data_dir)),
        region,
    )
    .with_surface(Arc::new(LogSurface));
    Ok(Arc::new(core))
}

/// Start the core and attach the platform BLE driver to it.
async fn start_with_driver(core: &Arc<FocusCore>) -> Result<()> {
    core.start().await?;
    let commands = core
        .take_link_commands()
        .context("link command stream already taken")?;
    let driver = BleDriver::new(core.link_event_sender()).await?;
    tokio::spawn(driver.run(commands));
    Ok(())
}

async fn run_interactive(data_dir: &Path, region: &str) -> Result<()> {
    println!("📱 focuscase - smart case companion");
    println!("Data: {}", data_dir.display());
    println!("Type /help for commands, /quit to exit\n");

    let core = build_core(data_dir, region)?;
    let mut events = core
        .take_connection_events()
        .context("event stream already taken")?;
    let mut modes = core.subscribe_mode_events();
    start_with_driver(&core).await?;

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    print!("> ");
    io::stdout().flush()?;

    loop {
        tokio::select! {
            event = events.recv() => {
                if let Some(event) = event {
                    print_connection_event(&event);
                    print!("> ");
                    io::stdout().flush()?;
                }
            }
            mode = modes.recv() => {
                if let Ok(ModeEvent::ModeChanged(mode)) = mode {
                    match mode {
                        AppMode::Focus => println!("🔕 Focus mode on - screening calls"),
                        AppMode::Normal => println!("🔔 Normal mode - all calls through"),
                    }
                    print!("> ");
                    io::stdout().flush()?;
                }
            }
            line = lines.next_line() => {
                if let Ok(Some(line)) = line {
                    let line = line.trim();
                    if line.is_empty() {
                        print!("> ");
                        io::stdout().flush()?;
                        continue;
                    }
                    match handle_command(&core, line).await {
                        Ok(true) => break,
                        Ok(false) => {}
                        Err(e) => println!("Command error: {}", e),
                    }
                    print!("> ");
                    io::stdout().flush()?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    core.disconnect()?;
    println!("👋 Goodbye!");
    Ok(())
}

fn print_connection_event(event: &ConnectionEvent) {
    match event {
        ConnectionEvent::DeviceFound { name, address } => {
            println!(
                "🔍 Found: {} [{}]",
                name.as_deref().unwrap_or("Unnamed"),
                address
            );
        }
        ConnectionEvent::ConnectionStatus { message, is_connected } => {
            let icon = if *is_connected { "🔗" } else { "📡" };
            println!("{} {}", icon, message);
        }
        ConnectionEvent::Trigger(_) => {}
    }
}

async fn handle_command(core: &Arc<FocusCore>, command: &str) -> Result<bool> {
    let parts: Vec<&str> = command.split_whitespace().collect();
    if parts.is_empty() {
        return Ok(false);
    }

    match parts[0] {
        "/help" | "/h" => {
            println!("Commands:");
            println!("  /help, /h          - Show this help");
            println!("  /quit, /q          - Exit");
            println!("  /pair              - Scan for nearby devices");
            println!("  /connect <addr>    - Connect to a scanned device");
            println!("  /disconnect        - Tear the link down");
            println!("  /mode              - Show the current app mode");
            println!("  /screen <number>   - Check how a call would be handled");
            println!("  /reload            - Re-read the active profile");
        }
        "/quit" | "/q" => {
            println!("Shutting down...");
            return Ok(true);
        }
        "/pair" => {
            core.start_pairing_scan()?;
            println!("Scanning for devices for 10 seconds...");
        }
        "/connect" => {
            if parts.len() != 2 {
                println!("Usage: /connect <address>");
                return Ok(false);
            }
            core.connect_to(parts[1])?;
        }
        "/disconnect" => {
            core.disconnect()?;
        }
        "/mode" => {
            println!("Current mode: {:?}", core.current_mode());
            println!("Call blocking active: {}", core.blocking_active());
        }
        "/screen" => {
            if parts.len() != 2 {
                println!("Usage: /screen <number>");
                return Ok(false);
            }
            let response = core.screen_call(parts[1]);
            if response.is_blocked() {
                println!("🚫 {} would be blocked", parts[1]);
            } else {
                println!("✅ {} would ring through", parts[1]);
            }
        }
        "/reload" => {
            core.reload_profile().await?;
            println!("Profile reloaded");
        }
        _ => {
            println!(
                "Unknown command: {}. Type /help for available commands.",
                parts[0]
            );
        }
    }

    Ok(false)
}

async fn run_pairing(data_dir: &Path, region: &str) -> Result<()> {
    let core = build_core(data_dir, region)?;
    let mut events = core
        .take_connection_events()
        .context("event stream already taken")?;
    start_with_driver(&core).await?;

    core.start_pairing_scan()?;
    println!("Scanning for devices...");

    while let Some(event) = events.recv().await {
        match event {
            ConnectionEvent::DeviceFound { name, address } => {
                println!("  {} [{}]", name.as_deref().unwrap_or("Unnamed"), address);
            }
            ConnectionEvent::ConnectionStatus { message, .. } if message == "Scan finished." => {
                break;
            }
            _ => {}
        }
    }
    println!("Done. Use `focuscase run` and /connect <address> to pair.");
    Ok(())
}

fn show_mode(data_dir: &Path) -> Result<()> {
    let config = JsonConfigStore::open(data_dir.join("settings.json"))?;
    println!("Current mode: {:?}", config.app_mode());
    if let Some(address) = config.last_peripheral_address() {
        println!("Last case: {}", address);
    }
    Ok(())
}

/// Offline screening check: no Bluetooth, just the persisted mode, the
/// active profile, and the contacts file.
async fn screen_number(data_dir: &Path, region: &str, number: &str) -> Result<()> {
    let core = build_core(data_dir, region)?;
    core.start().await?;

    let response = core.screen_call(number);
    println!("Mode: {:?}", core.current_mode());
    if response.is_blocked() {
        println!("🚫 {} would be blocked (rejected, no log, no notification)", number);
    } else {
        println!("✅ {} would ring through", number);
    }
    Ok(())
}
