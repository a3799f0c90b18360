//! Offline administration of the bridge's registrations.
//!
//! Usage:
//!   bridge-admin list
//!   bridge-admin sensors <device-id>
//!   bridge-admin remove <device-id>
//!
//! Takes the same instance lock as the server, so it refuses to run while a
//! bridge is using the data directory.

use clap::{Parser, Subcommand};
use desktop_app_bridge::Hub;
use desktop_app_bridge::config::{Config, load_dotenv};
use desktop_app_bridge::instance_lock::InstanceLock;
use desktop_app_bridge::sensors::SensorKind;
use desktop_app_bridge::storage::JsonFileStore;
use std::path::PathBuf;
use strum::IntoEnumIterator;

#[derive(Parser)]
#[command(name = "bridge-admin")]
#[command(about = "Inspect and manage desktop app registrations")]
struct Cli {
    /// Data directory of the bridge
    #[arg(long, env = "BRIDGE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registrations and removed device ids
    List,
    /// List the sensors registered by a device
    Sensors {
        /// Device id
        device_id: String,
    },
    /// Remove a registration and revoke its webhook
    Remove {
        /// Device id
        device_id: String,
    },
}

fn main() {
    load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir;
    }

    if let Err(e) = run(&config, cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(config: &Config, command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    let _lock = InstanceLock::acquire(&config.storage.data_dir)?;
    let hub = Hub::load(JsonFileStore::new(config.storage.snapshot_path()))?;

    match command {
        Commands::List => {
            let registrations = hub.registrations();
            if registrations.is_empty() {
                println!("No registered devices.");
            }
            for r in &registrations {
                println!(
                    "{:<24} {:<24} {} {}  webhook {}",
                    r.device_id,
                    r.device_name,
                    r.os_name.as_deref().unwrap_or("-"),
                    r.registered_at.format("%Y-%m-%d %H:%M"),
                    r.secret_handle.redacted()
                );
            }

            let deleted = hub.deleted_ids();
            if !deleted.is_empty() {
                println!();
                println!("Removed: {}", deleted.join(", "));
            }
        }
        Commands::Sensors { device_id } => {
            if hub.registration(&device_id).is_none() {
                println!("Device {} is not registered.", device_id);
            }
            for kind in SensorKind::iter() {
                for sensor in hub.sensors_for(&device_id, kind) {
                    println!(
                        "{:<14} {:<24} {:<24} {}",
                        kind,
                        sensor.sensor_unique_id,
                        sensor.display_name,
                        sensor.unit.as_deref().unwrap_or("")
                    );
                }
            }
        }
        Commands::Remove { device_id } => {
            if hub.remove_device(&device_id)? {
                println!("Removed {}; its webhook no longer works.", device_id);
            } else {
                println!("Device {} was not registered.", device_id);
            }
        }
    }
    Ok(())
}
