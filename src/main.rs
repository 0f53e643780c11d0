// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use qr_scanner::backends::camera::{CameraBackendType, CameraPosition};
use qr_scanner::config::Config;
use qr_scanner::constants::APP_ID;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

mod cli;

#[derive(Parser)]
#[command(name = "qr-scanner")]
#[command(about = "Scan QR codes and barcodes with a camera")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    /// Config file (default: ~/.config/qr-scanner/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use an image file as the camera
    #[arg(long, global = true)]
    image: Option<PathBuf>,

    /// Camera position to use (front, back, external, unspecified or any)
    #[arg(long, global = true)]
    position: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Decode codes in an image file
    Decode {
        /// Image to decode
        image: PathBuf,

        /// Offer to open a decoded URL
        #[arg(long)]
        open: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // The scanner screen owns the terminal, so it logs to a file
    init_logging(cli.command.is_none());

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };
    apply_overrides(&mut config, &cli)?;

    match cli.command {
        Some(Commands::List) => cli::list_cameras(&config),
        Some(Commands::Decode { image, open }) => cli::decode_image(&config, &image, open),
        None => qr_scanner::terminal::run(&config),
    }
}

/// Apply command line options on top of the loaded config
fn apply_overrides(config: &mut Config, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(image) = &cli.image {
        config.backend = CameraBackendType::StillImage;
        config.still_image_path = Some(image.clone());
    }

    if let Some(position) = &cli.position {
        config.camera_position = if position.eq_ignore_ascii_case("any") {
            None
        } else {
            Some(
                CameraPosition::parse(position)
                    .ok_or_else(|| format!("Unknown camera position: {}", position))?,
            )
        };
    }

    Ok(())
}

// Set RUST_LOG environment variable to control log level
// Examples: RUST_LOG=debug, RUST_LOG=qr_scanner=debug, RUST_LOG=info
fn init_logging(to_file: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_file = to_file
        .then(|| dirs::cache_dir().map(|dir| dir.join(APP_ID)))
        .flatten()
        .and_then(|dir| {
            std::fs::create_dir_all(&dir).ok()?;
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(format!("{}.log", APP_ID)))
                .ok()
        });

    match log_file {
        Some(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(true)
            .with_level(true)
            .init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .init(),
    }
}
