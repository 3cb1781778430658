// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Busline - routes command messages from a publish/subscribe bus to
//! pluggable handlers.
//!
//! This is the binary entry point.

mod check;
mod serve;

use std::path::{Path, PathBuf};

use busline_config::LoadedConfig;
use clap::{Parser, Subcommand};

/// Busline - a command message router for MQTT brokers.
#[derive(Parser, Debug)]
#[command(name = "busline", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to the broker and route command messages until stopped.
    Start {
        /// Path to the config file (default: ./busline.toml, then the user config dir).
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the installation directory and the config file in use.
    Where {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Complete the config and load handlers without connecting.
    Check {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Start { config }) => {
            let loaded = load_config(config.as_deref());
            serve::init_tracing(&loaded.config.logging);
            if let Err(e) = serve::run_start(loaded).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Where { config }) => print_locations(config.as_deref()),
        Some(Commands::Check { config }) => {
            let loaded = load_config(config.as_deref());
            if !check::run_check(&loaded) {
                std::process::exit(1);
            }
        }
        None => {
            println!("busline: use --help for available commands");
        }
    }
}

/// Loads and completes the configuration, exiting with the rendered
/// diagnostics on failure.
fn load_config(explicit: Option<&Path>) -> LoadedConfig {
    match busline_config::load_and_complete(explicit) {
        Ok(loaded) => loaded,
        Err(errors) => {
            busline_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

fn print_locations(explicit: Option<&Path>) {
    let install_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    match install_dir {
        Some(dir) => println!("installation: {}", dir.display()),
        None => println!("installation: unknown"),
    }

    match busline_config::resolve_config_path(explicit) {
        Some(path) => println!("config: {}", path.display()),
        None => match busline_config::default_config_path() {
            Some(path) => println!("config: none (would read {})", path.display()),
            None => println!("config: none (defaults and environment only)"),
        },
    }
}
