//! KonomiTV settings CLI
//!
//! Command-line interface for keeping KonomiTV client settings in sync with
//! the server.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::App;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "konomi")]
#[command(about = "KonomiTV client settings, cached locally and synced with the server")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync settings in the foreground until Ctrl-C
    Run,
    /// Show or change settings
    Settings {
        #[command(subcommand)]
        command: Option<SettingsCommands>,
    },
    /// Pull settings from the server once
    Sync,
    /// Save an access token for the server
    Login {
        /// Access token issued by the server
        token: String,
    },
    /// Forget the saved access token
    Logout,
    /// Show server, login and cache status
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Show all settings, or one
    Show {
        /// Setting name, e.g. panel_display_state
        key: Option<String>,
    },
    /// Change a setting
    Set {
        /// Setting name
        key: String,
        /// New value; JSON (true, 34, ["gr011"]) or a bare string
        value: String,
    },
    /// Discard cached settings and use defaults
    Reset,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, server_url, log_file)
        key: String,
        /// Configuration value ("none" to unset)
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands work on the file itself
    let command = match cli.command {
        Commands::Config { command } => {
            return match command {
                Some(ConfigCommands::Show) | None => commands::config::show(config_path, &output),
                Some(ConfigCommands::Set { key, value }) => {
                    commands::config::set(key, value, config_path, &output)
                }
            };
        }
        command => command,
    };

    let app = App::load(config_path)?;
    let foreground = matches!(command, Commands::Run);
    let log_file = if foreground {
        app.config.log_file.clone()
    } else {
        None
    };
    let log_level = match (cli.verbose, foreground) {
        (true, _) => "debug",
        (false, true) => "info",
        (false, false) => "warn",
    };
    init_logging(log_level, log_file);

    match command {
        Commands::Run => commands::run::run(&app, &output).await,
        Commands::Settings { command } => match command {
            Some(SettingsCommands::Show { key }) => commands::settings::show(&app, key, &output),
            None => commands::settings::show(&app, None, &output),
            Some(SettingsCommands::Set { key, value }) => {
                commands::settings::set(&app, key, value, &output).await
            }
            Some(SettingsCommands::Reset) => commands::settings::reset(&app, &output),
        },
        Commands::Sync => commands::sync::sync(&app, &output).await,
        Commands::Login { token } => commands::auth::login(&app, token, &output),
        Commands::Logout => commands::auth::logout(&app, &output),
        Commands::Status => commands::status::show(&app, &output),
        Commands::Config { .. } => unreachable!("handled above"),
    }
}

/// Set up tracing
///
/// `RUST_LOG` wins when set. Logs go to `log_file` when given, stderr
/// otherwise.
fn init_logging(log_level: &str, log_file: Option<PathBuf>) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "konomi_core={},konomi_cli={}",
            log_level, log_level
        ))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    match log_file {
        Some(path) => match File::create(&path) {
            Ok(file) => {
                let _ = builder
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .try_init();
                info!("Logging to {:?}", path);
            }
            Err(e) => {
                eprintln!("Warning: Could not create log file {:?}: {}", path, e);
                let _ = builder.with_writer(std::io::stderr).try_init();
            }
        },
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}
