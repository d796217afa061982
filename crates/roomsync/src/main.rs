// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! roomsync - terminal client for real-time conversations.
//!
//! This is the binary entry point.

mod history;
mod render;
mod signal;
mod watch;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use roomsync_config::{ConfigError, RoomsyncConfig};
use roomsync_core::{ConversationId, DirectoryEntry, InMemoryDirectory};

/// roomsync - follow and take part in a conversation from the terminal.
#[derive(Parser, Debug)]
#[command(name = "roomsync", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Disable colored output.
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Follow a conversation live. Lines read from stdin are sent to it.
    Watch {
        /// Conversation to open.
        conversation: String,

        /// Display name for a sender id, as `ID=NAME`. Repeatable.
        #[arg(long = "alias", value_name = "ID=NAME", value_parser = parse_alias)]
        aliases: Vec<(String, String)>,
    },
    /// Print a conversation's history and exit.
    History {
        /// Conversation to fetch.
        conversation: String,

        /// Print messages as a JSON array.
        #[arg(long)]
        json: bool,

        /// Display name for a sender id, as `ID=NAME`. Repeatable.
        #[arg(long = "alias", value_name = "ID=NAME", value_parser = parse_alias)]
        aliases: Vec<(String, String)>,
    },
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Load and validate configuration, reporting every problem found.
    Check,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let use_color = !cli.plain && std::io::stdout().is_terminal();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            roomsync_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Config {
            action: ConfigCommands::Check,
        } => {
            print_config_summary(&config);
            Ok(())
        }
        Commands::Watch {
            conversation,
            aliases,
        } => {
            init_tracing(&config.client.log_level);
            watch::run_watch(
                config,
                ConversationId::new(conversation),
                directory(aliases),
                use_color,
            )
            .await
        }
        Commands::History {
            conversation,
            json,
            aliases,
        } => {
            init_tracing(&config.client.log_level);
            history::run_history(
                &config,
                ConversationId::new(conversation),
                json,
                &directory(aliases),
                use_color,
            )
            .await
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<RoomsyncConfig, Vec<ConfigError>> {
    match path {
        Some(path) if !path.is_file() => Err(vec![ConfigError::Other(format!(
            "config file `{}` does not exist",
            path.display()
        ))]),
        Some(path) => roomsync_config::load_and_validate_path(path),
        None => roomsync_config::load_and_validate(),
    }
}

fn print_config_summary(config: &RoomsyncConfig) {
    println!("configuration is valid");
    println!("  ws_url:       {}", config.server.ws_url);
    println!("  api_url:      {}", config.server.api_url);
    println!(
        "  token:        {}",
        if config.server.token.is_some() {
            "set"
        } else {
            "not set"
        }
    );
    println!("  max_attempts: {}", config.reconnect.max_attempts);
    println!("  ack_mode:     {:?}", config.delivery.ack_mode);
}

/// Parses an `ID=NAME` alias argument.
fn parse_alias(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((id, name)) if !id.trim().is_empty() && !name.trim().is_empty() => {
            Ok((id.trim().to_string(), name.trim().to_string()))
        }
        _ => Err(format!("expected ID=NAME, got `{raw}`")),
    }
}

fn directory(aliases: Vec<(String, String)>) -> InMemoryDirectory {
    let mut directory = InMemoryDirectory::new();
    for (id, name) in aliases {
        directory.insert(
            id,
            DirectoryEntry {
                display_name: name,
                avatar_url: None,
            },
        );
    }
    directory
}

/// Initialize the tracing subscriber. Logs go to stderr so stdout stays
/// usable for output.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("roomsync={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
