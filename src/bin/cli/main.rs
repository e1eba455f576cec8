mod client;
mod commands;
mod output;

use clap::{Parser, Subcommand};
use client::JuggernautClient;
use juggernaut::config;
use output::{OutputConfig, OutputFormat};
use std::process;

/// CLI for the Juggernaut automation bot
#[derive(Parser, Debug)]
#[clap(name = "juggernaut-cli", about = "CLI for the Juggernaut automation bot")]
struct Cli {
    /// Server URL to connect to
    #[clap(long, env = "JUGGERNAUT_URL", global = true)]
    server_url: Option<String>,

    /// Output format
    #[clap(long, value_enum, default_value_t = OutputFormat::Human, global = true)]
    format: OutputFormat,

    /// Quiet mode: minimal output (just IDs or counts)
    #[clap(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that the server is up
    Health,
    /// Manage registered plugins
    #[command(subcommand)]
    Plugin(commands::plugin::PluginCommands),
    /// Publish events
    #[command(subcommand)]
    Event(commands::event::EventCommands),
    /// Manage and run RPA tasks
    #[command(subcommand)]
    Task(commands::task::TaskCommands),
    /// Manage APIs registered with the gateway
    #[command(subcommand)]
    Gateway(commands::gateway::GatewayCommands),
    /// Validate and query a requirements manifest (offline)
    #[command(subcommand)]
    Manifest(commands::manifest::ManifestCommands),
}

/// Formats an error for human-readable stderr output
fn format_error(err: &dyn std::error::Error) -> String {
    let err_string = err.to_string();

    // ClientError::Request wraps reqwest errors, check for connection issues
    if err_string.contains("error sending request")
        || err_string.contains("connection refused")
        || err_string.contains("Connection refused")
        || err_string.contains("tcp connect error")
    {
        return format!(
            "Could not connect to server. Is juggernaut running?\n  {}",
            err_string
        );
    }

    // ClientError::Server already formats as "Server error (STATUS): message"
    err_string
}

/// Builds a client for the configured server
fn connect(server_url: Option<String>) -> JuggernautClient {
    JuggernautClient::new(config::resolve_server_url(server_url))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let output_config = OutputConfig {
        format: cli.format,
        quiet: cli.quiet,
    };

    let result = match cli.command {
        Commands::Manifest(cmd) => commands::manifest::execute(cmd, &output_config),
        Commands::Health => commands::health::execute(&connect(cli.server_url), &output_config).await,
        Commands::Plugin(cmd) => {
            commands::plugin::execute(&connect(cli.server_url), cmd, &output_config).await
        }
        Commands::Event(cmd) => {
            commands::event::execute(&connect(cli.server_url), cmd, &output_config).await
        }
        Commands::Task(cmd) => {
            commands::task::execute(&connect(cli.server_url), cmd, &output_config).await
        }
        Commands::Gateway(cmd) => {
            commands::gateway::execute(&connect(cli.server_url), cmd, &output_config).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", format_error(e.as_ref()));
        process::exit(1);
    }
}
