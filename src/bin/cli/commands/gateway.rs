use clap::Subcommand;
use juggernaut::dto::RegisterApiDto;
use std::path::PathBuf;

use super::read_json_file;
use crate::client::JuggernautClient;
use crate::output::{self, OutputConfig};

/// API gateway commands
#[derive(Subcommand, Debug)]
pub enum GatewayCommands {
    /// Register an API described by a JSON file
    Register {
        /// JSON file with `name`, `base_path`, `routes` and optional
        /// `rate_limit` and `auth_config`
        file: PathBuf,
    },
    /// List registered APIs
    List,
    /// Show a registered API
    Get {
        /// The API ID
        id: String,
    },
    /// Remove an API from the gateway
    Unregister {
        /// The API ID
        id: String,
    },
    /// Print the generated documentation for all APIs
    Docs,
    /// Check the gateway
    Health,
}

/// Executes a gateway command
pub async fn execute(
    client: &JuggernautClient,
    cmd: GatewayCommands,
    config: &OutputConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        GatewayCommands::Register { file } => {
            let dto: RegisterApiDto = read_json_file(&file)?;
            let ack = client.register_api(&dto).await?;
            output::print_api_ack(&ack, config);
        }
        GatewayCommands::List => {
            let apis = client.list_apis().await?;
            output::print_apis(&apis, config);
        }
        GatewayCommands::Get { id } => {
            let api = client.get_api(&id).await?;
            output::print_api(&api, config);
        }
        GatewayCommands::Unregister { id } => {
            let ack = client.unregister_api(&id).await?;
            output::print_api_ack(&ack, config);
        }
        GatewayCommands::Docs => {
            let docs = client.api_docs().await?;
            output::print_value(&docs, config);
        }
        GatewayCommands::Health => {
            let health = client.gateway_health().await?;
            output::print_value(&health, config);
        }
    }
    Ok(())
}
