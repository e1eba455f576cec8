use clap::Subcommand;
use juggernaut::dto::RegisterPluginDto;

use super::parse_json_arg;
use crate::client::JuggernautClient;
use crate::output::{self, OutputConfig};

/// Plugin registry commands
#[derive(Subcommand, Debug)]
pub enum PluginCommands {
    /// List all registered plugins
    List,
    /// Register a new plugin
    Register {
        /// Display name; the id is derived from it
        #[clap(long)]
        name: String,
        /// What the plugin does
        #[clap(long, default_value = "")]
        description: String,
        /// Plugin version
        #[clap(long)]
        version: String,
        /// Endpoint path served by the plugin (repeatable)
        #[clap(long = "endpoint")]
        endpoints: Vec<String>,
        /// Register the plugin disabled
        #[clap(long)]
        disabled: bool,
        /// Plugin configuration as a JSON object
        #[clap(long)]
        config: Option<String>,
    },
    /// Show a plugin
    Get {
        /// The plugin ID
        id: String,
    },
    /// Remove a plugin from the registry
    Unregister {
        /// The plugin ID
        id: String,
    },
}

/// Executes a plugin command
pub async fn execute(
    client: &JuggernautClient,
    cmd: PluginCommands,
    config: &OutputConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        PluginCommands::List => {
            let plugins = client.list_plugins().await?;
            output::print_plugins(&plugins, config);
        }
        PluginCommands::Register {
            name,
            description,
            version,
            endpoints,
            disabled,
            config: plugin_config,
        } => {
            let plugin_config = match plugin_config {
                Some(text) => parse_json_arg("config", &text)?,
                None => serde_json::json!({}),
            };
            let dto = RegisterPluginDto {
                name,
                description,
                version,
                enabled: !disabled,
                endpoints,
                config: plugin_config,
            };
            let plugin = client.register_plugin(&dto).await?;
            output::print_plugin(&plugin, config);
        }
        PluginCommands::Get { id } => {
            let plugin = client.get_plugin(&id).await?;
            output::print_plugin(&plugin, config);
        }
        PluginCommands::Unregister { id } => {
            let message = client.unregister_plugin(&id).await?;
            output::print_success(&message, config);
        }
    }
    Ok(())
}
