use clap::Subcommand;
use juggernaut::dto::PublishEventDto;

use super::parse_json_arg;
use crate::client::JuggernautClient;
use crate::output::{self, OutputConfig};

/// Event bus commands
#[derive(Subcommand, Debug)]
pub enum EventCommands {
    /// Publish an event to every subscriber
    Publish {
        /// Event type, e.g. `mail.received`
        event_type: String,
        /// Name of the publisher
        #[clap(long, default_value = "cli")]
        source: String,
        /// Payload as a JSON object
        #[clap(long, default_value = "{}")]
        data: String,
    },
}

/// Executes an event command
pub async fn execute(
    client: &JuggernautClient,
    cmd: EventCommands,
    config: &OutputConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        EventCommands::Publish { event_type, source, data } => {
            let dto = PublishEventDto {
                event_type: event_type.clone(),
                source,
                data: parse_json_arg("data", &data)?,
            };
            let response = client.publish_event(&dto).await?;
            match config.format {
                output::OutputFormat::Json => output::print_value(&response, config),
                output::OutputFormat::Human => {
                    output::print_success(&format!("Published {}", event_type), config)
                }
            }
        }
    }
    Ok(())
}
