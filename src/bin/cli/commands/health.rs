use crate::client::JuggernautClient;
use crate::output::{self, OutputConfig};

/// Checks that the server is up
pub async fn execute(
    client: &JuggernautClient,
    config: &OutputConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let health = client.health().await?;
    output::print_value(&health, config);
    Ok(())
}
