use std::sync::Arc;

use {
    serenity::all::{Client, GatewayIntents},
    tracing::debug,
};

use curfew_channels::GatewayBridge;

use crate::{Result, handler::CurfewHandler};

/// Gateway intents curfew needs: guild and channel lifecycle events only.
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
}

/// Build a gateway client whose events feed `bridge`. The connection is
/// opened by `Client::start`.
pub async fn build_client(token: &str, bridge: Arc<GatewayBridge>) -> Result<Client> {
    let client = Client::builder(token, intents())
        .event_handler(CurfewHandler::new(bridge))
        .await?;
    debug!("discord client built");
    Ok(client)
}
