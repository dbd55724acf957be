//! Discord event handler for serenity.
//!
//! Translates gateway events into [`GatewayBridge`] calls.

use std::sync::Arc;

use {
    serenity::{
        all::{Context, EventHandler, GuildChannel, Message, Ready},
        async_trait,
    },
    tracing::{debug, info, warn},
};

use curfew_channels::GatewayBridge;

use crate::{convert::snapshot, rest::SerenityPermissionApi};

/// Handler for Discord gateway events.
pub struct CurfewHandler {
    bridge: Arc<GatewayBridge>,
}

impl CurfewHandler {
    pub fn new(bridge: Arc<GatewayBridge>) -> Self {
        Self { bridge }
    }

    async fn reevaluate(&self, channel: &GuildChannel, event: &'static str) {
        let snapshot = snapshot(channel);
        match self.bridge.on_channel_update(&snapshot).await {
            Ok(verdict) => debug!(
                event,
                channel_id = snapshot.channel_id,
                manageable = verdict.is_manageable(),
                "channel event handled"
            ),
            Err(e) => warn!(
                event,
                channel_id = snapshot.channel_id,
                error = %e,
                "failed to handle channel event"
            ),
        }
    }
}

#[async_trait]
impl EventHandler for CurfewHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            "discord bot ready"
        );

        let api = SerenityPermissionApi::new(Arc::clone(&ctx.http));
        let guild_ids: Vec<u64> = ready.guilds.iter().map(|g| g.id.get()).collect();
        match self
            .bridge
            .on_ready(&api, ready.user.id.get(), &guild_ids)
            .await
        {
            Ok(summary) => info!(
                guilds = summary.guilds,
                failed_guilds = summary.failed_guilds,
                managed = summary.managed,
                "startup channel scan complete"
            ),
            Err(e) => warn!(error = %e, "startup channel scan failed"),
        }
    }

    async fn channel_create(&self, _ctx: Context, channel: GuildChannel) {
        self.reevaluate(&channel, "channel_create").await;
    }

    async fn channel_update(&self, _ctx: Context, _old: Option<GuildChannel>, new: GuildChannel) {
        self.reevaluate(&new, "channel_update").await;
    }

    async fn channel_delete(
        &self,
        _ctx: Context,
        channel: GuildChannel,
        _messages: Option<Vec<Message>>,
    ) {
        let channel_id = channel.id.get();
        if let Err(e) = self.bridge.on_channel_delete(channel_id).await {
            warn!(channel_id, error = %e, "failed to handle channel delete");
        }
    }
}
