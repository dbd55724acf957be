use async_trait::async_trait;

use crate::{
    Result,
    permissions::{OverwriteKind, PermissionPair},
    types::ChannelSnapshot,
};

/// REST operations curfew needs from the chat platform.
#[async_trait]
pub trait PermissionApi: Send + Sync {
    /// List every channel in a guild, with overwrites.
    async fn list_guild_channels(&self, guild_id: u64) -> Result<Vec<ChannelSnapshot>>;

    /// Fetch the current state of a single channel.
    async fn fetch_channel(&self, channel_id: u64) -> Result<ChannelSnapshot>;

    /// Replace the overwrite for `subject_id` on a channel.
    async fn set_overwrite(
        &self,
        channel_id: u64,
        subject_id: u64,
        kind: OverwriteKind,
        pair: PermissionPair,
    ) -> Result<()>;
}
