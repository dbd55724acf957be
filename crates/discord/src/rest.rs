//! [`PermissionApi`] over serenity's HTTP client.

use std::sync::Arc;

use {
    async_trait::async_trait,
    serenity::all::{GuildId, Http},
    tracing::debug,
};

use curfew_channels::{
    ChannelSnapshot, Error as ChannelError, OverwriteKind, PermissionApi, PermissionPair,
    Result as ChannelResult,
};

use crate::convert::{channel_id, overwrite_to_serenity, snapshot};

pub struct SerenityPermissionApi {
    http: Arc<Http>,
}

impl SerenityPermissionApi {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl PermissionApi for SerenityPermissionApi {
    async fn list_guild_channels(&self, guild_id: u64) -> ChannelResult<Vec<ChannelSnapshot>> {
        if guild_id == 0 {
            return Err(ChannelError::unavailable("guild id 0 is not a valid snowflake"));
        }
        let channels = GuildId::new(guild_id)
            .channels(&self.http)
            .await
            .map_err(|e| ChannelError::external(format!("list channels of guild {guild_id}"), e))?;
        debug!(guild_id, count = channels.len(), "listed guild channels");
        let mut snapshots: Vec<ChannelSnapshot> = channels.values().map(snapshot).collect();
        snapshots.sort_by_key(|c| c.channel_id);
        Ok(snapshots)
    }

    async fn fetch_channel(&self, id: u64) -> ChannelResult<ChannelSnapshot> {
        let cid = channel_id(id).map_err(|_| ChannelError::unknown_channel(id))?;
        let channel = self
            .http
            .get_channel(cid)
            .await
            .map_err(|e| ChannelError::external(format!("fetch channel {id}"), e))?;
        channel
            .guild()
            .map(|c| snapshot(&c))
            .ok_or_else(|| ChannelError::unknown_channel(id))
    }

    async fn set_overwrite(
        &self,
        id: u64,
        subject_id: u64,
        kind: OverwriteKind,
        pair: PermissionPair,
    ) -> ChannelResult<()> {
        let cid = channel_id(id).map_err(|_| ChannelError::unknown_channel(id))?;
        let overwrite = overwrite_to_serenity(subject_id, kind, pair)
            .map_err(|e| ChannelError::external(format!("build overwrite for channel {id}"), e))?;
        cid.create_permission(&self.http, overwrite)
            .await
            .map_err(|e| ChannelError::external(format!("set overwrite on channel {id}"), e))?;
        debug!(
            channel_id = id,
            subject_id,
            allow = pair.allow,
            deny = pair.deny,
            "permission overwrite written"
        );
        Ok(())
    }
}
