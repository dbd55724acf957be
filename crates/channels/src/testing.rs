//! In-memory [`PermissionApi`] for tests.

use std::{
    collections::{BTreeMap, HashSet},
    sync::Mutex,
};

use async_trait::async_trait;

use crate::{
    Error, Result,
    api::PermissionApi,
    permissions::{OverwriteKind, PermissionOverwrite, PermissionPair},
    types::{ChannelKind, ChannelSnapshot},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedWrite {
    pub channel_id: u64,
    pub subject_id: u64,
    pub kind: OverwriteKind,
    pub pair: PermissionPair,
}

#[derive(Debug, thiserror::Error)]
#[error("simulated outage")]
pub struct Outage;

#[derive(Default)]
pub struct FakeApi {
    channels: Mutex<BTreeMap<u64, ChannelSnapshot>>,
    failing_guilds: Mutex<HashSet<u64>>,
    failing_fetches: Mutex<HashSet<u64>>,
    failing_writes: Mutex<HashSet<u64>>,
    writes: Mutex<Vec<RecordedWrite>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, channel: ChannelSnapshot) {
        self.channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(channel.channel_id, channel);
    }

    pub fn remove(&self, channel_id: u64) {
        self.channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&channel_id);
    }

    pub fn channel(&self, channel_id: u64) -> Option<ChannelSnapshot> {
        self.channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&channel_id)
            .cloned()
    }

    pub fn fail_guild(&self, guild_id: u64) {
        self.failing_guilds
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(guild_id);
    }

    pub fn fail_fetch(&self, channel_id: u64) {
        self.failing_fetches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(channel_id);
    }

    pub fn fail_write(&self, channel_id: u64) {
        self.failing_writes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(channel_id);
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl PermissionApi for FakeApi {
    async fn list_guild_channels(&self, guild_id: u64) -> Result<Vec<ChannelSnapshot>> {
        if self
            .failing_guilds
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&guild_id)
        {
            return Err(Error::external("list guild channels", Outage));
        }
        Ok(self
            .channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|c| c.guild_id == guild_id)
            .cloned()
            .collect())
    }

    async fn fetch_channel(&self, channel_id: u64) -> Result<ChannelSnapshot> {
        if self
            .failing_fetches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&channel_id)
        {
            return Err(Error::external("fetch channel", Outage));
        }
        self.channel(channel_id)
            .ok_or_else(|| Error::unknown_channel(channel_id))
    }

    async fn set_overwrite(
        &self,
        channel_id: u64,
        subject_id: u64,
        kind: OverwriteKind,
        pair: PermissionPair,
    ) -> Result<()> {
        if self
            .failing_writes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&channel_id)
        {
            return Err(Error::external("set overwrite", Outage));
        }
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        let channel = channels
            .get_mut(&channel_id)
            .ok_or_else(|| Error::unknown_channel(channel_id))?;
        let overwrite = PermissionOverwrite {
            subject_id,
            kind,
            allow: pair.allow,
            deny: pair.deny,
        };
        match channel
            .overwrites
            .iter()
            .position(|o| o.subject_id == subject_id)
        {
            Some(i) => channel.overwrites[i] = overwrite,
            None => channel.overwrites.push(overwrite),
        }
        drop(channels);

        self.writes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedWrite {
                channel_id,
                subject_id,
                kind,
                pair,
            });
        Ok(())
    }
}

/// A text channel with no overwrites.
pub fn text_channel(guild_id: u64, channel_id: u64) -> ChannelSnapshot {
    ChannelSnapshot {
        guild_id,
        channel_id,
        name: format!("channel-{channel_id}"),
        kind: ChannelKind::Text,
        overwrites: Vec::new(),
    }
}
