use serde::{Deserialize, Serialize};

use crate::permissions::PermissionOverwrite;

/// A channel the bot is authorized to manage.
///
/// Identity is the channel id; the guild id doubles as the audience role id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManagedChannel {
    pub guild_id: u64,
    pub channel_id: u64,
}

impl ManagedChannel {
    pub fn new(guild_id: u64, channel_id: u64) -> Self {
        Self {
            guild_id,
            channel_id,
        }
    }

    /// Id of the `@everyone` role, which shares the guild's id.
    pub fn audience_role_id(&self) -> u64 {
        self.guild_id
    }
}

/// Guild channel type, reduced to what eligibility needs to distinguish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    #[default]
    Text,
    Voice,
    Category,
    Announcement,
    Stage,
    Forum,
    Other,
}

/// Platform-independent view of a guild channel and its overwrites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    pub guild_id: u64,
    pub channel_id: u64,
    #[serde(default)]
    pub name: String,
    pub kind: ChannelKind,
    #[serde(default)]
    pub overwrites: Vec<PermissionOverwrite>,
}

impl ChannelSnapshot {
    pub fn managed(&self) -> ManagedChannel {
        ManagedChannel::new(self.guild_id, self.channel_id)
    }
}
