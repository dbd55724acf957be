//! Mapping between serenity models and the platform-independent channel types.

use serenity::all::{
    ChannelId, ChannelType, GuildChannel, PermissionOverwrite as SerenityOverwrite,
    PermissionOverwriteType, Permissions, RoleId, UserId,
};

use curfew_channels::{
    ChannelKind, ChannelSnapshot, OverwriteKind, PermissionOverwrite, PermissionPair,
};

use crate::error::{Error, Result};

pub fn channel_kind(kind: ChannelType) -> ChannelKind {
    match kind {
        ChannelType::Text => ChannelKind::Text,
        ChannelType::Voice => ChannelKind::Voice,
        ChannelType::Category => ChannelKind::Category,
        ChannelType::News => ChannelKind::Announcement,
        ChannelType::Stage => ChannelKind::Stage,
        ChannelType::Forum => ChannelKind::Forum,
        _ => ChannelKind::Other,
    }
}

/// Returns `None` for overwrite subjects serenity does not model.
pub fn overwrite_from_serenity(overwrite: &SerenityOverwrite) -> Option<PermissionOverwrite> {
    let allow = overwrite.allow.bits();
    let deny = overwrite.deny.bits();
    match overwrite.kind {
        PermissionOverwriteType::Role(id) => Some(PermissionOverwrite::role(id.get(), allow, deny)),
        PermissionOverwriteType::Member(id) => {
            Some(PermissionOverwrite::member(id.get(), allow, deny))
        },
        _ => None,
    }
}

pub fn overwrite_to_serenity(
    subject_id: u64,
    kind: OverwriteKind,
    pair: PermissionPair,
) -> Result<SerenityOverwrite> {
    if subject_id == 0 {
        return Err(Error::InvalidId { id: subject_id });
    }
    let kind = match kind {
        OverwriteKind::Role => PermissionOverwriteType::Role(RoleId::new(subject_id)),
        OverwriteKind::Member => PermissionOverwriteType::Member(UserId::new(subject_id)),
    };
    Ok(SerenityOverwrite {
        allow: Permissions::from_bits_truncate(pair.allow),
        deny: Permissions::from_bits_truncate(pair.deny),
        kind,
    })
}

pub fn snapshot(channel: &GuildChannel) -> ChannelSnapshot {
    ChannelSnapshot {
        guild_id: channel.guild_id.get(),
        channel_id: channel.id.get(),
        name: channel.name.clone(),
        kind: channel_kind(channel.kind),
        overwrites: channel
            .permission_overwrites
            .iter()
            .filter_map(overwrite_from_serenity)
            .collect(),
    }
}

/// Snowflakes are never zero; serenity's id constructors panic on it.
pub fn channel_id(id: u64) -> Result<ChannelId> {
    if id == 0 {
        return Err(Error::InvalidId { id });
    }
    Ok(ChannelId::new(id))
}
