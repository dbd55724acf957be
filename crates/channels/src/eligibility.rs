//! Decide whether the bot may manage a channel.
//!
//! A channel qualifies when it is a plain text channel and the bot's own
//! member overwrite grants every bit in [`REQUIRED_PERMISSIONS`]. Role-based
//! grants are not considered.

use crate::{
    permissions::{PermissionOverwrite, bits, find_overwrite},
    types::{ChannelKind, ChannelSnapshot},
};

/// Bits the bot's overwrite must allow.
pub const REQUIRED_PERMISSIONS: u64 =
    bits::MANAGE_CHANNELS | bits::MANAGE_ROLES | bits::VIEW_CHANNEL;

/// Outcome of an eligibility check, with the reason for a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Manageable,
    NotText(ChannelKind),
    NoBotOverwrite,
    MissingPermissions { missing: u64 },
}

impl Verdict {
    pub fn is_manageable(&self) -> bool {
        matches!(self, Self::Manageable)
    }
}

/// Evaluate a channel's kind and overwrites for the bot identified by `bot_id`.
pub fn verdict(bot_id: u64, kind: ChannelKind, overwrites: &[PermissionOverwrite]) -> Verdict {
    if kind != ChannelKind::Text {
        return Verdict::NotText(kind);
    }
    let Some(own) = find_overwrite(bot_id, overwrites) else {
        return Verdict::NoBotOverwrite;
    };
    let missing = REQUIRED_PERMISSIONS & !own.allow;
    if missing != 0 {
        return Verdict::MissingPermissions { missing };
    }
    Verdict::Manageable
}

pub fn is_manageable(bot_id: u64, kind: ChannelKind, overwrites: &[PermissionOverwrite]) -> bool {
    verdict(bot_id, kind, overwrites).is_manageable()
}

/// Shorthand for [`verdict`] over a snapshot.
pub fn evaluate(bot_id: u64, channel: &ChannelSnapshot) -> Verdict {
    verdict(bot_id, channel.kind, &channel.overwrites)
}
