//! Permission bits and the visibility transition.

use serde::{Deserialize, Serialize};

/// Discord permission flags used by curfew.
pub mod bits {
    pub const MANAGE_CHANNELS: u64 = 1 << 4;
    pub const VIEW_CHANNEL: u64 = 1 << 10;
    pub const MANAGE_ROLES: u64 = 1 << 28;
}

/// The flag toggled on the audience role by every flip.
pub const VISIBILITY_BIT: u64 = bits::VIEW_CHANNEL;

/// Whether an overwrite targets a role or a single member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwriteKind {
    Role,
    Member,
}

/// Allow/deny bitmasks attached to a channel for one subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOverwrite {
    pub subject_id: u64,
    pub kind: OverwriteKind,
    pub allow: u64,
    pub deny: u64,
}

impl PermissionOverwrite {
    pub fn role(subject_id: u64, allow: u64, deny: u64) -> Self {
        Self {
            subject_id,
            kind: OverwriteKind::Role,
            allow,
            deny,
        }
    }

    pub fn member(subject_id: u64, allow: u64, deny: u64) -> Self {
        Self {
            subject_id,
            kind: OverwriteKind::Member,
            allow,
            deny,
        }
    }

    pub fn pair(&self) -> PermissionPair {
        PermissionPair {
            allow: self.allow,
            deny: self.deny,
        }
    }
}

/// The allow/deny pair written back for the audience role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionPair {
    pub allow: u64,
    pub deny: u64,
}

impl PermissionPair {
    /// True when this pair hides the channel from its subject.
    pub fn hides(&self) -> bool {
        self.deny & VISIBILITY_BIT != 0
    }
}

/// Find the first overwrite for `subject_id`.
pub fn find_overwrite(
    subject_id: u64,
    overwrites: &[PermissionOverwrite],
) -> Option<&PermissionOverwrite> {
    overwrites.iter().find(|o| o.subject_id == subject_id)
}

/// Compute the next allow/deny pair for the audience role.
///
/// Without an audience overwrite the channel is assumed visible, so the
/// result hides it. Otherwise the view bit is moved to the opposite mask.
/// All other bits are carried through untouched.
pub fn next_visibility(audience_id: u64, overwrites: &[PermissionOverwrite]) -> PermissionPair {
    let Some(current) = find_overwrite(audience_id, overwrites) else {
        return PermissionPair {
            allow: 0,
            deny: VISIBILITY_BIT,
        };
    };

    if current.allow & VISIBILITY_BIT != 0 {
        PermissionPair {
            allow: current.allow & !VISIBILITY_BIT,
            deny: current.deny | VISIBILITY_BIT,
        }
    } else {
        PermissionPair {
            allow: current.allow | VISIBILITY_BIT,
            deny: current.deny & !VISIBILITY_BIT,
        }
    }
}
