//! Managed channel tracking and visibility flipping.
//!
//! The gateway bridge evaluates channel events against the bot's own
//! permission overwrite and publishes registry updates; the flip pass reads
//! a registry snapshot and toggles the audience role's view permission on
//! every managed channel through a [`PermissionApi`].

pub mod api;
pub mod bridge;
pub mod eligibility;
pub mod error;
pub mod flip;
pub mod permissions;
pub mod registry;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use {
    api::PermissionApi,
    bridge::{GatewayBridge, ReadySummary},
    eligibility::{Verdict, evaluate, is_manageable},
    error::{Error, Result},
    flip::{FlipReport, run_flip_pass},
    permissions::{OverwriteKind, PermissionOverwrite, PermissionPair, next_visibility},
    registry::{ManagedChannelRegistry, RegistryUpdate, run_update_loop, update_queue},
    types::{ChannelKind, ChannelSnapshot, ManagedChannel},
};
