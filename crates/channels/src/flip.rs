//! One visibility flip across every managed channel.

use std::time::Instant;

use {
    serde::Serialize,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use curfew_metrics::{counter, flip as flip_metrics, histogram};

use crate::{
    Result,
    api::PermissionApi,
    permissions::{OverwriteKind, PermissionPair, next_visibility},
    registry::ManagedChannelRegistry,
    types::ManagedChannel,
};

/// Outcome counts for a single flip pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlipReport {
    pub total: usize,
    pub hidden: usize,
    pub shown: usize,
    pub failed: usize,
}

/// Flip the audience role's visibility on every channel in a registry snapshot.
///
/// Channels are handled one at a time; a failure is logged and the pass moves
/// on. Channels removed from the registry after the snapshot was taken are
/// still attempted.
pub async fn run_flip_pass(
    api: &dyn PermissionApi,
    registry: &ManagedChannelRegistry,
) -> FlipReport {
    let started = Instant::now();
    let members = registry.snapshot();
    let mut report = FlipReport {
        total: members.len(),
        ..Default::default()
    };

    #[cfg(feature = "metrics")]
    counter!(flip_metrics::PASSES_TOTAL).increment(1);

    debug!(count = report.total, "starting flip pass");

    for channel in members {
        match flip_channel(api, channel).await {
            Ok(pair) if pair.hides() => {
                report.hidden += 1;
                debug!(channel_id = channel.channel_id, "channel hidden");
            },
            Ok(_) => {
                report.shown += 1;
                debug!(channel_id = channel.channel_id, "channel shown");
            },
            Err(e) => {
                report.failed += 1;
                warn!(
                    guild_id = channel.guild_id,
                    channel_id = channel.channel_id,
                    error = %e,
                    "failed to update channel permission"
                );
            },
        }
    }

    #[cfg(feature = "metrics")]
    {
        counter!(flip_metrics::CHANNELS_HIDDEN_TOTAL).increment(report.hidden as u64);
        counter!(flip_metrics::CHANNELS_SHOWN_TOTAL).increment(report.shown as u64);
        counter!(flip_metrics::CHANNEL_ERRORS_TOTAL).increment(report.failed as u64);
        histogram!(flip_metrics::PASS_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
    }

    info!(
        total = report.total,
        hidden = report.hidden,
        shown = report.shown,
        failed = report.failed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "flip pass finished"
    );
    report
}

/// Read the channel's current overwrites and write the flipped audience pair.
pub async fn flip_channel(api: &dyn PermissionApi, channel: ManagedChannel) -> Result<PermissionPair> {
    let current = api.fetch_channel(channel.channel_id).await?;
    let audience = channel.audience_role_id();
    let pair = next_visibility(audience, &current.overwrites);
    api.set_overwrite(channel.channel_id, audience, OverwriteKind::Role, pair)
        .await?;
    Ok(pair)
}
