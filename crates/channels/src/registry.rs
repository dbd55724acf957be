//! Registry of channels the bot currently manages.
//!
//! All mutations and snapshots go through a single mutex around an ordered
//! map keyed by channel id, so no reader ever sees a half-applied update.
//! Gateway handlers do not touch the registry directly: they publish
//! [`RegistryUpdate`]s onto the queue drained by [`run_update_loop`].

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

use {
    tokio::sync::{mpsc, watch},
    tracing::{debug, info},
};

#[cfg(feature = "metrics")]
use curfew_metrics::{counter, gauge, labels, registry as registry_metrics};

use crate::types::ManagedChannel;

/// Default capacity of the update queue between the gateway and the registry.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// A change published by the gateway bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryUpdate {
    /// Replace the whole registry with the result of a startup scan.
    Seed(Vec<ManagedChannel>),
    /// The channel passed its latest eligibility check.
    Eligible(ManagedChannel),
    /// The channel failed its latest eligibility check or was deleted.
    Ineligible { channel_id: u64 },
}

impl RegistryUpdate {
    fn kind(&self) -> &'static str {
        match self {
            Self::Seed(_) => "seed",
            Self::Eligible(_) => "eligible",
            Self::Ineligible { .. } => "ineligible",
        }
    }
}

#[derive(Debug)]
pub struct ManagedChannelRegistry {
    channels: Mutex<BTreeMap<u64, ManagedChannel>>,
    seeded: watch::Sender<bool>,
}

impl Default for ManagedChannelRegistry {
    fn default() -> Self {
        Self {
            channels: Mutex::new(BTreeMap::new()),
            seeded: watch::Sender::new(false),
        }
    }
}

impl ManagedChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // The map stays consistent even if a holder panicked: every critical
    // section is a single map operation.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<u64, ManagedChannel>> {
        self.channels.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add `channel` unless its id is already present. Returns true if added.
    pub fn upsert(&self, channel: ManagedChannel) -> bool {
        let mut channels = self.lock();
        if channels.contains_key(&channel.channel_id) {
            return false;
        }
        channels.insert(channel.channel_id, channel);
        record_size(channels.len());
        true
    }

    /// Remove a channel by id. Returns true if it was present.
    pub fn remove(&self, channel_id: u64) -> bool {
        let mut channels = self.lock();
        let removed = channels.remove(&channel_id).is_some();
        if removed {
            record_size(channels.len());
        }
        removed
    }

    /// Point-in-time copy of the members, ordered by channel id.
    pub fn snapshot(&self) -> Vec<ManagedChannel> {
        self.lock().values().copied().collect()
    }

    /// Replace all members. Duplicate ids keep their first occurrence.
    pub fn seed(&self, seeded: impl IntoIterator<Item = ManagedChannel>) -> usize {
        let mut next = BTreeMap::new();
        for channel in seeded {
            next.entry(channel.channel_id).or_insert(channel);
        }
        let mut channels = self.lock();
        *channels = next;
        record_size(channels.len());
        let count = channels.len();
        drop(channels);
        self.seeded.send_replace(true);
        count
    }

    /// Whether a seed has been applied yet.
    pub fn is_seeded(&self) -> bool {
        *self.seeded.borrow()
    }

    /// Resolves once the first seed has been applied.
    pub async fn wait_seeded(&self) {
        let mut seeded = self.seeded.subscribe();
        // The sender lives in `self`, so it cannot close while we wait.
        let _ = seeded.wait_for(|done| *done).await;
    }

    pub fn contains(&self, channel_id: u64) -> bool {
        self.lock().contains_key(&channel_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Apply one update. Returns true if the registry changed.
    pub fn apply(&self, update: RegistryUpdate) -> bool {
        let kind = update.kind();
        #[cfg(feature = "metrics")]
        counter!(registry_metrics::UPDATES_TOTAL, labels::KIND => kind).increment(1);

        let changed = match update {
            RegistryUpdate::Seed(channels) => {
                let count = self.seed(channels);
                info!(count, "managed channel registry seeded");
                true
            },
            RegistryUpdate::Eligible(channel) => {
                let added = self.upsert(channel);
                if added {
                    info!(
                        guild_id = channel.guild_id,
                        channel_id = channel.channel_id,
                        "channel is now managed"
                    );
                }
                added
            },
            RegistryUpdate::Ineligible { channel_id } => {
                let removed = self.remove(channel_id);
                if removed {
                    info!(channel_id, "channel is no longer managed");
                }
                removed
            },
        };
        debug!(kind, changed, "registry update applied");
        changed
    }
}

fn record_size(len: usize) {
    #[cfg(feature = "metrics")]
    gauge!(registry_metrics::MANAGED_CHANNELS).set(len as f64);
    #[cfg(not(feature = "metrics"))]
    let _ = len;
}

/// Create the bounded queue between the gateway bridge and the registry.
pub fn update_queue(
    capacity: usize,
) -> (mpsc::Sender<RegistryUpdate>, mpsc::Receiver<RegistryUpdate>) {
    mpsc::channel(capacity)
}

/// Apply queued updates until every sender is dropped.
///
/// This task is the only writer of `registry`. Returns how many updates it
/// applied.
pub async fn run_update_loop(
    registry: Arc<ManagedChannelRegistry>,
    mut updates: mpsc::Receiver<RegistryUpdate>,
) -> usize {
    let mut applied = 0;
    while let Some(update) = updates.recv().await {
        registry.apply(update);
        applied += 1;
    }
    debug!(applied, "registry update queue closed");
    applied
}
