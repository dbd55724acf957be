//! Translate gateway events into registry updates.
//!
//! The platform adapter calls into [`GatewayBridge`] from its event handlers.
//! The bridge evaluates eligibility and publishes the outcome; it never holds
//! the registry itself.

use std::{
    collections::HashMap,
    sync::{Mutex, RwLock},
};

use {
    tokio::sync::{Mutex as AsyncMutex, mpsc, oneshot},
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use curfew_metrics::{counter, gateway as gateway_metrics, labels};

use crate::{
    Error, Result,
    api::PermissionApi,
    eligibility::{Verdict, evaluate},
    registry::RegistryUpdate,
    types::{ChannelSnapshot, ManagedChannel},
};

/// What the startup scan found. Delivered once through the readiness signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadySummary {
    pub bot_user_id: u64,
    pub guilds: usize,
    pub failed_guilds: usize,
    pub managed: usize,
}

/// Latest event outcome per channel id, collected while a startup scan runs.
/// `None` means the channel must not be managed.
type ScanOverrides = HashMap<u64, Option<ManagedChannel>>;

pub struct GatewayBridge {
    bot_user_id: RwLock<Option<u64>>,
    updates: mpsc::Sender<RegistryUpdate>,
    ready: Mutex<Option<oneshot::Sender<ReadySummary>>>,
    // Held while publishing, so an event cannot slip between the seed being
    // built and being queued.
    scan: AsyncMutex<Option<ScanOverrides>>,
}

impl GatewayBridge {
    /// Create a bridge publishing onto `updates`, plus the receiver that
    /// resolves after the first startup scan has been queued.
    pub fn new(updates: mpsc::Sender<RegistryUpdate>) -> (Self, oneshot::Receiver<ReadySummary>) {
        let (ready_tx, ready_rx) = oneshot::channel();
        let bridge = Self {
            bot_user_id: RwLock::new(None),
            updates,
            ready: Mutex::new(Some(ready_tx)),
            scan: AsyncMutex::new(None),
        };
        (bridge, ready_rx)
    }

    pub fn bot_user_id(&self) -> Option<u64> {
        *self.bot_user_id.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Handle a gateway session becoming ready.
    ///
    /// Scans every guild's channels, queues a registry seed, and fires the
    /// readiness signal the first time. A guild whose channel list cannot be
    /// fetched is skipped. Channel events handled while the scan is running
    /// take precedence over the listing, which may already be stale.
    pub async fn on_ready(
        &self,
        api: &dyn PermissionApi,
        bot_user_id: u64,
        guild_ids: &[u64],
    ) -> Result<ReadySummary> {
        record_event("ready");
        *self.bot_user_id.write().unwrap_or_else(|e| e.into_inner()) = Some(bot_user_id);
        self.scan.lock().await.get_or_insert_with(HashMap::new);

        let mut managed: Vec<ManagedChannel> = Vec::new();
        let mut failed_guilds = 0;
        for &guild_id in guild_ids {
            info!(guild_id, "connected to guild");
            let channels = match api.list_guild_channels(guild_id).await {
                Ok(channels) => channels,
                Err(e) => {
                    warn!(guild_id, error = %e, "failed to list guild channels, skipping guild");
                    failed_guilds += 1;
                    #[cfg(feature = "metrics")]
                    counter!(gateway_metrics::SEED_ERRORS_TOTAL).increment(1);
                    continue;
                },
            };
            for channel in &channels {
                match evaluate(bot_user_id, channel) {
                    Verdict::Manageable => managed.push(channel.managed()),
                    verdict => debug!(
                        guild_id,
                        channel_id = channel.channel_id,
                        ?verdict,
                        "channel not manageable"
                    ),
                }
            }
        }

        let mut scan = self.scan.lock().await;
        let overrides = scan.take().unwrap_or_default();
        if !overrides.is_empty() {
            debug!(
                count = overrides.len(),
                "channel events arrived during startup scan"
            );
        }
        managed.retain(|c| !overrides.contains_key(&c.channel_id));
        managed.extend(overrides.into_values().flatten());
        managed.sort_by_key(|c| c.channel_id);

        if managed.is_empty() {
            warn!("no manageable channels found at startup");
        }

        let summary = ReadySummary {
            bot_user_id,
            guilds: guild_ids.len(),
            failed_guilds,
            managed: managed.len(),
        };
        self.send(RegistryUpdate::Seed(managed)).await?;
        drop(scan);

        let ready_tx = self
            .ready
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(tx) = ready_tx {
            // The receiver may already be gone during shutdown.
            let _ = tx.send(summary.clone());
        }

        Ok(summary)
    }

    /// Re-evaluate a channel after a create or update event.
    pub async fn on_channel_update(&self, channel: &ChannelSnapshot) -> Result<Verdict> {
        record_event("channel_update");
        let Some(bot_user_id) = self.bot_user_id() else {
            return Err(Error::unavailable("gateway session not ready"));
        };

        let verdict = evaluate(bot_user_id, channel);
        debug!(
            guild_id = channel.guild_id,
            channel_id = channel.channel_id,
            name = %channel.name,
            ?verdict,
            "channel evaluated"
        );
        let update = if verdict.is_manageable() {
            RegistryUpdate::Eligible(channel.managed())
        } else {
            RegistryUpdate::Ineligible {
                channel_id: channel.channel_id,
            }
        };
        self.publish(update).await?;
        Ok(verdict)
    }

    /// Drop a deleted channel from the registry.
    pub async fn on_channel_delete(&self, channel_id: u64) -> Result<()> {
        record_event("channel_delete");
        self.publish(RegistryUpdate::Ineligible { channel_id })
            .await
    }

    /// Queue an event-driven update, noting it for any scan in flight.
    async fn publish(&self, update: RegistryUpdate) -> Result<()> {
        let mut scan = self.scan.lock().await;
        if let Some(overrides) = scan.as_mut() {
            match &update {
                RegistryUpdate::Eligible(channel) => {
                    overrides.insert(channel.channel_id, Some(*channel));
                },
                RegistryUpdate::Ineligible { channel_id } => {
                    overrides.insert(*channel_id, None);
                },
                RegistryUpdate::Seed(_) => {},
            }
        }
        self.send(update).await
    }

    async fn send(&self, update: RegistryUpdate) -> Result<()> {
        self.updates
            .send(update)
            .await
            .map_err(|_| Error::unavailable("registry update queue closed"))
    }
}

fn record_event(event: &'static str) {
    #[cfg(feature = "metrics")]
    counter!(gateway_metrics::EVENTS_TOTAL, labels::EVENT => event).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = event;
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use {
        super::*,
        async_trait::async_trait,
        tokio::sync::Notify,
        crate::{
            eligibility::REQUIRED_PERMISSIONS,
            permissions::{OverwriteKind, PermissionPair},
            permissions::{PermissionOverwrite, bits},
            registry::{ManagedChannelRegistry, run_update_loop, update_queue},
            testing::{FakeApi, text_channel},
            types::ChannelKind,
        },
    };

    const BOT: u64 = 900;
    const GUILD_A: u64 = 100;
    const GUILD_B: u64 = 200;

    fn granted(channel_id: u64, guild_id: u64) -> ChannelSnapshot {
        let mut c = text_channel(guild_id, channel_id);
        c.overwrites
            .push(PermissionOverwrite::member(BOT, REQUIRED_PERMISSIONS, 0));
        c
    }

    /// Drop the bridge and drain the queue into a fresh registry.
    async fn drain(
        bridge: GatewayBridge,
        rx: mpsc::Receiver<RegistryUpdate>,
    ) -> Arc<ManagedChannelRegistry> {
        drop(bridge);
        let registry = Arc::new(ManagedChannelRegistry::new());
        run_update_loop(Arc::clone(&registry), rx).await;
        registry
    }

    #[tokio::test]
    async fn ready_seeds_manageable_channels_and_signals() {
        let api = FakeApi::new();
        api.insert(granted(1, GUILD_A));
        api.insert(text_channel(GUILD_A, 2));
        api.insert(granted(3, GUILD_B));
        let mut voice = granted(4, GUILD_B);
        voice.kind = ChannelKind::Voice;
        api.insert(voice);

        let (tx, rx) = update_queue(8);
        let (bridge, ready) = GatewayBridge::new(tx);
        let summary = bridge
            .on_ready(&api, BOT, &[GUILD_A, GUILD_B])
            .await
            .unwrap();

        assert_eq!(summary, ReadySummary {
            bot_user_id: BOT,
            guilds: 2,
            failed_guilds: 0,
            managed: 2,
        });
        assert_eq!(ready.await.unwrap(), summary);
        assert_eq!(bridge.bot_user_id(), Some(BOT));

        let registry = drain(bridge, rx).await;
        let ids: Vec<u64> = registry.snapshot().iter().map(|c| c.channel_id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn failing_guild_is_skipped() {
        let api = FakeApi::new();
        api.insert(granted(1, GUILD_A));
        api.insert(granted(3, GUILD_B));
        api.fail_guild(GUILD_A);

        let (tx, rx) = update_queue(8);
        let (bridge, _ready) = GatewayBridge::new(tx);
        let summary = bridge
            .on_ready(&api, BOT, &[GUILD_A, GUILD_B])
            .await
            .unwrap();
        assert_eq!(summary.failed_guilds, 1);
        assert_eq!(summary.managed, 1);

        let registry = drain(bridge, rx).await;
        assert!(registry.contains(3));
        assert!(!registry.contains(1));
    }

    #[tokio::test]
    async fn second_ready_reseeds_without_signalling_again() {
        let api = FakeApi::new();
        api.insert(granted(1, GUILD_A));

        let (tx, rx) = update_queue(8);
        let (bridge, ready) = GatewayBridge::new(tx);
        bridge.on_ready(&api, BOT, &[GUILD_A]).await.unwrap();
        assert_eq!(ready.await.unwrap().managed, 1);

        api.insert(granted(2, GUILD_A));
        let again = bridge.on_ready(&api, BOT, &[GUILD_A]).await.unwrap();
        assert_eq!(again.managed, 2);

        let registry = drain(bridge, rx).await;
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn update_before_ready_is_rejected() {
        let (tx, _rx) = update_queue(8);
        let (bridge, _ready) = GatewayBridge::new(tx);
        let err = bridge
            .on_channel_update(&granted(1, GUILD_A))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unavailable { .. }));
    }

    #[tokio::test]
    async fn closed_queue_is_reported() {
        let api = FakeApi::new();
        let (tx, rx) = update_queue(8);
        drop(rx);
        let (bridge, _ready) = GatewayBridge::new(tx);
        let err = bridge.on_ready(&api, BOT, &[]).await.unwrap_err();
        assert!(matches!(err, Error::Unavailable { .. }));
    }

    #[tokio::test]
    async fn channel_lifecycle_follows_bot_overwrite() {
        let api = FakeApi::new();
        let mut channel = text_channel(GUILD_A, 10);
        api.insert(channel.clone());

        let registry = Arc::new(ManagedChannelRegistry::new());
        let (tx, rx) = update_queue(8);
        let worker = tokio::spawn(run_update_loop(Arc::clone(&registry), rx));
        let (bridge, ready) = GatewayBridge::new(tx);

        // No bot overwrite: never registered.
        bridge.on_ready(&api, BOT, &[GUILD_A]).await.unwrap();
        ready.await.unwrap();
        let verdict = bridge.on_channel_update(&channel).await.unwrap();
        assert_eq!(verdict, Verdict::NoBotOverwrite);

        // Grant all three bits.
        channel
            .overwrites
            .push(PermissionOverwrite::member(BOT, REQUIRED_PERMISSIONS, 0));
        let verdict = bridge.on_channel_update(&channel).await.unwrap();
        assert_eq!(verdict, Verdict::Manageable);

        // Revoke manage-roles.
        let mut revoked = channel.clone();
        revoked.overwrites[0].allow &= !bits::MANAGE_ROLES;
        let verdict = bridge.on_channel_update(&revoked).await.unwrap();
        assert_eq!(verdict, Verdict::MissingPermissions {
            missing: bits::MANAGE_ROLES,
        });

        drop(bridge);
        worker.await.unwrap();
        assert!(!registry.contains(10));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn grant_is_visible_after_processing() {
        let api = FakeApi::new();
        api.insert(text_channel(GUILD_A, 10));

        let (tx, mut rx) = update_queue(8);
        let registry = ManagedChannelRegistry::new();
        let (bridge, _ready) = GatewayBridge::new(tx);

        bridge.on_ready(&api, BOT, &[GUILD_A]).await.unwrap();
        registry.apply(rx.recv().await.unwrap());
        assert!(registry.is_empty());

        bridge.on_channel_update(&granted(10, GUILD_A)).await.unwrap();
        assert!(!registry.contains(10));
        registry.apply(rx.recv().await.unwrap());
        assert!(registry.contains(10));

        let mut revoked = granted(10, GUILD_A);
        revoked.overwrites[0].allow &= !bits::VIEW_CHANNEL;
        bridge.on_channel_update(&revoked).await.unwrap();
        registry.apply(rx.recv().await.unwrap());
        assert!(!registry.contains(10));
    }

    #[tokio::test]
    async fn delete_removes_channel() {
        let api = FakeApi::new();
        api.insert(granted(1, GUILD_A));

        let (tx, rx) = update_queue(8);
        let (bridge, _ready) = GatewayBridge::new(tx);
        bridge.on_ready(&api, BOT, &[GUILD_A]).await.unwrap();
        bridge.on_channel_delete(1).await.unwrap();

        let registry = drain(bridge, rx).await;
        assert!(registry.is_empty());
    }

    /// Holds every guild listing until released, so events can land mid-scan.
    #[derive(Default)]
    struct StalledListing {
        inner: FakeApi,
        listing: Notify,
        release: Notify,
    }

    #[async_trait]
    impl PermissionApi for StalledListing {
        async fn list_guild_channels(&self, guild_id: u64) -> Result<Vec<ChannelSnapshot>> {
            let channels = self.inner.list_guild_channels(guild_id).await;
            self.listing.notify_one();
            self.release.notified().await;
            channels
        }

        async fn fetch_channel(&self, channel_id: u64) -> Result<ChannelSnapshot> {
            self.inner.fetch_channel(channel_id).await
        }

        async fn set_overwrite(
            &self,
            channel_id: u64,
            subject_id: u64,
            kind: OverwriteKind,
            pair: PermissionPair,
        ) -> Result<()> {
            self.inner
                .set_overwrite(channel_id, subject_id, kind, pair)
                .await
        }
    }

    #[tokio::test]
    async fn events_during_scan_override_stale_listing() {
        let api = Arc::new(StalledListing::default());
        api.inner.insert(granted(10, GUILD_A));
        api.inner.insert(granted(11, GUILD_A));
        api.inner.insert(text_channel(GUILD_A, 12));
        api.inner.insert(granted(13, GUILD_A));

        let registry = Arc::new(ManagedChannelRegistry::new());
        let (tx, rx) = update_queue(8);
        let worker = tokio::spawn(run_update_loop(Arc::clone(&registry), rx));
        let (bridge, ready) = GatewayBridge::new(tx);
        let bridge = Arc::new(bridge);

        let scan = tokio::spawn({
            let bridge = Arc::clone(&bridge);
            let api = Arc::clone(&api);
            async move { bridge.on_ready(api.as_ref(), BOT, &[GUILD_A]).await }
        });
        api.listing.notified().await;

        // The listing already says 10 is granted and 12 is not.
        let mut revoked = granted(10, GUILD_A);
        revoked.overwrites[0].allow &= !bits::MANAGE_ROLES;
        bridge.on_channel_update(&revoked).await.unwrap();
        bridge.on_channel_update(&granted(12, GUILD_A)).await.unwrap();
        bridge.on_channel_delete(13).await.unwrap();

        api.release.notify_one();
        let summary = scan.await.unwrap().unwrap();
        assert_eq!(summary.managed, 2);
        assert_eq!(ready.await.unwrap(), summary);

        // After the scan, events go straight to the queue again.
        bridge.on_channel_update(&revoked).await.unwrap();

        drop(bridge);
        worker.await.unwrap();
        let ids: Vec<u64> = registry.snapshot().iter().map(|c| c.channel_id).collect();
        assert_eq!(ids, vec![11, 12]);
    }
}
