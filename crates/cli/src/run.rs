//! Bot runtime: registry, gateway, scheduler, shutdown.

use std::{sync::Arc, time::Duration};

use {
    anyhow::{Context, anyhow},
    secrecy::ExposeSecret,
    tokio::task::JoinError,
    tracing::{debug, info, warn},
};

use {
    curfew_channels::{
        GatewayBridge, ManagedChannelRegistry, PermissionApi, registry::DEFAULT_QUEUE_CAPACITY,
        run_flip_pass, run_update_loop, update_queue,
    },
    curfew_config::Settings,
    curfew_cron::{FlipFn, FlipScheduler},
    curfew_discord::{SerenityPermissionApi, build_client},
    curfew_metrics::{MetricsRecorderConfig, init_metrics},
};

use crate::shutdown::ShutdownGuard;

/// How long to wait for the gateway and update tasks after shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

pub async fn run(settings: Settings) -> anyhow::Result<()> {
    init_metrics(MetricsRecorderConfig {
        enabled: settings.metrics.enabled,
        listen: settings.metrics.listen,
    })
    .context("failed to initialise metrics")?;

    let shutdown = ShutdownGuard::new();
    shutdown.spawn_signal_listener();
    let token = shutdown.token();

    let registry = Arc::new(ManagedChannelRegistry::new());
    let (updates_tx, updates_rx) = update_queue(DEFAULT_QUEUE_CAPACITY);
    let updates_task = tokio::spawn(run_update_loop(Arc::clone(&registry), updates_rx));
    let (bridge, ready_rx) = GatewayBridge::new(updates_tx);
    let bridge = Arc::new(bridge);

    let mut client = build_client(settings.token.expose_secret(), Arc::clone(&bridge))
        .await
        .context("failed to build discord client")?;
    let http = Arc::clone(&client.http);
    let shard_manager = Arc::clone(&client.shard_manager);
    let mut gateway = tokio::spawn(async move { client.start().await });

    let summary = tokio::select! {
        ready = ready_rx => ready.context("gateway handler dropped before ready")?,
        joined = &mut gateway => return Err(gateway_exit(joined)),
        () = token.cancelled() => {
            info!("shutdown requested before gateway was ready");
            shard_manager.shutdown_all().await;
            return Ok(());
        },
    };
    info!(
        bot_user_id = summary.bot_user_id,
        guilds = summary.guilds,
        managed = summary.managed,
        "gateway ready"
    );

    // The seed is queued before readiness fires. Wait until it is applied so
    // the first pass sees every scanned channel.
    tokio::select! {
        () = registry.wait_seeded() => {},
        joined = &mut gateway => return Err(gateway_exit(joined)),
        () = token.cancelled() => {
            info!("shutdown requested before the registry was seeded");
            shard_manager.shutdown_all().await;
            return Ok(());
        },
    }

    let api: Arc<dyn PermissionApi> = Arc::new(SerenityPermissionApi::new(http));
    let scheduler = FlipScheduler::new(settings.flip_interval, flip_fn(api, Arc::clone(&registry)));
    scheduler
        .start()
        .await
        .context("failed to start flip scheduler")?;

    let gateway_result = tokio::select! {
        () = token.cancelled() => None,
        joined = &mut gateway => Some(joined),
    };

    scheduler.stop().await;
    shard_manager.shutdown_all().await;

    let outcome = match gateway_result {
        Some(joined) => Err(gateway_exit(joined)),
        None => {
            if tokio::time::timeout(SHUTDOWN_GRACE, gateway).await.is_err() {
                warn!("gateway did not stop within the grace period");
            }
            Ok(())
        },
    };

    drop(bridge);
    match tokio::time::timeout(SHUTDOWN_GRACE, updates_task).await {
        Ok(Ok(applied)) => debug!(applied, "registry updater stopped"),
        Ok(Err(e)) => warn!(error = %e, "registry updater ended abnormally"),
        Err(_) => warn!("registry updater did not stop within the grace period"),
    }

    info!(managed = registry.len(), "curfew stopped");
    outcome
}

/// Scheduler callback that runs one flip pass over the registry.
pub fn flip_fn(api: Arc<dyn PermissionApi>, registry: Arc<ManagedChannelRegistry>) -> FlipFn {
    Arc::new(move || {
        let api = Arc::clone(&api);
        let registry = Arc::clone(&registry);
        Box::pin(async move { run_flip_pass(api.as_ref(), &registry).await })
    })
}

/// Describe why the gateway task ended while the bot was meant to be running.
fn gateway_exit<E>(joined: Result<Result<(), E>, JoinError>) -> anyhow::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    match joined {
        Ok(Ok(())) => anyhow!("gateway connection closed unexpectedly"),
        Ok(Err(e)) => anyhow::Error::new(e).context("gateway connection failed"),
        Err(e) => anyhow::Error::new(e).context("gateway task aborted"),
    }
}
