//! Metric name and label definitions.
//!
//! All metric names used by curfew live here so dashboards have a single
//! place to look.

/// Flip pass metrics
pub mod flip {
    /// Total number of flip passes started
    pub const PASSES_TOTAL: &str = "curfew_flip_passes_total";
    /// Duration of a complete flip pass in seconds
    pub const PASS_DURATION_SECONDS: &str = "curfew_flip_pass_duration_seconds";
    /// Channels hidden from the audience role
    pub const CHANNELS_HIDDEN_TOTAL: &str = "curfew_flip_channels_hidden_total";
    /// Channels made visible to the audience role
    pub const CHANNELS_SHOWN_TOTAL: &str = "curfew_flip_channels_shown_total";
    /// Per-channel failures (fetch or write-back)
    pub const CHANNEL_ERRORS_TOTAL: &str = "curfew_flip_channel_errors_total";
}

/// Scheduler metrics
pub mod scheduler {
    /// Delay between the scheduled deadline and the actual tick, in seconds
    pub const TICK_LATENCY_SECONDS: &str = "curfew_scheduler_tick_latency_seconds";
    /// Ticks skipped because the previous pass overran its slot
    pub const TICKS_SKIPPED_TOTAL: &str = "curfew_scheduler_ticks_skipped_total";
}

/// Managed channel registry metrics
pub mod registry {
    /// Number of channels currently managed
    pub const MANAGED_CHANNELS: &str = "curfew_registry_managed_channels";
    /// Updates applied to the registry, labeled by `kind`
    pub const UPDATES_TOTAL: &str = "curfew_registry_updates_total";
}

/// Gateway metrics
pub mod gateway {
    /// Gateway events received, labeled by `event`
    pub const EVENTS_TOTAL: &str = "curfew_gateway_events_total";
    /// Guilds whose channel enumeration failed during seeding
    pub const SEED_ERRORS_TOTAL: &str = "curfew_gateway_seed_errors_total";
}

/// Common label keys
pub mod labels {
    pub const KIND: &str = "kind";
    pub const EVENT: &str = "event";
}

/// Standard histogram buckets
pub mod buckets {
    use once_cell::sync::Lazy;

    /// Flip pass duration buckets (in seconds)
    /// Covers 10ms to 10 minutes (one REST round trip per channel)
    pub static PASS_DURATION: Lazy<Vec<f64>> = Lazy::new(|| {
        vec![
            0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0,
        ]
    });

    /// Tick latency buckets (in seconds)
    pub static TICK_LATENCY: Lazy<Vec<f64>> =
        Lazy::new(|| vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]);
}
