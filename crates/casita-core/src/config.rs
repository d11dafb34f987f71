// ── Runtime configuration ──
//
// Built by the host shell and handed to `SyncHub` — the core never reads
// config files.

use std::time::Duration;

/// Tuning for the sync layer.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How often the liveliness monitor probes the server.
    pub probe_interval: Duration,

    /// Push channel carrying minion status deltas.
    pub minions_feed_channel: String,

    /// Push channel carrying timing deltas.
    pub timings_feed_channel: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_secs(15),
            minions_feed_channel: "minions".into(),
            timings_feed_channel: "timings".into(),
        }
    }
}
