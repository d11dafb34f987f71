//! Concrete per-resource services.
//!
//! Each binds one fetch function from the [`ApiConnector`] to a
//! [`DataService`]; minions and timings additionally merge live push
//! deltas. Cache modes: minions and timings use [`CacheMode::Full`]
//! (stale-then-fresh on mount), settings and LAN devices use
//! [`CacheMode::BootOnly`] (fine to show stale in a shell that starts
//! offline), the rest stay uncached.

pub(crate) mod feed;
pub mod minions;
pub mod timings;

pub use minions::MinionsService;
pub use timings::TimingsService;

use std::sync::Arc;

use casita_api::{KeyedStore, PushTransport};

use crate::config::SyncConfig;
use crate::connector::ApiConnector;
use crate::model::{Action, LanDevice, MinionTimeout, RemoteSettings, TimelineNode, User};
use crate::service::{CacheMode, DataService, FetchFn, ServiceOptions, ServiceRegistry};

/// Every resource service the dashboard consumes, wired to one connector
/// and one registry.
pub struct Resources {
    pub minions: MinionsService,
    pub timings: TimingsService,
    pub users: Arc<DataService<Vec<User>>>,
    pub lan_devices: Arc<DataService<Vec<LanDevice>>>,
    pub actions: Arc<DataService<Vec<Action>>>,
    pub timeouts: Arc<DataService<Vec<MinionTimeout>>>,
    pub timeline: Arc<DataService<Vec<TimelineNode>>>,
    pub settings: Arc<DataService<RemoteSettings>>,
}

impl Resources {
    pub(crate) fn new(
        config: &SyncConfig,
        connector: &Arc<dyn ApiConnector>,
        transport: &Arc<dyn PushTransport>,
        store: &Arc<dyn KeyedStore>,
        registry: &ServiceRegistry,
    ) -> Self {
        let minions = MinionsService::new(
            connector,
            transport,
            store,
            registry,
            &config.minions_feed_channel,
        );
        let timings = TimingsService::new(
            connector,
            transport,
            store,
            registry,
            &config.timings_feed_channel,
        );

        let users = DataService::new(
            "Users",
            Vec::new(),
            fetch_fn(connector, |c| c.fetch_users()),
            ServiceOptions::default(),
            Arc::clone(store),
            registry,
        );
        let lan_devices = DataService::new(
            "LanDevices",
            Vec::new(),
            fetch_fn(connector, |c| c.fetch_lan_devices()),
            ServiceOptions {
                cache_mode: CacheMode::BootOnly,
                cache_key: None,
            },
            Arc::clone(store),
            registry,
        );
        let actions = DataService::new(
            "Actions",
            Vec::new(),
            fetch_fn(connector, |c| c.fetch_actions()),
            ServiceOptions::default(),
            Arc::clone(store),
            registry,
        );
        let timeouts = DataService::new(
            "Timeouts",
            Vec::new(),
            fetch_fn(connector, |c| c.fetch_timeouts()),
            ServiceOptions::default(),
            Arc::clone(store),
            registry,
        );
        let timeline = DataService::new(
            "Timeline",
            Vec::new(),
            fetch_fn(connector, |c| c.fetch_timeline()),
            ServiceOptions::default(),
            Arc::clone(store),
            registry,
        );
        let settings = DataService::new(
            "Settings",
            RemoteSettings::default(),
            fetch_fn(connector, |c| c.fetch_remote_settings()),
            ServiceOptions {
                cache_mode: CacheMode::BootOnly,
                cache_key: None,
            },
            Arc::clone(store),
            registry,
        );

        Self {
            minions,
            timings,
            users,
            lan_devices,
            actions,
            timeouts,
            timeline,
            settings,
        }
    }

    /// Close the live feeds; the next fetch of each re-opens them.
    pub(crate) fn close_feeds(&self) {
        self.minions.close_feed();
        self.timings.close_feed();
    }
}

/// Bind one connector method into a [`FetchFn`].
fn fetch_fn<T, F>(connector: &Arc<dyn ApiConnector>, method: F) -> FetchFn<T>
where
    T: Send + 'static,
    F: Fn(
            &dyn ApiConnector,
        )
            -> futures_util::future::BoxFuture<'static, Result<T, casita_api::ApiError>>
        + Send
        + Sync
        + 'static,
{
    let connector = Arc::clone(connector);
    Arc::new(move || method(connector.as_ref()))
}
