// ── Composition root ──
//
// One hub per application: wires the connector, push transport, and
// local store into the full set of resource services, owns the session
// flag, and runs the liveliness heartbeat for as long as the hub lives.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

use casita_api::{KeyedStore, PushTransport};

use crate::config::SyncConfig;
use crate::connector::ApiConnector;
use crate::liveliness::{LivelinessMonitor, ProbeFn};
use crate::resources::Resources;
use crate::service::ServiceRegistry;

/// Handle to the whole sync layer. Cheaply cloneable.
#[derive(Clone)]
pub struct SyncHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    resources: Resources,
    registry: Arc<ServiceRegistry>,
    liveliness: LivelinessMonitor,
    session: watch::Sender<bool>,
    cancel: CancellationToken,
}

impl SyncHub {
    /// Wire every resource service and start the heartbeat. The hub takes
    /// no ownership of a runtime; it spawns onto the ambient one.
    pub fn new(
        config: SyncConfig,
        connector: Arc<dyn ApiConnector>,
        transport: Arc<dyn PushTransport>,
        store: Arc<dyn KeyedStore>,
    ) -> Self {
        let registry = Arc::new(ServiceRegistry::new());
        let resources = Resources::new(&config, &connector, &transport, &store, &registry);

        let (session, logged_in) = watch::channel(false);
        let probe: ProbeFn = {
            let connector = Arc::clone(&connector);
            Arc::new(move || connector.probe_liveliness())
        };
        let liveliness = LivelinessMonitor::new(probe, logged_in);

        let cancel = CancellationToken::new();
        tokio::spawn(
            liveliness
                .clone()
                .run(config.probe_interval, cancel.clone()),
        );

        Self {
            inner: Arc::new(HubInner {
                resources,
                registry,
                liveliness,
                session,
                cancel,
            }),
        }
    }

    pub fn resources(&self) -> &Resources {
        &self.inner.resources
    }

    pub fn liveliness(&self) -> &LivelinessMonitor {
        &self.inner.liveliness
    }

    pub fn is_logged_in(&self) -> bool {
        *self.inner.session.borrow()
    }

    /// Mark the session live and probe immediately.
    pub fn login(&self) {
        info!("session opened");
        let _ = self.inner.session.send(true);
        self.inner.liveliness.check_now();
    }

    /// End the session: every service reverts to its default and the live
    /// feeds close. Per-user data must not outlive the user.
    pub fn logout(&self) {
        info!("session closed");
        let _ = self.inner.session.send(false);
        self.inner.registry.reset_all();
        self.inner.resources.close_feeds();
    }

    /// Stop the heartbeat and the feeds. The hub is inert afterwards.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.inner.resources.close_feeds();
    }
}
