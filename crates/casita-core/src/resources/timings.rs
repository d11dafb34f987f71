// ── Timings: the scheduled-trigger resource ──
//
// Push-backed like minions: timings change server-side when they fire
// (one-shot schedules deactivate themselves), so the feed keeps the
// dashboard's schedule view truthful between refetches.

use std::sync::{Arc, OnceLock, Weak};

use futures_util::FutureExt;

use casita_api::{ApiError, KeyedStore, PushTransport};

use crate::connector::ApiConnector;
use crate::model::Timing;
use crate::service::{CacheMode, DataService, FetchFn, ServiceOptions, ServiceRegistry};

use super::feed::{self, FeedGuard, FeedMessage};

/// Reactive collection of all timings.
pub struct TimingsService {
    service: Arc<DataService<Vec<Timing>>>,
    feed_guard: Arc<FeedGuard>,
}

impl TimingsService {
    pub(crate) fn new(
        connector: &Arc<dyn ApiConnector>,
        transport: &Arc<dyn PushTransport>,
        store: &Arc<dyn KeyedStore>,
        registry: &ServiceRegistry,
        feed_channel: &str,
    ) -> Self {
        let feed_guard = Arc::new(FeedGuard::default());
        let slot: Arc<OnceLock<Weak<DataService<Vec<Timing>>>>> = Arc::new(OnceLock::new());

        let fetch: FetchFn<Vec<Timing>> = {
            let connector = Arc::clone(connector);
            let transport = Arc::clone(transport);
            let guard = Arc::clone(&feed_guard);
            let slot = Arc::clone(&slot);
            let channel = feed_channel.to_owned();
            Arc::new(move || {
                let connector = Arc::clone(&connector);
                let transport = Arc::clone(&transport);
                let guard = Arc::clone(&guard);
                let slot = Arc::clone(&slot);
                let channel = channel.clone();
                async move {
                    if let Some(weak) = slot.get() {
                        feed::reopen_feed(weak, transport.as_ref(), &channel, &guard);
                    }
                    connector.fetch_timings().await
                }
                .boxed()
            })
        };

        let service = DataService::new(
            "Timings",
            Vec::new(),
            fetch,
            ServiceOptions {
                cache_mode: CacheMode::Full,
                cache_key: None,
            },
            Arc::clone(store),
            registry,
        );
        let _ = slot.set(Arc::downgrade(&service));

        Self {
            service,
            feed_guard,
        }
    }

    pub fn service(&self) -> &Arc<DataService<Vec<Timing>>> {
        &self.service
    }

    pub fn data(&self) -> Vec<Timing> {
        self.service.data()
    }

    pub async fn get_data(&self) -> Result<Vec<Timing>, ApiError> {
        self.service.get_data().await
    }

    // ── Optimistic mutators ──────────────────────────────────────────

    pub fn update_timing(&self, timing: Timing) {
        self.merge(FeedMessage::Updated(timing));
    }

    pub fn create_timing(&self, timing: Timing) {
        self.merge(FeedMessage::Created(timing));
    }

    pub fn delete_timing(&self, timing_id: &str) {
        self.service.update_in_place(|items| {
            items.retain(|t| t.timing_id != timing_id);
            true
        });
    }

    /// Close the live feed; the next fetch re-opens it.
    pub fn close_feed(&self) {
        self.feed_guard.close();
    }

    fn merge(&self, message: FeedMessage<Timing>) {
        self.service.update_in_place(|items| {
            feed::apply_message(items, message);
            true
        });
    }
}
