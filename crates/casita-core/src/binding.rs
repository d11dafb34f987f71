// ── View binding adapter ──
//
// The mount/unmount glue between a UI node and a data service. A mounted
// binding renders synchronously from the last-known cache (or a
// caller-supplied placeholder), attaches in the background, and forwards
// every publish until it is dropped.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::warn;

use crate::service::{DataService, Subscription};

/// One update delivered to a mounted view.
#[derive(Debug)]
pub enum BindingEvent<T> {
    /// A new value was published.
    Data(T),
    /// The initial load failed; presentation (toast, retry) is the
    /// caller's job.
    Error(String),
}

struct BindingShared {
    subscription: Option<Subscription>,
    unmounted: bool,
}

/// Subscription handle for one mounted UI node.
///
/// Dropping the binding unsubscribes: no further events are delivered and
/// no background work stays attached to the unmounted view.
pub struct ServiceBinding<T> {
    data: T,
    loading: bool,
    events: mpsc::UnboundedReceiver<BindingEvent<T>>,
    shared: Arc<Mutex<BindingShared>>,
}

impl<T> ServiceBinding<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Mount on a service. Initial-load errors are forwarded as
    /// [`BindingEvent::Error`].
    pub fn mount(service: &Arc<DataService<T>>, placeholder: Option<T>) -> Self {
        Self::mount_with(service, placeholder, false)
    }

    /// Mount, optionally suppressing the error event for views that show
    /// stale data rather than a failure state.
    pub fn mount_with(
        service: &Arc<DataService<T>>,
        placeholder: Option<T>,
        suppress_errors: bool,
    ) -> Self {
        let data = placeholder.unwrap_or_else(|| service.data());
        let (tx, events) = mpsc::unbounded_channel();
        let shared = Arc::new(Mutex::new(BindingShared {
            subscription: None,
            unmounted: false,
        }));

        let service = Arc::clone(service);
        let task_shared = Arc::clone(&shared);
        tokio::spawn(async move {
            let publish_tx = tx.clone();
            let attached = service
                .attach(Arc::new(move |value| {
                    let _ = publish_tx.send(BindingEvent::Data(value));
                }))
                .await;

            match attached {
                Ok(subscription) => {
                    let mut shared = task_shared
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner);
                    if shared.unmounted {
                        // The view disappeared before the attach resolved.
                        subscription.unsubscribe();
                    } else {
                        shared.subscription = Some(subscription);
                    }
                }
                Err(e) => {
                    warn!(service = service.name(), error = %e, "initial load failed");
                    if !suppress_errors {
                        let _ = tx.send(BindingEvent::Error(e.to_string()));
                    }
                }
            }
        });

        Self {
            data,
            loading: true,
            events,
            shared,
        }
    }

    /// Last value delivered to this binding (placeholder/cache until the
    /// first publish arrives).
    pub fn data(&self) -> &T {
        &self.data
    }

    /// `true` until the first event (value or error) arrives.
    pub fn loading(&self) -> bool {
        self.loading
    }

    /// Next update; `None` once the binding can no longer receive any
    /// (attach failed with errors suppressed, or the service is gone).
    pub async fn next(&mut self) -> Option<BindingEvent<T>> {
        let event = self.events.recv().await?;
        if let BindingEvent::Data(value) = &event {
            self.data = value.clone();
        }
        self.loading = false;
        Some(event)
    }
}

impl<T> Drop for ServiceBinding<T> {
    fn drop(&mut self) {
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        shared.unmounted = true;
        if let Some(subscription) = shared.subscription.take() {
            subscription.unsubscribe();
        }
    }
}
