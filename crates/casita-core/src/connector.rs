// ── API connector seam ──
//
// The sync core never builds HTTP requests. The host hands it one of
// these: a boxed async fetch per resource plus the liveliness probe.
// Auth/session middleware (401 handling, token refresh) composes around
// the connector on the host side, outside this crate.

use futures_util::future::BoxFuture;

use casita_api::{ApiError, RemoteConnectionStatus};

use crate::model::{
    Action, LanDevice, Minion, MinionTimeout, RemoteSettings, TimelineNode, Timing, User,
};

/// One REST fetch per resource, plus the lightweight liveliness probe.
///
/// Every method performs exactly one request and returns the typed
/// payload or rejects with a transport/HTTP error — no retry, no caching,
/// that is entirely the data services' job. Futures must be `'static`:
/// implementations clone their internals into them.
pub trait ApiConnector: Send + Sync + 'static {
    fn fetch_minions(&self) -> BoxFuture<'static, Result<Vec<Minion>, ApiError>>;

    fn fetch_timings(&self) -> BoxFuture<'static, Result<Vec<Timing>, ApiError>>;

    fn fetch_users(&self) -> BoxFuture<'static, Result<Vec<User>, ApiError>>;

    fn fetch_lan_devices(&self) -> BoxFuture<'static, Result<Vec<LanDevice>, ApiError>>;

    fn fetch_actions(&self) -> BoxFuture<'static, Result<Vec<Action>, ApiError>>;

    fn fetch_timeouts(&self) -> BoxFuture<'static, Result<Vec<MinionTimeout>, ApiError>>;

    fn fetch_timeline(&self) -> BoxFuture<'static, Result<Vec<TimelineNode>, ApiError>>;

    fn fetch_remote_settings(&self) -> BoxFuture<'static, Result<RemoteSettings, ApiError>>;

    /// One lightweight status request. A transport failure means "server
    /// unreachable"; a success carries the remote-link status.
    fn probe_liveliness(&self) -> BoxFuture<'static, Result<RemoteConnectionStatus, ApiError>>;
}
