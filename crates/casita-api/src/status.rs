// ── Remote-link status ──

use serde::{Deserialize, Serialize};
use strum::Display;

/// Status of the local server's uplink to the remote relay, as reported by
/// the liveliness probe endpoint.
///
/// Wire names are camelCase to match the server's JSON. `Display` renders
/// the same wire names for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum RemoteConnectionStatus {
    /// No remote relay configured — local-only setup.
    #[serde(rename = "notConfigured")]
    #[strum(serialize = "notConfigured")]
    NotConfigured,

    /// Local server is connected to the remote relay.
    #[serde(rename = "connectionOK")]
    #[strum(serialize = "connectionOK")]
    ConnectionOk,

    /// Remote relay is up but the local server dropped off it.
    #[serde(rename = "localServerDisconnected")]
    #[strum(serialize = "localServerDisconnected")]
    LocalServerDisconnected,

    /// Local server cannot reach the remote relay at all.
    #[serde(rename = "cantReachRemoteServer")]
    #[strum(serialize = "cantReachRemoteServer")]
    CantReachRemoteServer,

    /// Remote relay rejected the local server's credentials.
    #[serde(rename = "authorizationFail")]
    #[strum(serialize = "authorizationFail")]
    AuthorizationFail,
}
