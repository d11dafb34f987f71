// ── Domain model ──
//
// Canonical types for the resources the dashboard synchronizes. Wire
// names are camelCase to match the server's JSON. Open-ended payload
// tails are captured with `#[serde(flatten)]` so nothing the server sends
// is silently dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entities that carry a unique id, used for in-place merges of push
/// deltas and optimistic mutations.
pub trait Identified {
    fn id(&self) -> &str;
}

// ── Minions ──────────────────────────────────────────────────────────

/// On/off position of a switchable device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwitchState {
    #[serde(rename = "on")]
    On,
    #[serde(rename = "off")]
    Off,
}

/// Current status of a minion: the switch position every kind shares,
/// plus whatever kind-specific properties the server reports (brightness,
/// temperature, roller direction, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinionStatus {
    pub state: SwitchState,

    /// Kind-specific properties, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl MinionStatus {
    pub fn off() -> Self {
        Self {
            state: SwitchState::Off,
            extra: serde_json::Value::Null,
        }
    }
}

/// Kind of device a minion controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MinionType {
    Toggle,
    Switch,
    Light,
    ColorLight,
    AirConditioning,
    Roller,
}

/// A controllable device as the dashboard sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Minion {
    pub minion_id: String,
    pub name: String,
    pub minion_type: MinionType,

    #[serde(default)]
    pub room: Option<String>,

    /// Whether the device answered its last status poll.
    #[serde(default = "default_true")]
    pub is_properly_communicated: bool,

    pub minion_status: MinionStatus,

    /// Auto turn-off delay in milliseconds, if configured.
    #[serde(default)]
    pub minion_auto_turn_off_ms: Option<u64>,
}

impl Identified for Minion {
    fn id(&self) -> &str {
        &self.minion_id
    }
}

fn default_true() -> bool {
    true
}

// ── Timings ──────────────────────────────────────────────────────────

/// When a timing fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Schedule {
    /// Fire once at an absolute time.
    Once { at: DateTime<Utc> },
    /// Fire daily at `time` (HH:MM) on the listed days.
    Daily { time: String, days: Vec<String> },
    /// Fire once, `minutes` after activation.
    Timer { minutes: u32 },
}

/// A scheduled trigger for an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    pub timing_id: String,
    pub name: String,
    pub active: bool,
    /// The action this timing triggers when it fires.
    pub action_id: String,
    pub schedule: Schedule,
}

impl Identified for Timing {
    fn id(&self) -> &str {
        &self.timing_id
    }
}

// ── Actions ──────────────────────────────────────────────────────────

/// One step of an action: set a minion to a status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionStep {
    pub minion_id: String,
    pub status: MinionStatus,
}

/// A named batch of minion mutations applied together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub action_id: String,
    pub name: String,
    pub steps: Vec<ActionStep>,
}

impl Identified for Action {
    fn id(&self) -> &str {
        &self.action_id
    }
}

// ── Users ────────────────────────────────────────────────────────────

/// A dashboard account. The email doubles as the unique id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub admin: bool,

    #[serde(default)]
    pub session_timeout_ms: Option<u64>,
}

impl Identified for User {
    fn id(&self) -> &str {
        &self.email
    }
}

// ── LAN devices ──────────────────────────────────────────────────────

/// A physical device discovered on the local network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanDevice {
    pub mac: String,
    pub ip: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub vendor: Option<String>,
}

impl Identified for LanDevice {
    fn id(&self) -> &str {
        &self.mac
    }
}

// ── Timeouts ─────────────────────────────────────────────────────────

/// Auto turn-off rule for one minion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinionTimeout {
    pub minion_id: String,
    pub active: bool,
    pub timeout_minutes: u32,
}

impl Identified for MinionTimeout {
    fn id(&self) -> &str {
        &self.minion_id
    }
}

// ── Timeline ─────────────────────────────────────────────────────────

/// One entry in the activity timeline: a minion reached a status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineNode {
    pub minion_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: MinionStatus,

    /// Who or what caused the change (user email, timing id, ...).
    #[serde(default)]
    pub triggered_by: Option<String>,
}

// ── Settings ─────────────────────────────────────────────────────────

/// Remote relay settings for reaching the local server from outside.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSettings {
    /// Remote relay host, `None` when not configured.
    #[serde(default)]
    pub host: Option<String>,
}
