//! Audio session data models.
//!
//! Defines the ephemeral session record produced by every enumeration,
//! the master endpoint state, the snapshot returned to the front-end,
//! and the error type shared by all backends.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Native error type of the platform audio API.
#[cfg(windows)]
pub type OsError = windows::core::Error;

/// Native error type of the platform audio API.
#[cfg(not(windows))]
pub type OsError = std::io::Error;

/// Default volume reported when a session or endpoint cannot be read.
pub const DEFAULT_VOLUME: f32 = 1.0;

/// Default peak reported when no meter is available.
pub const DEFAULT_PEAK: f32 = 0.0;

/// Clamp a scalar into the normalized `[0, 1]` range.
///
/// NaN maps to `0.0` so that a broken meter never leaks into the UI.
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Widen a level to `f64` without exposing `f32` rounding noise.
///
/// Levels keep six decimal places, which is below `f32` resolution in `[0, 1]`.
pub fn widen_level(level: f32) -> f64 {
    (f64::from(level) * 1e6).round() / 1e6
}

fn serialize_level<S: Serializer>(level: &f32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(widen_level(*level))
}

/// One audio session as observed during a single enumeration.
///
/// Records are rebuilt on every call and never cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioSession {
    /// Opaque session identifier assigned by the OS
    #[serde(rename = "sessionId")]
    pub session_id: String,

    /// Owning process id, 0 for the system sounds session
    #[serde(rename = "pid")]
    pub process_id: u32,

    /// Lowercase executable basename, `system`, or `pid_<n>`
    #[serde(rename = "exeName")]
    pub executable_name: String,

    /// Full executable path, empty when it could not be resolved
    #[serde(rename = "exePath")]
    pub executable_path: String,

    /// OS-provided label, may be empty
    #[serde(rename = "displayName")]
    pub display_name: String,

    /// Session volume as scalar (0.0 to 1.0)
    #[serde(serialize_with = "serialize_level")]
    pub volume: f32,

    /// Session mute state
    #[serde(rename = "mute")]
    pub muted: bool,

    /// Instantaneous peak level (0.0 to 1.0) at enumeration time
    #[serde(serialize_with = "serialize_level")]
    pub peak: f32,
}

impl AudioSession {
    /// Create a record with every resolvable field at its default.
    pub fn new(session_id: String, process_id: u32) -> Self {
        Self {
            session_id,
            process_id,
            executable_name: String::new(),
            executable_path: String::new(),
            display_name: String::new(),
            volume: DEFAULT_VOLUME,
            muted: false,
            peak: DEFAULT_PEAK,
        }
    }

    /// True for the shared system sounds session.
    pub fn is_system(&self) -> bool {
        self.process_id == 0
    }
}

/// Live state of the default render endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MasterState {
    #[serde(serialize_with = "serialize_level")]
    pub volume: f32,
    pub mute: bool,
    #[serde(serialize_with = "serialize_level")]
    pub peak: f32,
}

impl Default for MasterState {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
            mute: false,
            peak: DEFAULT_PEAK,
        }
    }
}

/// Result of a snapshot read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub master: MasterState,

    /// Present only when sessions were requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<Vec<AudioSession>>,
}

/// Audio service error types.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("No default render device available")]
    NoDefaultDevice,

    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("COM initialization failed: {0}")]
    ComInitFailed(#[source] OsError),

    #[error("Failed to enumerate audio sessions: {0}")]
    EnumerationFailed(#[source] OsError),

    #[error("Volume control not available")]
    VolumeNotAvailable,

    #[error("Level meter not available")]
    MeterNotAvailable,

    #[error("Process {pid} could not be queried")]
    ProcessQueryFailed { pid: u32 },

    #[error("Operation rejected by the audio subsystem: {0}")]
    Rejected(String),

    #[error("Windows API error: {0}")]
    WindowsError(#[source] OsError),

    #[error("String conversion error: {0}")]
    StringConversion(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_unit_bounds_values() {
        assert_eq!(clamp_unit(1.5), 1.0);
        assert_eq!(clamp_unit(-0.2), 0.0);
        assert_eq!(clamp_unit(0.25), 0.25);
        assert_eq!(clamp_unit(f32::NAN), 0.0);
        assert_eq!(clamp_unit(f32::INFINITY), 1.0);
    }

    #[test]
    fn new_session_uses_defaults() {
        let session = AudioSession::new("id".to_string(), 0);
        assert!(session.is_system());
        assert_eq!(session.volume, 1.0);
        assert!(!session.muted);
        assert_eq!(session.peak, 0.0);
        assert!(session.display_name.is_empty());
    }

    #[test]
    fn snapshot_serializes_wire_names() {
        let mut session = AudioSession::new("{abc}".to_string(), 42);
        session.executable_name = "chrome.exe".to_string();
        let snapshot = Snapshot {
            master: MasterState::default(),
            sessions: Some(vec![session]),
        };

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["master"]["volume"], 1.0);
        assert_eq!(value["master"]["mute"], false);
        let entry = &value["sessions"][0];
        assert_eq!(entry["sessionId"], "{abc}");
        assert_eq!(entry["pid"], 42);
        assert_eq!(entry["exeName"], "chrome.exe");
        assert_eq!(entry["exePath"], "");
        assert_eq!(entry["mute"], false);
    }

    #[test]
    fn levels_serialize_without_f32_noise() {
        let mut session = AudioSession::new("{abc}".to_string(), 42);
        session.volume = 0.35;
        session.peak = 0.1;
        let master = MasterState {
            volume: 0.7,
            mute: false,
            peak: 0.0,
        };

        let entry = serde_json::to_value(&session).unwrap();
        assert_eq!(entry["volume"], 0.35);
        assert_eq!(entry["peak"], 0.1);
        assert_eq!(serde_json::to_value(master).unwrap()["volume"], 0.7);
        assert_eq!(widen_level(1.0), 1.0);
    }

    #[test]
    fn snapshot_without_sessions_omits_key() {
        let snapshot = Snapshot {
            master: MasterState::default(),
            sessions: None,
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert!(value.get("sessions").is_none());
    }
}
