//! Method channel dispatch.
//!
//! Maps `(method, arguments)` requests from the host UI onto the [`Mixer`]
//! and wraps the outcome in a JSON response envelope:
//!
//! ```json
//! {"status":"success","result":true}
//! {"status":"error","code":"bad_args","message":"exeName required"}
//! {"status":"not_implemented","method":"reboot"}
//! ```

use crate::audio::backend::AudioBackend;
use crate::mixer::Mixer;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Channel name the host registers the mixer under.
pub const CHANNEL_NAME: &str = "volumedeck_mixer";

pub const GET_SNAPSHOT: &str = "getSnapshot";
pub const FIND_SESSION_ID_BY_EXE: &str = "findSessionIdByExe";
pub const SET_MASTER_VOLUME: &str = "setMasterVolume";
pub const SET_MASTER_MUTE: &str = "setMasterMute";
pub const SET_SESSION_VOLUME: &str = "setSessionVolume";
pub const SET_SESSION_MUTE: &str = "setSessionMute";

/// Request-level errors reported back to the caller.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("{0}")]
    BadArgs(&'static str),

    #[error("Failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ChannelError {
    /// Wire error code.
    pub fn code(&self) -> &'static str {
        match self {
            ChannelError::BadArgs(_) => "bad_args",
            ChannelError::Encode(_) => "encode_failed",
        }
    }
}

/// Response envelope for one method call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodResponse {
    Success { result: Value },
    Error { code: String, message: String },
    NotImplemented { method: String },
}

impl MethodResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, MethodResponse::Success { .. })
    }

    /// Result payload of a successful call.
    pub fn result(&self) -> Option<&Value> {
        match self {
            MethodResponse::Success { result } => Some(result),
            _ => None,
        }
    }

    /// Serialize the envelope to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"status":"error","code":"encode_failed","message":{}}}"#,
                Value::String(e.to_string())
            )
        })
    }
}

impl From<Result<Value, ChannelError>> for MethodResponse {
    fn from(result: Result<Value, ChannelError>) -> Self {
        match result {
            Ok(result) => MethodResponse::Success { result },
            Err(e) => MethodResponse::Error {
                code: e.code().to_string(),
                message: e.to_string(),
            },
        }
    }
}

/// Dispatch one method call against the mixer.
pub fn dispatch<B: AudioBackend>(mixer: &Mixer<B>, method: &str, arguments: &Value) -> MethodResponse {
    let result = match method {
        GET_SNAPSHOT => get_snapshot(mixer, arguments),
        FIND_SESSION_ID_BY_EXE => find_session_id_by_exe(mixer, arguments),
        SET_MASTER_VOLUME => set_master_volume(mixer, arguments),
        SET_MASTER_MUTE => set_master_mute(mixer, arguments),
        SET_SESSION_VOLUME => set_session_volume(mixer, arguments),
        SET_SESSION_MUTE => set_session_mute(mixer, arguments),
        _ => {
            return MethodResponse::NotImplemented {
                method: method.to_string(),
            }
        }
    };

    result.into()
}

/// Parse a JSON argument string. Empty input means "no arguments".
pub fn parse_arguments(json: &str) -> Result<Value, ChannelError> {
    if json.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(json).map_err(|_| ChannelError::BadArgs("arguments must be valid JSON"))
}

fn get_snapshot<B: AudioBackend>(mixer: &Mixer<B>, arguments: &Value) -> Result<Value, ChannelError> {
    let include_sessions = arguments
        .get("includeSessions")
        .and_then(Value::as_bool)
        .unwrap_or(true);
    Ok(serde_json::to_value(mixer.snapshot(include_sessions))?)
}

fn find_session_id_by_exe<B: AudioBackend>(
    mixer: &Mixer<B>,
    arguments: &Value,
) -> Result<Value, ChannelError> {
    let args = as_map(arguments)?;
    let exe_name = string_arg(args, "exeName").ok_or(ChannelError::BadArgs("exeName required"))?;
    Ok(mixer
        .find_session_id_by_exe(exe_name)
        .map(Value::String)
        .unwrap_or(Value::Null))
}

fn set_master_volume<B: AudioBackend>(mixer: &Mixer<B>, arguments: &Value) -> Result<Value, ChannelError> {
    let value = as_map(arguments)
        .ok()
        .and_then(|args| number_arg(args, "value"))
        .ok_or(ChannelError::BadArgs("value required"))?;
    Ok(Value::Bool(mixer.set_master_volume(value)))
}

fn set_master_mute<B: AudioBackend>(mixer: &Mixer<B>, arguments: &Value) -> Result<Value, ChannelError> {
    let mute = as_map(arguments)
        .ok()
        .and_then(|args| bool_arg(args, "mute"))
        .ok_or(ChannelError::BadArgs("mute required"))?;
    Ok(Value::Bool(mixer.set_master_mute(mute)))
}

fn set_session_volume<B: AudioBackend>(
    mixer: &Mixer<B>,
    arguments: &Value,
) -> Result<Value, ChannelError> {
    const REQUIRED: &str = "sessionId + value required";
    let args = as_map(arguments).map_err(|_| ChannelError::BadArgs(REQUIRED))?;
    match (string_arg(args, "sessionId"), number_arg(args, "value")) {
        (Some(session_id), Some(value)) => Ok(Value::Bool(mixer.set_session_volume(session_id, value))),
        _ => Err(ChannelError::BadArgs(REQUIRED)),
    }
}

fn set_session_mute<B: AudioBackend>(mixer: &Mixer<B>, arguments: &Value) -> Result<Value, ChannelError> {
    const REQUIRED: &str = "sessionId + mute required";
    let args = as_map(arguments).map_err(|_| ChannelError::BadArgs(REQUIRED))?;
    match (string_arg(args, "sessionId"), bool_arg(args, "mute")) {
        (Some(session_id), Some(mute)) => Ok(Value::Bool(mixer.set_session_mute(session_id, mute))),
        _ => Err(ChannelError::BadArgs(REQUIRED)),
    }
}

fn as_map(arguments: &Value) -> Result<&Map<String, Value>, ChannelError> {
    arguments
        .as_object()
        .ok_or(ChannelError::BadArgs("args must be map"))
}

fn string_arg<'a>(args: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

fn number_arg(args: &Map<String, Value>, key: &str) -> Option<f64> {
    args.get(key).and_then(Value::as_f64)
}

fn bool_arg(args: &Map<String, Value>, key: &str) -> Option<bool> {
    args.get(key).and_then(Value::as_bool)
}
