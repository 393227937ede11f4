//! FFI bindings for the VolumeDeck mixer.
//!
//! This crate provides C ABI functions for the host UI process. Mixer
//! operations go through a single method-call entry point that takes a
//! method name and JSON arguments and returns a JSON response envelope.
//! All functions use panic::catch_unwind to prevent Rust panics from
//! unwinding across the FFI boundary.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::ffi::{c_char, c_void, CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use volumedeck_mixer::channel::{self, MethodResponse, CHANNEL_NAME};
use volumedeck_mixer::{extract_icon_png, AudioBackend, AudioError, IconError, Mixer, PlatformBackend};

// ============================================================================
// Error Handling
// ============================================================================

/// Error codes returned by FFI functions.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,
    InvalidHandle = -1,
    InvalidArgument = -2,
    NoDevice = -3,
    ComError = -4,
    JsonError = -5,
    NoIcon = -6,
    Panic = -99,
}

impl From<&AudioError> for ErrorCode {
    fn from(err: &AudioError) -> Self {
        match err {
            AudioError::NoDefaultDevice => ErrorCode::NoDevice,
            AudioError::StringConversion(_) => ErrorCode::InvalidArgument,
            _ => ErrorCode::ComError,
        }
    }
}

impl From<&IconError> for ErrorCode {
    fn from(err: &IconError) -> Self {
        match err {
            IconError::EmptyPath => ErrorCode::InvalidArgument,
            _ => ErrorCode::NoIcon,
        }
    }
}

/// Thread-local storage for the last error.
thread_local! {
    static LAST_ERROR: RefCell<Option<(ErrorCode, String)>> = const { RefCell::new(None) };
}

fn set_last_error(code: ErrorCode, message: impl Into<String>) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = Some((code, message.into()));
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for engine creation.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Tracing filter directive, e.g. "debug" or "volumedeck_mixer=trace"
    #[serde(default)]
    pub log_level: Option<String>,
}

impl EngineConfig {
    /// Parse a JSON configuration. Returns the parse error alongside defaults.
    fn parse(json: Option<&str>) -> (Self, Option<serde_json::Error>) {
        match json {
            None => (Self::default(), None),
            Some(s) if s.trim().is_empty() => (Self::default(), None),
            Some(s) => match serde_json::from_str(s) {
                Ok(config) => (config, None),
                Err(e) => (Self::default(), Some(e)),
            },
        }
    }

    fn env_filter(&self) -> EnvFilter {
        self.log_level
            .as_deref()
            .and_then(|level| EnvFilter::try_new(level).ok())
            .or_else(|| EnvFilter::try_from_default_env().ok())
            .unwrap_or_else(|| EnvFilter::new("info"))
    }
}

/// Install the tracing subscriber once per process.
fn init_logging(config: &EngineConfig) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .with_writer(std::io::stderr)
        .try_init();
}

// ============================================================================
// Engine Handle Type
// ============================================================================

/// Opaque handle to the mixer engine. Actually points to a MixerEngine struct.
pub type MixerEngineHandle = *mut c_void;

/// Internal engine state.
struct MixerEngine<B> {
    // The backend holds no OS objects; COM objects are created per call.
    // This is safer for cross-thread usage.
    mixer: Mixer<B>,
}

impl<B: AudioBackend> MixerEngine<B> {
    fn new(backend: B) -> Self {
        Self {
            mixer: Mixer::new(backend),
        }
    }

    /// Handle one method call and return the serialized response envelope.
    fn call(&self, method: &str, args_json: &str) -> String {
        let response = channel::parse_arguments(args_json)
            .map(|arguments| channel::dispatch(&self.mixer, method, &arguments))
            .unwrap_or_else(|e| MethodResponse::Error {
                code: e.code().to_string(),
                message: e.to_string(),
            });

        if let MethodResponse::Error { code, message } = &response {
            warn!(method, code = code.as_str(), message = message.as_str(), "Method call rejected");
        }

        response.to_json()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Allocate a C string from a Rust string. Caller must free with volumedeck_free_string.
fn alloc_c_string(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        // String contained a null byte, replace with empty
        Err(_) => CString::default().into_raw(),
    }
}

/// Parse a C string to a Rust string slice.
unsafe fn parse_c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

/// Execute a closure with COM initialized for the current thread.
fn with_com<T, F: FnOnce() -> T>(f: F) -> Result<T, AudioError> {
    #[cfg(windows)]
    let _com = volumedeck_mixer::ComGuard::new()?;

    Ok(f())
}

// ============================================================================
// FFI Functions - Lifecycle
// ============================================================================

/// Create a new mixer engine instance.
///
/// # Arguments
/// * `config_json` - JSON configuration string (can be null for defaults)
///
/// # Returns
/// Handle to the engine, or null on failure. Check volumedeck_last_error_code() on failure.
///
/// # Safety
/// The returned handle must be freed with volumedeck_mixer_destroy().
#[no_mangle]
pub extern "C" fn volumedeck_mixer_create(config_json: *const c_char) -> MixerEngineHandle {
    clear_last_error();

    let result = panic::catch_unwind(|| {
        let json = unsafe { parse_c_str(config_json) };
        let (config, parse_error) = EngineConfig::parse(json);
        init_logging(&config);

        if let Some(e) = parse_error {
            warn!(error = %e, "Invalid engine config, using defaults");
        }

        let engine = Box::new(MixerEngine::new(PlatformBackend::default()));
        info!(channel = CHANNEL_NAME, "Mixer engine created");
        Box::into_raw(engine) as MixerEngineHandle
    });

    match result {
        Ok(handle) => handle,
        Err(_) => {
            set_last_error(ErrorCode::Panic, "Panic during engine creation");
            ptr::null_mut()
        }
    }
}

/// Destroy a mixer engine instance.
///
/// # Safety
/// The handle must have been created by volumedeck_mixer_create() and must not be used after this call.
#[no_mangle]
pub extern "C" fn volumedeck_mixer_destroy(handle: MixerEngineHandle) {
    if handle.is_null() {
        return;
    }

    let _ = panic::catch_unwind(|| unsafe {
        let _ = Box::from_raw(handle as *mut MixerEngine<PlatformBackend>);
    });
}

// ============================================================================
// FFI Functions - Method Channel
// ============================================================================

/// Invoke a mixer method.
///
/// # Arguments
/// * `handle` - Engine handle
/// * `method` - Method name (UTF-8), e.g. "getSnapshot"
/// * `args_json` - JSON object with the method arguments (can be null)
///
/// # Returns
/// JSON response envelope with `status` of `success`, `error` or
/// `not_implemented`. Caller must free with volumedeck_free_string().
/// Returns null only if the call could not be made at all; check
/// volumedeck_last_error_code() in that case.
#[no_mangle]
pub extern "C" fn volumedeck_mixer_call(
    handle: MixerEngineHandle,
    method: *const c_char,
    args_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if handle.is_null() {
        set_last_error(ErrorCode::InvalidHandle, "Engine handle is null");
        return ptr::null_mut();
    }

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let engine = unsafe { &*(handle as *const MixerEngine<PlatformBackend>) };

        let method = match unsafe { parse_c_str(method) } {
            Some(m) => m,
            None => {
                set_last_error(ErrorCode::InvalidArgument, "Invalid method name");
                return None;
            }
        };

        if !args_json.is_null() && unsafe { parse_c_str(args_json) }.is_none() {
            set_last_error(ErrorCode::JsonError, "Arguments are not valid UTF-8");
            return None;
        }
        let args = unsafe { parse_c_str(args_json) }.unwrap_or("");

        match with_com(|| engine.call(method, args)) {
            Ok(json) => Some(alloc_c_string(&json)),
            Err(e) => {
                set_last_error(ErrorCode::from(&e), e.to_string());
                None
            }
        }
    }));

    match result {
        Ok(Some(json)) => json,
        Ok(None) => ptr::null_mut(),
        Err(_) => {
            set_last_error(ErrorCode::Panic, "Panic during method call");
            ptr::null_mut()
        }
    }
}

// ============================================================================
// FFI Functions - Icons
// ============================================================================

/// Extract the icon of an executable as PNG bytes.
///
/// # Arguments
/// * `path` - Full executable path (UTF-8)
/// * `size` - Requested size in pixels; 16 or less gives a 16x16 icon, otherwise 32x32
/// * `out_len` - Receives the number of bytes returned
///
/// # Returns
/// PNG bytes, or null with `*out_len == 0` if no icon is available.
/// Caller must free with volumedeck_free_bytes().
#[no_mangle]
pub extern "C" fn volumedeck_icon_png(path: *const c_char, size: u32, out_len: *mut usize) -> *mut u8 {
    clear_last_error();

    if out_len.is_null() {
        set_last_error(ErrorCode::InvalidArgument, "out_len is null");
        return ptr::null_mut();
    }
    unsafe {
        *out_len = 0;
    }

    let result = panic::catch_unwind(|| {
        let path = match unsafe { parse_c_str(path) } {
            Some(p) => p,
            None => {
                set_last_error(ErrorCode::InvalidArgument, "Invalid path");
                return ptr::null_mut();
            }
        };

        match with_com(|| extract_icon_png(path, size)) {
            Ok(Ok(png)) => {
                let bytes = png.into_boxed_slice();
                unsafe {
                    *out_len = bytes.len();
                }
                Box::into_raw(bytes) as *mut u8
            }
            Ok(Err(e)) => {
                set_last_error(ErrorCode::from(&e), e.to_string());
                ptr::null_mut()
            }
            Err(e) => {
                set_last_error(ErrorCode::from(&e), e.to_string());
                ptr::null_mut()
            }
        }
    });

    match result {
        Ok(bytes) => bytes,
        Err(_) => {
            set_last_error(ErrorCode::Panic, "Panic during icon extraction");
            ptr::null_mut()
        }
    }
}

// ============================================================================
// FFI Functions - Memory Management
// ============================================================================

/// Free a string allocated by this library.
///
/// # Safety
/// The pointer must have been returned by one of the volumedeck_* functions.
/// Do not call this on strings from other sources.
#[no_mangle]
pub extern "C" fn volumedeck_free_string(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }

    let _ = panic::catch_unwind(|| unsafe {
        let _ = CString::from_raw(ptr);
    });
}

/// Free a byte buffer returned by volumedeck_icon_png().
///
/// # Safety
/// `ptr` and `len` must be exactly the pointer and length returned together.
#[no_mangle]
pub extern "C" fn volumedeck_free_bytes(ptr: *mut u8, len: usize) {
    if ptr.is_null() {
        return;
    }

    let _ = panic::catch_unwind(|| unsafe {
        let _ = Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len));
    });
}

// ============================================================================
// FFI Functions - Error Handling
// ============================================================================

/// Get the last error code.
///
/// # Returns
/// The error code from the last failed operation, or 0 if no error.
#[no_mangle]
pub extern "C" fn volumedeck_last_error_code() -> i32 {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|(code, _)| *code as i32)
            .unwrap_or(0)
    })
}

/// Get the last error message.
///
/// # Returns
/// Error message string. Caller must free with volumedeck_free_string().
/// Returns null if no error.
#[no_mangle]
pub extern "C" fn volumedeck_last_error_message() -> *mut c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|(_, msg)| alloc_c_string(msg))
            .unwrap_or(ptr::null_mut())
    })
}

// ============================================================================
// FFI Functions - Utility
// ============================================================================

/// Get the library version.
///
/// # Returns
/// Version string. Caller must free with volumedeck_free_string().
#[no_mangle]
pub extern "C" fn volumedeck_version() -> *mut c_char {
    alloc_c_string(env!("CARGO_PKG_VERSION"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use volumedeck_mixer::audio::{MemoryBackend, MemorySession};

    /// Call through the C ABI and parse the returned envelope.
    fn ffi_call(handle: MixerEngineHandle, method: &str, args: Option<&str>) -> Value {
        let method = CString::new(method).unwrap();
        let args = args.map(|a| CString::new(a).unwrap());
        let args_ptr = args.as_ref().map(|a| a.as_ptr()).unwrap_or(ptr::null());

        let out = volumedeck_mixer_call(handle, method.as_ptr(), args_ptr);
        assert!(!out.is_null());
        let text = unsafe { CStr::from_ptr(out) }.to_str().unwrap().to_string();
        volumedeck_free_string(out);
        serde_json::from_str(&text).unwrap()
    }

    fn memory_engine() -> (MemoryBackend, MixerEngine<MemoryBackend>) {
        let backend = MemoryBackend::with_default_device();
        (backend.clone(), MixerEngine::new(backend))
    }

    #[test]
    fn test_error_code_conversion() {
        assert_eq!(ErrorCode::from(&AudioError::NoDefaultDevice), ErrorCode::NoDevice);
        assert_eq!(ErrorCode::from(&AudioError::VolumeNotAvailable), ErrorCode::ComError);
        assert_eq!(ErrorCode::from(&IconError::EmptyPath), ErrorCode::InvalidArgument);
        assert_eq!(
            ErrorCode::from(&IconError::NoIcon {
                path: "x".to_string()
            }),
            ErrorCode::NoIcon
        );
    }

    #[test]
    fn test_engine_lifecycle() {
        let handle = volumedeck_mixer_create(ptr::null());
        assert!(!handle.is_null());
        volumedeck_mixer_destroy(handle);
    }

    #[test]
    fn test_engine_accepts_bad_config() {
        let config = CString::new("{not json").unwrap();
        let handle = volumedeck_mixer_create(config.as_ptr());
        assert!(!handle.is_null());
        volumedeck_mixer_destroy(handle);
    }

    #[test]
    fn test_version() {
        let version = volumedeck_version();
        assert!(!version.is_null());
        unsafe {
            let s = CStr::from_ptr(version).to_str().unwrap();
            assert!(!s.is_empty());
        }
        volumedeck_free_string(version);
    }

    #[test]
    fn test_config_parsing() {
        let (config, error) = EngineConfig::parse(Some(r#"{"log_level":"debug"}"#));
        assert!(error.is_none());
        assert_eq!(config.log_level.as_deref(), Some("debug"));

        let (config, error) = EngineConfig::parse(Some("[1,2"));
        assert!(error.is_some());
        assert!(config.log_level.is_none());

        let (config, error) = EngineConfig::parse(None);
        assert!(error.is_none());
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_call_snapshot_through_ffi() {
        let handle = volumedeck_mixer_create(ptr::null());

        let response = ffi_call(handle, "getSnapshot", Some(r#"{"includeSessions":false}"#));
        assert_eq!(response["status"], "success");
        assert!(response["result"]["master"]["volume"].is_number());
        assert!(response["result"].get("sessions").is_none());

        let response = ffi_call(handle, "getSnapshot", None);
        assert!(response["result"]["sessions"].is_array());

        volumedeck_mixer_destroy(handle);
    }

    #[test]
    fn test_call_errors_through_ffi() {
        let handle = volumedeck_mixer_create(ptr::null());

        let response = ffi_call(handle, "setSessionVolume", Some(r#"{"sessionId":"{x}"}"#));
        assert_eq!(response["status"], "error");
        assert_eq!(response["code"], "bad_args");

        let response = ffi_call(handle, "findSessionIdByExe", Some("{oops"));
        assert_eq!(response["code"], "bad_args");

        let response = ffi_call(handle, "launchRocket", None);
        assert_eq!(response["status"], "not_implemented");
        assert_eq!(response["method"], "launchRocket");

        let response = ffi_call(handle, "setSessionMute", Some(r#"{"sessionId":"{missing}","mute":true}"#));
        assert_eq!(response["result"], false);

        volumedeck_mixer_destroy(handle);
    }

    #[test]
    fn test_call_with_null_handle() {
        let method = CString::new("getSnapshot").unwrap();
        let out = volumedeck_mixer_call(ptr::null_mut(), method.as_ptr(), ptr::null());
        assert!(out.is_null());
        assert_eq!(volumedeck_last_error_code(), ErrorCode::InvalidHandle as i32);

        let message = volumedeck_last_error_message();
        assert!(!message.is_null());
        volumedeck_free_string(message);
    }

    #[test]
    fn test_call_with_null_method() {
        let handle = volumedeck_mixer_create(ptr::null());
        let out = volumedeck_mixer_call(handle, ptr::null(), ptr::null());
        assert!(out.is_null());
        assert_eq!(volumedeck_last_error_code(), ErrorCode::InvalidArgument as i32);
        volumedeck_mixer_destroy(handle);
    }

    #[test]
    fn test_engine_call_against_memory_backend() {
        let (backend, engine) = memory_engine();
        backend.add_process(31, r"C:\Apps\Spotify.exe");
        backend.add_session(MemorySession::new("{spotify}", 31).with_volume(0.8));

        let found: Value = serde_json::from_str(&engine.call("findSessionIdByExe", r#"{"exeName":"SPOTIFY.EXE"}"#)).unwrap();
        assert_eq!(found, json!({"status": "success", "result": "{spotify}"}));

        let set: Value = serde_json::from_str(&engine.call(
            "setSessionVolume",
            r#"{"sessionId":"{spotify}","value":-3}"#,
        ))
        .unwrap();
        assert_eq!(set["result"], true);
        assert_eq!(backend.session("{spotify}").unwrap().volume, 0.0);

        let snapshot: Value = serde_json::from_str(&engine.call("getSnapshot", "")).unwrap();
        let session = &snapshot["result"]["sessions"][0];
        assert_eq!(session["exeName"], "spotify.exe");
        assert_eq!(session["exePath"], r"C:\Apps\Spotify.exe");
        assert_eq!(session["volume"], 0.0);
    }

    #[test]
    fn test_icon_requires_out_len() {
        let path = CString::new(r"C:\Windows\notepad.exe").unwrap();
        let bytes = volumedeck_icon_png(path.as_ptr(), 32, ptr::null_mut());
        assert!(bytes.is_null());
        assert_eq!(volumedeck_last_error_code(), ErrorCode::InvalidArgument as i32);
    }

    #[test]
    fn test_icon_for_empty_path() {
        let path = CString::new("").unwrap();
        let mut len = 99usize;
        let bytes = volumedeck_icon_png(path.as_ptr(), 32, &mut len);
        assert!(bytes.is_null());
        assert_eq!(len, 0);
        assert_eq!(volumedeck_last_error_code(), ErrorCode::InvalidArgument as i32);
        volumedeck_free_bytes(bytes, len);
    }
}
