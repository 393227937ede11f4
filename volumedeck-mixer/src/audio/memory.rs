//! In-memory audio subsystem.
//!
//! Simulates a default render device with a live, mutable session set.
//! Handles look their session up on every access, so a session removed
//! after enumeration behaves like an exited process. Only built for
//! tests and with the `memory-backend` feature.

use super::backend::{AudioBackend, RenderEndpoint, SessionControl};
use super::session::{AudioError, DEFAULT_PEAK, DEFAULT_VOLUME};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A simulated audio session.
#[derive(Debug, Clone, PartialEq)]
pub struct MemorySession {
    pub session_id: String,
    pub process_id: u32,
    pub display_name: String,
    pub volume: f32,
    pub muted: bool,
    pub peak: f32,
    has_identifier: bool,
    has_volume_control: bool,
    has_meter: bool,
    rejects_writes: bool,
    key: u64,
}

impl MemorySession {
    pub fn new(session_id: &str, process_id: u32) -> Self {
        Self {
            session_id: session_id.to_string(),
            process_id,
            display_name: String::new(),
            volume: DEFAULT_VOLUME,
            muted: false,
            peak: DEFAULT_PEAK,
            has_identifier: true,
            has_volume_control: true,
            has_meter: true,
            rejects_writes: false,
            key: 0,
        }
    }

    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = name.to_string();
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    pub fn with_peak(mut self, peak: f32) -> Self {
        self.peak = peak;
        self
    }

    /// The session reports no identifier.
    pub fn without_identifier(mut self) -> Self {
        self.has_identifier = false;
        self
    }

    /// The session exposes no volume control.
    pub fn without_volume_control(mut self) -> Self {
        self.has_volume_control = false;
        self
    }

    /// The session exposes no peak meter.
    pub fn without_meter(mut self) -> Self {
        self.has_meter = false;
        self
    }

    /// Every volume or mute write is rejected.
    pub fn rejecting_writes(mut self) -> Self {
        self.rejects_writes = true;
        self
    }
}

#[derive(Debug)]
struct MemoryDevice {
    volume: f32,
    muted: bool,
    peak: f32,
    has_meter: bool,
    rejects_writes: bool,
    sessions: Vec<MemorySession>,
}

impl Default for MemoryDevice {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
            muted: false,
            peak: DEFAULT_PEAK,
            has_meter: true,
            rejects_writes: false,
            sessions: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    device: Option<MemoryDevice>,
    processes: HashMap<u32, String>,
    next_key: u64,
}

impl MemoryState {
    fn device(&self) -> Result<&MemoryDevice, AudioError> {
        self.device.as_ref().ok_or(AudioError::NoDefaultDevice)
    }

    fn device_mut(&mut self) -> Result<&mut MemoryDevice, AudioError> {
        self.device.as_mut().ok_or(AudioError::NoDefaultDevice)
    }
}

/// Shared handle to a simulated audio subsystem.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    /// Create a backend with no render device configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend with an empty default render device.
    pub fn with_default_device() -> Self {
        let backend = Self::new();
        backend.set_device_present(true);
        backend
    }

    /// Plug or unplug the default render device.
    ///
    /// Unplugging drops every session of the device.
    pub fn set_device_present(&self, present: bool) {
        let mut state = self.lock();
        match (present, state.device.is_some()) {
            (true, false) => state.device = Some(MemoryDevice::default()),
            (false, true) => state.device = None,
            _ => {}
        }
    }

    /// Register a running process and its image path.
    pub fn add_process(&self, pid: u32, image_path: &str) {
        self.lock().processes.insert(pid, image_path.to_string());
    }

    /// Add a session to the default device. Ignored when no device is present.
    pub fn add_session(&self, mut session: MemorySession) {
        let mut state = self.lock();
        state.next_key += 1;
        session.key = state.next_key;
        if let Some(device) = state.device.as_mut() {
            device.sessions.push(session);
        }
    }

    /// Remove every session with the given identifier. Returns true if any was removed.
    pub fn remove_session(&self, session_id: &str) -> bool {
        let mut state = self.lock();
        match state.device.as_mut() {
            Some(device) => {
                let before = device.sessions.len();
                device.sessions.retain(|s| s.session_id != session_id);
                device.sessions.len() != before
            }
            None => false,
        }
    }

    /// Get a copy of the first session with the given identifier.
    pub fn session(&self, session_id: &str) -> Option<MemorySession> {
        let state = self.lock();
        state
            .device
            .as_ref()?
            .sessions
            .iter()
            .find(|s| s.session_id == session_id)
            .cloned()
    }

    /// Set the raw master state, bypassing clamping.
    pub fn set_master(&self, volume: f32, muted: bool, peak: f32) {
        if let Some(device) = self.lock().device.as_mut() {
            device.volume = volume;
            device.muted = muted;
            device.peak = peak;
        }
    }

    /// Make every master volume or mute write fail.
    pub fn reject_master_writes(&self, reject: bool) {
        if let Some(device) = self.lock().device.as_mut() {
            device.rejects_writes = reject;
        }
    }

    /// Attach or detach the level meter of the default device.
    pub fn set_master_meter(&self, present: bool) {
        if let Some(device) = self.lock().device.as_mut() {
            device.has_meter = present;
        }
    }

    /// Raw master volume as last written, if a device is present.
    pub fn master_volume(&self) -> Option<f32> {
        self.lock().device.as_ref().map(|d| d.volume)
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AudioBackend for MemoryBackend {
    type Endpoint = MemoryEndpoint;

    fn default_render_endpoint(&self) -> Result<MemoryEndpoint, AudioError> {
        self.lock().device()?;
        Ok(MemoryEndpoint {
            backend: self.clone(),
        })
    }

    fn process_image_path(&self, pid: u32) -> Result<String, AudioError> {
        self.lock()
            .processes
            .get(&pid)
            .cloned()
            .ok_or(AudioError::ProcessQueryFailed { pid })
    }
}

/// Handle to the simulated default render device.
#[derive(Debug, Clone)]
pub struct MemoryEndpoint {
    backend: MemoryBackend,
}

impl MemoryEndpoint {
    fn write(&self, apply: impl FnOnce(&mut MemoryDevice)) -> Result<(), AudioError> {
        let mut state = self.backend.lock();
        let device = state.device_mut()?;
        if device.rejects_writes {
            return Err(AudioError::Rejected("master write rejected".to_string()));
        }
        apply(device);
        Ok(())
    }
}

impl RenderEndpoint for MemoryEndpoint {
    type Session = MemorySessionHandle;

    fn volume(&self) -> Result<f32, AudioError> {
        Ok(self.backend.lock().device()?.volume)
    }

    fn set_volume(&self, level: f32) -> Result<(), AudioError> {
        self.write(|device| device.volume = level)
    }

    fn mute(&self) -> Result<bool, AudioError> {
        Ok(self.backend.lock().device()?.muted)
    }

    fn set_mute(&self, muted: bool) -> Result<(), AudioError> {
        self.write(|device| device.muted = muted)
    }

    fn peak(&self) -> Result<f32, AudioError> {
        let state = self.backend.lock();
        let device = state.device()?;
        if device.has_meter {
            Ok(device.peak)
        } else {
            Err(AudioError::MeterNotAvailable)
        }
    }

    fn sessions(&self) -> Result<Vec<MemorySessionHandle>, AudioError> {
        let state = self.backend.lock();
        Ok(state
            .device()?
            .sessions
            .iter()
            .map(|s| MemorySessionHandle {
                backend: self.backend.clone(),
                key: s.key,
            })
            .collect())
    }
}

/// Live handle to one simulated session.
#[derive(Debug, Clone)]
pub struct MemorySessionHandle {
    backend: MemoryBackend,
    key: u64,
}

impl MemorySessionHandle {
    fn read<T>(&self, f: impl FnOnce(&MemorySession) -> Result<T, AudioError>) -> Result<T, AudioError> {
        let state = self.backend.lock();
        let session = state
            .device()?
            .sessions
            .iter()
            .find(|s| s.key == self.key)
            .ok_or_else(|| self.exited())?;
        f(session)
    }

    fn write(&self, apply: impl FnOnce(&mut MemorySession)) -> Result<(), AudioError> {
        let mut state = self.backend.lock();
        let session = state
            .device_mut()?
            .sessions
            .iter_mut()
            .find(|s| s.key == self.key)
            .ok_or_else(|| self.exited())?;
        if !session.has_volume_control {
            return Err(AudioError::VolumeNotAvailable);
        }
        if session.rejects_writes {
            return Err(AudioError::Rejected("session write rejected".to_string()));
        }
        apply(session);
        Ok(())
    }

    fn exited(&self) -> AudioError {
        AudioError::SessionNotFound {
            session_id: format!("#{}", self.key),
        }
    }
}

impl SessionControl for MemorySessionHandle {
    fn session_id(&self) -> Result<String, AudioError> {
        self.read(|s| {
            if s.has_identifier {
                Ok(s.session_id.clone())
            } else {
                Err(AudioError::Rejected("session identifier unavailable".to_string()))
            }
        })
    }

    fn process_id(&self) -> Result<u32, AudioError> {
        self.read(|s| Ok(s.process_id))
    }

    fn display_name(&self) -> Result<String, AudioError> {
        self.read(|s| Ok(s.display_name.clone()))
    }

    fn volume(&self) -> Result<f32, AudioError> {
        self.read(|s| {
            if s.has_volume_control {
                Ok(s.volume)
            } else {
                Err(AudioError::VolumeNotAvailable)
            }
        })
    }

    fn set_volume(&self, level: f32) -> Result<(), AudioError> {
        self.write(|s| s.volume = level)
    }

    fn mute(&self) -> Result<bool, AudioError> {
        self.read(|s| {
            if s.has_volume_control {
                Ok(s.muted)
            } else {
                Err(AudioError::VolumeNotAvailable)
            }
        })
    }

    fn set_mute(&self, muted: bool) -> Result<(), AudioError> {
        self.write(|s| s.muted = muted)
    }

    fn peak(&self) -> Result<f32, AudioError> {
        self.read(|s| {
            if s.has_meter {
                Ok(s.peak)
            } else {
                Err(AudioError::MeterNotAvailable)
            }
        })
    }
}
