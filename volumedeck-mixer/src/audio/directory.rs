//! Session directory for the default render device.
//!
//! Every call re-enumerates the OS session set. Nothing is cached between
//! calls, so records and handles always describe the live state.

use super::backend::{AudioBackend, RenderEndpoint, SessionControl};
use super::identity;
use super::session::{clamp_unit, AudioError, AudioSession, DEFAULT_PEAK, DEFAULT_VOLUME};
use tracing::debug;

/// Session handle type produced by a backend's render endpoint.
pub type SessionHandle<B> = <<B as AudioBackend>::Endpoint as RenderEndpoint>::Session;

/// Enumerates and resolves audio sessions through an [`AudioBackend`].
pub struct SessionDirectory<B> {
    backend: B,
}

impl<B: AudioBackend> SessionDirectory<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Get the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Resolve the current default render device.
    pub fn resolve_default_render_device(&self) -> Result<B::Endpoint, AudioError> {
        self.backend.default_render_endpoint()
    }

    /// List every session of the default render device.
    ///
    /// Best effort: a missing device yields an empty list and a session whose
    /// metadata cannot be read is reported with default values.
    pub fn list_sessions(&self) -> Vec<AudioSession> {
        let controls = match self.session_controls() {
            Ok(controls) => controls,
            Err(e) => {
                debug!(error = %e, "Session enumeration unavailable");
                return Vec::new();
            }
        };

        controls
            .iter()
            .enumerate()
            .map(|(index, control)| self.describe(index, control))
            .collect()
    }

    /// Find the first session whose executable matches `name`.
    ///
    /// Matching is case-insensitive and compares basenames only.
    pub fn find_session_id_by_executable_name(&self, name: &str) -> Option<String> {
        let wanted = identity::basename_lower(name);
        self.list_sessions()
            .into_iter()
            .find(|s| identity::basename_lower(&s.executable_name) == wanted)
            .map(|s| s.session_id)
    }

    /// Resolve a live handle for `session_id` from a fresh enumeration.
    pub fn resolve_session(&self, session_id: &str) -> Result<SessionHandle<B>, AudioError> {
        let not_found = || AudioError::SessionNotFound {
            session_id: session_id.to_string(),
        };

        if session_id.is_empty() {
            return Err(not_found());
        }

        self.session_controls()?
            .into_iter()
            .find(|control| {
                control
                    .session_id()
                    .map(|id| id == session_id)
                    .unwrap_or(false)
            })
            .ok_or_else(not_found)
    }

    fn session_controls(&self) -> Result<Vec<SessionHandle<B>>, AudioError> {
        let endpoint = self.resolve_default_render_device()?;
        endpoint.sessions()
    }

    /// Build a session record, degrading each unreadable field to its default.
    fn describe(&self, index: usize, control: &SessionHandle<B>) -> AudioSession {
        let session_id = field_or(control.session_id(), index, "session_id", String::new());
        let process_id = field_or(control.process_id(), index, "process_id", 0);

        let executable_path = if process_id == 0 {
            String::new()
        } else {
            field_or(
                self.backend.process_image_path(process_id),
                index,
                "executable_path",
                String::new(),
            )
        };

        AudioSession {
            executable_name: identity::executable_name(process_id, &executable_path),
            executable_path,
            display_name: field_or(control.display_name(), index, "display_name", String::new()),
            volume: clamp_unit(field_or(control.volume(), index, "volume", DEFAULT_VOLUME)),
            muted: field_or(control.mute(), index, "mute", false),
            peak: clamp_unit(field_or(control.peak(), index, "peak", DEFAULT_PEAK)),
            session_id,
            process_id,
        }
    }
}

fn field_or<T>(result: Result<T, AudioError>, index: usize, field: &str, fallback: T) -> T {
    result.unwrap_or_else(|e| {
        debug!(index, field, error = %e, "Session field unavailable, using default");
        fallback
    })
}
