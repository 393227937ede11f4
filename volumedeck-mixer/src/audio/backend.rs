//! Backend traits for the platform audio subsystem.
//!
//! The session directory and mixer facade only talk to the OS through
//! these traits. Every handle returned here is owned by the caller and
//! released when dropped, so nothing outlives the call that acquired it.

use super::session::AudioError;

/// Entry point into a platform audio subsystem.
pub trait AudioBackend {
    type Endpoint: RenderEndpoint;

    /// Resolve the current default multimedia render endpoint.
    fn default_render_endpoint(&self) -> Result<Self::Endpoint, AudioError>;

    /// Resolve the full image path of a running process.
    fn process_image_path(&self, pid: u32) -> Result<String, AudioError>;
}

/// A render endpoint (output device) handle.
pub trait RenderEndpoint {
    type Session: SessionControl;

    /// Get the master volume level (0.0 to 1.0).
    fn volume(&self) -> Result<f32, AudioError>;

    /// Set the master volume level. Callers pass an already clamped value.
    fn set_volume(&self, level: f32) -> Result<(), AudioError>;

    fn mute(&self) -> Result<bool, AudioError>;

    fn set_mute(&self, muted: bool) -> Result<(), AudioError>;

    /// Get the current peak meter reading.
    fn peak(&self) -> Result<f32, AudioError>;

    /// Enumerate every session the OS currently reports for this endpoint.
    ///
    /// Sessions that cannot be opened at all are skipped; per-field failures
    /// are reported later through [`SessionControl`].
    fn sessions(&self) -> Result<Vec<Self::Session>, AudioError>;
}

/// A live handle to one audio session.
pub trait SessionControl {
    fn session_id(&self) -> Result<String, AudioError>;

    /// Owning process id, 0 for a session with no single owner.
    fn process_id(&self) -> Result<u32, AudioError>;

    fn display_name(&self) -> Result<String, AudioError>;

    fn volume(&self) -> Result<f32, AudioError>;

    fn set_volume(&self, level: f32) -> Result<(), AudioError>;

    fn mute(&self) -> Result<bool, AudioError>;

    fn set_mute(&self, muted: bool) -> Result<(), AudioError>;

    fn peak(&self) -> Result<f32, AudioError>;
}
