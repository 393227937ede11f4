//! Backend for hosts without a supported audio subsystem.
//!
//! Behaves like a machine with no output device configured: reads fall
//! back to defaults and writes report failure.

use super::backend::{AudioBackend, RenderEndpoint, SessionControl};
use super::session::AudioError;
use std::convert::Infallible;

#[derive(Debug, Clone, Copy, Default)]
pub struct NullBackend;

impl AudioBackend for NullBackend {
    type Endpoint = NullEndpoint;

    fn default_render_endpoint(&self) -> Result<NullEndpoint, AudioError> {
        Err(AudioError::NoDefaultDevice)
    }

    fn process_image_path(&self, pid: u32) -> Result<String, AudioError> {
        Err(AudioError::ProcessQueryFailed { pid })
    }
}

/// Endpoint type of [`NullBackend`]. Cannot be constructed.
#[derive(Debug)]
pub struct NullEndpoint(Infallible);

impl RenderEndpoint for NullEndpoint {
    type Session = NullSession;

    fn volume(&self) -> Result<f32, AudioError> {
        match self.0 {}
    }

    fn set_volume(&self, _level: f32) -> Result<(), AudioError> {
        match self.0 {}
    }

    fn mute(&self) -> Result<bool, AudioError> {
        match self.0 {}
    }

    fn set_mute(&self, _muted: bool) -> Result<(), AudioError> {
        match self.0 {}
    }

    fn peak(&self) -> Result<f32, AudioError> {
        match self.0 {}
    }

    fn sessions(&self) -> Result<Vec<NullSession>, AudioError> {
        match self.0 {}
    }
}

/// Session type of [`NullBackend`]. Cannot be constructed.
#[derive(Debug)]
pub struct NullSession(Infallible);

impl SessionControl for NullSession {
    fn session_id(&self) -> Result<String, AudioError> {
        match self.0 {}
    }

    fn process_id(&self) -> Result<u32, AudioError> {
        match self.0 {}
    }

    fn display_name(&self) -> Result<String, AudioError> {
        match self.0 {}
    }

    fn volume(&self) -> Result<f32, AudioError> {
        match self.0 {}
    }

    fn set_volume(&self, _level: f32) -> Result<(), AudioError> {
        match self.0 {}
    }

    fn mute(&self) -> Result<bool, AudioError> {
        match self.0 {}
    }

    fn set_mute(&self, _muted: bool) -> Result<(), AudioError> {
        match self.0 {}
    }

    fn peak(&self) -> Result<f32, AudioError> {
        match self.0 {}
    }
}
