//! Windows Core Audio backend.
//!
//! Uses the MMDevice API to find the default render endpoint and WASAPI
//! session interfaces to enumerate and control per-application sessions.
//!
//! Note: COM must be initialized on the calling thread (see [`ComGuard`]).
//! No COM object is kept between calls, so the backend may be used from
//! any thread that has COM initialized.

pub mod com;
pub mod endpoint;
pub mod process;
pub mod session;

pub use com::ComGuard;
pub use endpoint::WasapiEndpoint;
pub use session::WasapiSession;

use super::backend::AudioBackend;
use super::session::AudioError;
use windows::Win32::Media::Audio::{eMultimedia, eRender, IMMDeviceEnumerator, MMDeviceEnumerator};
use windows::Win32::System::Com::{CoCreateInstance, CLSCTX_ALL};

/// Audio backend over Windows Core Audio.
#[derive(Debug, Clone, Copy, Default)]
pub struct WasapiBackend;

impl WasapiBackend {
    pub fn new() -> Self {
        Self
    }

    fn device_enumerator(&self) -> Result<IMMDeviceEnumerator, AudioError> {
        unsafe {
            CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
                .map_err(AudioError::EnumerationFailed)
        }
    }
}

impl AudioBackend for WasapiBackend {
    type Endpoint = WasapiEndpoint;

    fn default_render_endpoint(&self) -> Result<WasapiEndpoint, AudioError> {
        let enumerator = self.device_enumerator()?;
        let device = unsafe { enumerator.GetDefaultAudioEndpoint(eRender, eMultimedia) }
            .map_err(|_| AudioError::NoDefaultDevice)?;
        Ok(WasapiEndpoint::new(device))
    }

    fn process_image_path(&self, pid: u32) -> Result<String, AudioError> {
        process::process_image_path(pid)
    }
}
