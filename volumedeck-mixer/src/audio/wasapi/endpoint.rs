//! Default render endpoint: master volume, peak meter and session enumeration.

use super::session::WasapiSession;
use crate::audio::backend::RenderEndpoint;
use crate::audio::session::AudioError;
use tracing::debug;
use windows::core::Interface;
use windows::Win32::Media::Audio::Endpoints::{IAudioEndpointVolume, IAudioMeterInformation};
use windows::Win32::Media::Audio::{IAudioSessionControl2, IAudioSessionManager2, IMMDevice};
use windows::Win32::System::Com::CLSCTX_ALL;

/// Handle to the default render device.
///
/// Each accessor activates its own interface, so nothing is held beyond
/// the device itself.
pub struct WasapiEndpoint {
    device: IMMDevice,
}

impl WasapiEndpoint {
    pub(crate) fn new(device: IMMDevice) -> Self {
        Self { device }
    }

    fn endpoint_volume(&self) -> Result<IAudioEndpointVolume, AudioError> {
        unsafe {
            self.device
                .Activate(CLSCTX_ALL, None)
                .map_err(|_| AudioError::VolumeNotAvailable)
        }
    }

    fn meter(&self) -> Result<IAudioMeterInformation, AudioError> {
        unsafe {
            self.device
                .Activate(CLSCTX_ALL, None)
                .map_err(|_| AudioError::MeterNotAvailable)
        }
    }

    fn session_manager(&self) -> Result<IAudioSessionManager2, AudioError> {
        unsafe {
            self.device
                .Activate(CLSCTX_ALL, None)
                .map_err(AudioError::EnumerationFailed)
        }
    }
}

impl RenderEndpoint for WasapiEndpoint {
    type Session = WasapiSession;

    fn volume(&self) -> Result<f32, AudioError> {
        unsafe {
            self.endpoint_volume()?
                .GetMasterVolumeLevelScalar()
                .map_err(AudioError::WindowsError)
        }
    }

    fn set_volume(&self, level: f32) -> Result<(), AudioError> {
        unsafe {
            self.endpoint_volume()?
                .SetMasterVolumeLevelScalar(level, std::ptr::null())
                .map_err(AudioError::WindowsError)
        }
    }

    fn mute(&self) -> Result<bool, AudioError> {
        unsafe {
            let muted = self
                .endpoint_volume()?
                .GetMute()
                .map_err(AudioError::WindowsError)?;
            Ok(muted.as_bool())
        }
    }

    fn set_mute(&self, muted: bool) -> Result<(), AudioError> {
        unsafe {
            self.endpoint_volume()?
                .SetMute(muted, std::ptr::null())
                .map_err(AudioError::WindowsError)
        }
    }

    fn peak(&self) -> Result<f32, AudioError> {
        unsafe {
            self.meter()?
                .GetPeakValue()
                .map_err(AudioError::WindowsError)
        }
    }

    fn sessions(&self) -> Result<Vec<WasapiSession>, AudioError> {
        unsafe {
            let enumerator = self
                .session_manager()?
                .GetSessionEnumerator()
                .map_err(AudioError::EnumerationFailed)?;

            let count = enumerator
                .GetCount()
                .map_err(AudioError::EnumerationFailed)?;

            let mut sessions = Vec::with_capacity(count.max(0) as usize);

            for i in 0..count {
                let control = match enumerator.GetSession(i) {
                    Ok(control) => control,
                    Err(e) => {
                        debug!(index = i, error = %e, "Skipping unreadable session");
                        continue;
                    }
                };

                // Sessions without the extended control have no identity to target
                match control.cast::<IAudioSessionControl2>() {
                    Ok(control) => sessions.push(WasapiSession::new(control)),
                    Err(e) => debug!(index = i, error = %e, "Skipping session without identity"),
                }
            }

            Ok(sessions)
        }
    }
}
