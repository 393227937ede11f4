//! Per-session controls using IAudioSessionControl2 and ISimpleAudioVolume.

use super::com::take_co_string;
use crate::audio::backend::SessionControl;
use crate::audio::session::AudioError;
use windows::core::Interface;
use windows::Win32::Media::Audio::Endpoints::IAudioMeterInformation;
use windows::Win32::Media::Audio::{IAudioSessionControl2, ISimpleAudioVolume};

/// Live handle to one WASAPI audio session.
pub struct WasapiSession {
    control: IAudioSessionControl2,
}

impl WasapiSession {
    pub(crate) fn new(control: IAudioSessionControl2) -> Self {
        Self { control }
    }

    fn simple_volume(&self) -> Result<ISimpleAudioVolume, AudioError> {
        self.control
            .cast()
            .map_err(|_| AudioError::VolumeNotAvailable)
    }

    fn meter(&self) -> Result<IAudioMeterInformation, AudioError> {
        self.control
            .cast()
            .map_err(|_| AudioError::MeterNotAvailable)
    }
}

impl SessionControl for WasapiSession {
    fn session_id(&self) -> Result<String, AudioError> {
        unsafe {
            let id = self
                .control
                .GetSessionIdentifier()
                .map_err(AudioError::WindowsError)?;
            take_co_string(id)
        }
    }

    fn process_id(&self) -> Result<u32, AudioError> {
        unsafe { self.control.GetProcessId().map_err(AudioError::WindowsError) }
    }

    fn display_name(&self) -> Result<String, AudioError> {
        unsafe {
            let name = self
                .control
                .GetDisplayName()
                .map_err(AudioError::WindowsError)?;
            take_co_string(name)
        }
    }

    fn volume(&self) -> Result<f32, AudioError> {
        unsafe {
            self.simple_volume()?
                .GetMasterVolume()
                .map_err(AudioError::WindowsError)
        }
    }

    fn set_volume(&self, level: f32) -> Result<(), AudioError> {
        unsafe {
            self.simple_volume()?
                .SetMasterVolume(level, std::ptr::null())
                .map_err(AudioError::WindowsError)
        }
    }

    fn mute(&self) -> Result<bool, AudioError> {
        unsafe {
            let muted = self
                .simple_volume()?
                .GetMute()
                .map_err(AudioError::WindowsError)?;
            Ok(muted.as_bool())
        }
    }

    fn set_mute(&self, muted: bool) -> Result<(), AudioError> {
        unsafe {
            self.simple_volume()?
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
}
