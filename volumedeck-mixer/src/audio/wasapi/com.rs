//! COM lifetime helpers.

use crate::audio::session::AudioError;
use windows::core::PWSTR;
use windows::Win32::Foundation::RPC_E_CHANGED_MODE;
use windows::Win32::System::Com::{
    CoInitializeEx, CoTaskMemFree, CoUninitialize, COINIT_APARTMENTTHREADED,
};

/// COM initialization guard that uninitializes COM on drop.
pub struct ComGuard {
    initialized: bool,
}

impl ComGuard {
    /// Initialize COM for the current thread.
    ///
    /// A thread that already joined the multithreaded apartment keeps it;
    /// COM stays usable and the guard leaves it alone on drop.
    pub fn new() -> Result<Self, AudioError> {
        // Use apartment-threaded for UI compatibility
        let hr = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) };
        if hr == RPC_E_CHANGED_MODE {
            return Ok(Self { initialized: false });
        }

        hr.ok().map_err(AudioError::ComInitFailed)?;
        Ok(Self { initialized: true })
    }
}

impl Drop for ComGuard {
    fn drop(&mut self) {
        if self.initialized {
            unsafe {
                CoUninitialize();
            }
        }
    }
}

/// A string allocated by COM with `CoTaskMemAlloc`, freed on drop.
struct CoTaskString(PWSTR);

impl Drop for CoTaskString {
    fn drop(&mut self) {
        if !self.0.is_null() {
            unsafe {
                CoTaskMemFree(Some(self.0.as_ptr() as *const _));
            }
        }
    }
}

/// Take ownership of a COM-allocated string and convert it.
///
/// # Safety
/// `ptr` must be null or a valid, NUL-terminated string allocated with
/// `CoTaskMemAlloc` that the caller owns.
pub(crate) unsafe fn take_co_string(ptr: PWSTR) -> Result<String, AudioError> {
    let owned = CoTaskString(ptr);
    if owned.0.is_null() {
        return Ok(String::new());
    }

    owned
        .0
        .to_string()
        .map_err(|e| AudioError::StringConversion(e.to_string()))
}
