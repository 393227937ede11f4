//! Executable path resolution for session owners.
//!
//! Tries the direct image-name query first, which works with limited
//! access rights, then falls back to the process module table.

use crate::audio::session::AudioError;
use windows::core::PWSTR;
use windows::Win32::Foundation::{CloseHandle, HANDLE, HMODULE};
use windows::Win32::System::ProcessStatus::{EnumProcessModules, GetModuleFileNameExW};
use windows::Win32::System::Threading::{
    OpenProcess, QueryFullProcessImageNameW, PROCESS_ACCESS_RIGHTS, PROCESS_NAME_WIN32,
    PROCESS_QUERY_INFORMATION, PROCESS_QUERY_LIMITED_INFORMATION, PROCESS_VM_READ,
};

/// Long-path limit for image names.
const MAX_IMAGE_PATH: usize = 32_768;

/// Resolve the full image path of `pid`.
pub fn process_image_path(pid: u32) -> Result<String, AudioError> {
    let direct = ProcessHandle::open(pid, PROCESS_QUERY_LIMITED_INFORMATION)
        .and_then(|process| process.full_image_name());
    if let Ok(path) = direct {
        return Ok(path);
    }

    ProcessHandle::open(pid, PROCESS_QUERY_INFORMATION | PROCESS_VM_READ)?.main_module_file_name()
}

/// Process handle closed on drop.
struct ProcessHandle {
    handle: HANDLE,
    pid: u32,
}

impl ProcessHandle {
    fn open(pid: u32, access: PROCESS_ACCESS_RIGHTS) -> Result<Self, AudioError> {
        let handle = unsafe { OpenProcess(access, false, pid) }
            .map_err(|_| AudioError::ProcessQueryFailed { pid })?;
        Ok(Self { handle, pid })
    }

    fn full_image_name(&self) -> Result<String, AudioError> {
        let mut buffer = vec![0u16; MAX_IMAGE_PATH];
        let mut size = buffer.len() as u32;

        unsafe {
            QueryFullProcessImageNameW(
                self.handle,
                PROCESS_NAME_WIN32,
                PWSTR(buffer.as_mut_ptr()),
                &mut size,
            )
            .map_err(|_| self.failed())?;
        }

        Ok(String::from_utf16_lossy(&buffer[..size as usize]))
    }

    fn main_module_file_name(&self) -> Result<String, AudioError> {
        let mut module = HMODULE::default();
        let mut needed = 0u32;

        unsafe {
            EnumProcessModules(
                self.handle,
                &mut module,
                std::mem::size_of::<HMODULE>() as u32,
                &mut needed,
            )
            .map_err(|_| self.failed())?;
        }

        let mut buffer = vec![0u16; MAX_IMAGE_PATH];
        let len = unsafe { GetModuleFileNameExW(self.handle, module, &mut buffer) } as usize;
        if len == 0 {
            return Err(self.failed());
        }

        Ok(String::from_utf16_lossy(&buffer[..len]))
    }

    fn failed(&self) -> AudioError {
        AudioError::ProcessQueryFailed { pid: self.pid }
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.handle);
        }
    }
}
