//! Executable icon extraction.
//!
//! Renders the shell icon of an executable into a 16x16 or 32x32 bitmap
//! and encodes it as PNG for the front-end session list.

use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use thiserror::Error;

/// Small shell icon edge in pixels.
pub const SMALL_ICON_SIZE: u32 = 16;

/// Large shell icon edge in pixels.
pub const LARGE_ICON_SIZE: u32 = 32;

/// Icon service error types.
#[derive(Debug, Error)]
pub enum IconError {
    #[error("No executable path given")]
    EmptyPath,

    #[error("No icon available for: {path}")]
    NoIcon { path: String },

    #[error("Failed to render icon bitmap")]
    RenderFailed,

    #[error("Pixel buffer does not match a {size}x{size} image")]
    InvalidBuffer { size: u32 },

    #[error("Failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Icon extraction is not supported on this platform")]
    Unsupported,
}

/// Shell icon size used for a requested pixel size.
pub fn icon_pixel_size(requested: u32) -> u32 {
    if requested <= SMALL_ICON_SIZE {
        SMALL_ICON_SIZE
    } else {
        LARGE_ICON_SIZE
    }
}

/// Convert a top-down BGRA bitmap into RGBA.
///
/// Legacy icons drawn through a mask leave every alpha byte at zero; those
/// are treated as fully opaque.
pub fn bgra_to_rgba(bgra: &[u8]) -> Vec<u8> {
    let has_alpha = bgra.chunks_exact(4).any(|px| px[3] != 0);

    let mut rgba = Vec::with_capacity(bgra.len());
    for px in bgra.chunks_exact(4) {
        rgba.extend_from_slice(&[px[2], px[1], px[0], if has_alpha { px[3] } else { 255 }]);
    }
    rgba
}

/// Encode a square RGBA buffer as PNG.
pub fn encode_png(rgba: Vec<u8>, size: u32) -> Result<Vec<u8>, IconError> {
    let image = RgbaImage::from_raw(size, size, rgba).ok_or(IconError::InvalidBuffer { size })?;

    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, ImageFormat::Png)?;
    Ok(png.into_inner())
}

/// Extract the icon of an executable as PNG bytes.
///
/// COM should be initialized on the calling thread.
pub fn extract_icon_png(executable_path: &str, requested_size: u32) -> Result<Vec<u8>, IconError> {
    if executable_path.is_empty() {
        return Err(IconError::EmptyPath);
    }

    let size = icon_pixel_size(requested_size);
    let bgra = shell::render_icon_bgra(executable_path, size)?;
    encode_png(bgra_to_rgba(&bgra), size)
}

#[cfg(windows)]
mod shell {
    use super::{IconError, SMALL_ICON_SIZE};
    use std::ffi::c_void;
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::{HANDLE, HWND};
    use windows::Win32::Graphics::Gdi::{
        CreateCompatibleDC, CreateDIBSection, DeleteDC, DeleteObject, GdiFlush, GetDC, ReleaseDC,
        SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, HBITMAP, HBRUSH, HDC,
        HGDIOBJ,
    };
    use windows::Win32::Storage::FileSystem::FILE_FLAGS_AND_ATTRIBUTES;
    use windows::Win32::UI::Shell::{
        SHGetFileInfoW, SHFILEINFOW, SHGFI_ICON, SHGFI_LARGEICON, SHGFI_SMALLICON,
    };
    use windows::Win32::UI::WindowsAndMessaging::{DestroyIcon, DrawIconEx, DI_NORMAL, HICON};

    /// Render the shell icon of `path` as a top-down BGRA bitmap over black.
    pub fn render_icon_bgra(path: &str, size: u32) -> Result<Vec<u8>, IconError> {
        let icon = ShellIcon::for_file(path, size)?;

        let side = size as i32;
        let info = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: side,
                biHeight: -side,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            },
            ..Default::default()
        };

        unsafe {
            let screen = ScreenDc(GetDC(HWND::default()));
            let mut bits: *mut c_void = std::ptr::null_mut();
            let bitmap = CreateDIBSection(screen.0, &info, DIB_RGB_COLORS, &mut bits, HANDLE::default(), 0)
                .map(DibSection)
                .map_err(|_| IconError::RenderFailed)?;
            if bits.is_null() {
                return Err(IconError::RenderFailed);
            }

            let canvas = CanvasDc::select(screen.0, &bitmap)?;
            DrawIconEx(canvas.dc, 0, 0, icon.0, side, side, 0, HBRUSH::default(), DI_NORMAL)
                .map_err(|_| IconError::RenderFailed)?;
            let _ = GdiFlush();

            let len = (size * size * 4) as usize;
            Ok(std::slice::from_raw_parts(bits as *const u8, len).to_vec())
        }
    }

    struct ShellIcon(HICON);

    impl ShellIcon {
        fn for_file(path: &str, size: u32) -> Result<Self, IconError> {
            let wide: Vec<u16> = path.encode_utf16().chain(std::iter::once(0)).collect();
            let mut file_info = SHFILEINFOW::default();
            let flags = SHGFI_ICON
                | if size <= SMALL_ICON_SIZE {
                    SHGFI_SMALLICON
                } else {
                    SHGFI_LARGEICON
                };

            let found = unsafe {
                SHGetFileInfoW(
                    PCWSTR(wide.as_ptr()),
                    FILE_FLAGS_AND_ATTRIBUTES(0),
                    Some(&mut file_info as *mut _),
                    std::mem::size_of::<SHFILEINFOW>() as u32,
                    flags,
                )
            };

            if found == 0 || file_info.hIcon.is_invalid() {
                return Err(IconError::NoIcon {
                    path: path.to_string(),
                });
            }
            Ok(Self(file_info.hIcon))
        }
    }

    impl Drop for ShellIcon {
        fn drop(&mut self) {
            unsafe {
                let _ = DestroyIcon(self.0);
            }
        }
    }

    struct ScreenDc(HDC);

    impl Drop for ScreenDc {
        fn drop(&mut self) {
            unsafe {
                ReleaseDC(HWND::default(), self.0);
            }
        }
    }

    struct DibSection(HBITMAP);

    impl Drop for DibSection {
        fn drop(&mut self) {
            unsafe {
                let _ = DeleteObject(HGDIOBJ(self.0 .0));
            }
        }
    }

    /// Memory DC with a bitmap selected into it; restores and deletes on drop.
    struct CanvasDc {
        dc: HDC,
        previous: HGDIOBJ,
    }

    impl CanvasDc {
        unsafe fn select(screen: HDC, bitmap: &DibSection) -> Result<Self, IconError> {
            let dc = CreateCompatibleDC(screen);
            if dc.is_invalid() {
                return Err(IconError::RenderFailed);
            }
            let previous = SelectObject(dc, HGDIOBJ(bitmap.0 .0));
            if previous.is_invalid() {
                let _ = DeleteDC(dc);
                return Err(IconError::RenderFailed);
            }
            Ok(Self { dc, previous })
        }
    }

    impl Drop for CanvasDc {
        fn drop(&mut self) {
            unsafe {
                SelectObject(self.dc, self.previous);
                let _ = DeleteDC(self.dc);
            }
        }
    }
}

#[cfg(not(windows))]
mod shell {
    use super::IconError;

    pub fn render_icon_bgra(_path: &str, _size: u32) -> Result<Vec<u8>, IconError> {
        Err(IconError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_size_snaps_to_shell_sizes() {
        assert_eq!(icon_pixel_size(0), 16);
        assert_eq!(icon_pixel_size(16), 16);
        assert_eq!(icon_pixel_size(17), 32);
        assert_eq!(icon_pixel_size(256), 32);
    }

    #[test]
    fn bgra_channels_are_swapped() {
        let bgra = [10, 20, 30, 128, 1, 2, 3, 0];
        assert_eq!(bgra_to_rgba(&bgra), vec![30, 20, 10, 128, 3, 2, 1, 0]);
    }

    #[test]
    fn maskless_icons_become_opaque() {
        let bgra = [10, 20, 30, 0, 1, 2, 3, 0];
        assert_eq!(bgra_to_rgba(&bgra), vec![30, 20, 10, 255, 3, 2, 1, 255]);
    }

    #[test]
    fn encodes_png_signature() {
        let rgba = vec![255u8; 16 * 16 * 4];
        let png = encode_png(rgba, 16).unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn rejects_mismatched_buffer() {
        let result = encode_png(vec![0u8; 10], 16);
        assert!(matches!(result, Err(IconError::InvalidBuffer { size: 16 })));
    }

    #[cfg(windows)]
    #[test]
    fn renders_icon_of_system_executable() {
        let _com = crate::audio::ComGuard::new().unwrap();
        let root = std::env::var("SystemRoot").unwrap_or_else(|_| r"C:\Windows".to_string());
        let path = format!(r"{}\explorer.exe", root);

        let small = extract_icon_png(&path, 16).unwrap();
        let large = extract_icon_png(&path, 48).unwrap();
        assert_eq!(&small[1..4], b"PNG");
        assert_ne!(small, large);
    }

    #[test]
    fn empty_path_has_no_icon() {
        assert!(matches!(extract_icon_png("", 32), Err(IconError::EmptyPath)));
    }
}
