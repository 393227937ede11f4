//! VolumeDeck Mixer - Library
//!
//! Per-application audio mixing controls for a desktop front-end.
//!
//! ## Features
//!
//! - Read and set the master volume and mute of the default output device
//! - Enumerate active audio sessions with their owning executable
//! - Set per-session volume and mute, re-resolving the session on every write
//! - Method channel dispatch for host UIs
//! - Executable icon extraction as PNG

pub mod audio;
pub mod channel;
pub mod mixer;
pub mod platform;

pub use audio::{
    AudioBackend, AudioError, AudioSession, MasterState, NullBackend, PlatformBackend,
    SessionDirectory, Snapshot,
};
pub use channel::{dispatch, ChannelError, MethodResponse};
pub use mixer::Mixer;
pub use platform::{extract_icon_png, IconError};

#[cfg(windows)]
pub use audio::{ComGuard, WasapiBackend};

#[cfg(any(test, feature = "memory-backend"))]
pub use audio::MemoryBackend;
