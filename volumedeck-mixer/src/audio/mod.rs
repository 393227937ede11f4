//! Audio module for the session directory and its backends.
//!
//! This module provides the session data model, the backend traits, the
//! session directory, and the Windows Core Audio, in-memory and null
//! backend implementations.

pub mod backend;
pub mod directory;
pub mod identity;
#[cfg(any(test, feature = "memory-backend"))]
pub mod memory;
pub mod null;
pub mod session;
#[cfg(windows)]
pub mod wasapi;

pub use backend::{AudioBackend, RenderEndpoint, SessionControl};
pub use directory::SessionDirectory;
#[cfg(any(test, feature = "memory-backend"))]
pub use memory::{MemoryBackend, MemorySession};
pub use null::NullBackend;
pub use session::{clamp_unit, AudioError, AudioSession, MasterState, Snapshot};
#[cfg(windows)]
pub use wasapi::{ComGuard, WasapiBackend};

/// Backend for the audio subsystem of the host platform.
#[cfg(windows)]
pub type PlatformBackend = WasapiBackend;

/// Backend for the audio subsystem of the host platform.
#[cfg(not(windows))]
pub type PlatformBackend = NullBackend;
