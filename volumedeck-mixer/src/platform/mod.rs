//! Platform utilities outside the audio path.
//!
//! Currently icon extraction for executables shown in the session list.

pub mod icons;

pub use icons::{extract_icon_png, IconError};
