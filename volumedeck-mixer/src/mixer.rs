//! Mixer control facade.
//!
//! The operation surface exposed to the front-end. Reads never fail and
//! writes report success as a bool; the underlying [`AudioError`] is only
//! logged. Every session write re-resolves its target from a fresh
//! enumeration immediately before applying it.

use crate::audio::backend::{AudioBackend, RenderEndpoint, SessionControl};
use crate::audio::directory::SessionDirectory;
use crate::audio::session::{clamp_unit, AudioError, MasterState, Snapshot, DEFAULT_PEAK, DEFAULT_VOLUME};
use tracing::{debug, warn};

/// Master and per-session volume control over an [`AudioBackend`].
pub struct Mixer<B> {
    directory: SessionDirectory<B>,
}

impl<B: AudioBackend> Mixer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            directory: SessionDirectory::new(backend),
        }
    }

    /// Get the session directory this mixer resolves sessions through.
    pub fn directory(&self) -> &SessionDirectory<B> {
        &self.directory
    }

    /// Read the master state and, optionally, every session.
    pub fn snapshot(&self, include_sessions: bool) -> Snapshot {
        Snapshot {
            master: self.master(),
            sessions: include_sessions.then(|| self.directory.list_sessions()),
        }
    }

    /// Read the master state of the default render device.
    ///
    /// Falls back to volume 1.0, unmuted, peak 0.0 for any unreadable value.
    pub fn master(&self) -> MasterState {
        let endpoint = match self.directory.resolve_default_render_device() {
            Ok(endpoint) => endpoint,
            Err(e) => {
                debug!(error = %e, "Master state unavailable");
                return MasterState::default();
            }
        };

        MasterState {
            volume: clamp_unit(master_or(endpoint.volume(), "volume", DEFAULT_VOLUME)),
            mute: master_or(endpoint.mute(), "mute", false),
            peak: clamp_unit(master_or(endpoint.peak(), "peak", DEFAULT_PEAK)),
        }
    }

    /// Find the first session owned by the given executable.
    pub fn find_session_id_by_exe(&self, exe_name: &str) -> Option<String> {
        self.directory.find_session_id_by_executable_name(exe_name)
    }

    /// Set the master volume, clamped to `[0, 1]`.
    pub fn set_master_volume(&self, value: f64) -> bool {
        let level = clamp_unit(value as f32);
        report(
            "set_master_volume",
            self.directory
                .resolve_default_render_device()
                .and_then(|endpoint| endpoint.set_volume(level)),
        )
    }

    pub fn set_master_mute(&self, mute: bool) -> bool {
        report(
            "set_master_mute",
            self.directory
                .resolve_default_render_device()
                .and_then(|endpoint| endpoint.set_mute(mute)),
        )
    }

    /// Set a session's volume, clamped to `[0, 1]`.
    ///
    /// Returns false if the session has exited or the write was rejected.
    pub fn set_session_volume(&self, session_id: &str, value: f64) -> bool {
        let level = clamp_unit(value as f32);
        report(
            "set_session_volume",
            self.directory
                .resolve_session(session_id)
                .and_then(|session| session.set_volume(level)),
        )
    }

    pub fn set_session_mute(&self, session_id: &str, mute: bool) -> bool {
        report(
            "set_session_mute",
            self.directory
                .resolve_session(session_id)
                .and_then(|session| session.set_mute(mute)),
        )
    }
}

fn master_or<T>(result: Result<T, AudioError>, field: &str, fallback: T) -> T {
    result.unwrap_or_else(|e| {
        debug!(field, error = %e, "Master field unavailable, using default");
        fallback
    })
}

fn report(operation: &str, result: Result<(), AudioError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!(operation, error = %e, "Mixer write failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::memory::{MemoryBackend, MemorySession};
    use crate::audio::null::NullBackend;

    fn mixer() -> (MemoryBackend, Mixer<MemoryBackend>) {
        let backend = MemoryBackend::with_default_device();
        (backend.clone(), Mixer::new(backend))
    }

    #[test]
    fn master_volume_is_clamped() {
        let (backend, mixer) = mixer();

        assert!(mixer.set_master_volume(1.5));
        assert_eq!(mixer.snapshot(false).master.volume, 1.0);
        assert_eq!(backend.master_volume(), Some(1.0));

        assert!(mixer.set_master_volume(-0.2));
        assert_eq!(mixer.snapshot(false).master.volume, 0.0);

        assert!(mixer.set_master_volume(0.35));
        assert!((mixer.master().volume - 0.35).abs() < 1e-6);
    }

    #[test]
    fn master_mute_round_trips() {
        let (_backend, mixer) = mixer();
        assert!(mixer.set_master_mute(true));
        assert!(mixer.master().mute);
        assert!(mixer.set_master_mute(false));
        assert!(!mixer.master().mute);
    }

    #[test]
    fn master_reads_are_clamped() {
        let (backend, mixer) = mixer();
        backend.set_master(3.0, true, 2.0);
        let master = mixer.master();
        assert_eq!(master.volume, 1.0);
        assert_eq!(master.peak, 1.0);
        assert!(master.mute);
    }

    #[test]
    fn missing_master_meter_falls_back_per_field() {
        let (backend, mixer) = mixer();
        backend.set_master(0.4, true, 0.9);
        backend.set_master_meter(false);
        let master = mixer.master();
        assert_eq!(master.volume, 0.4);
        assert!(master.mute);
        assert_eq!(master.peak, DEFAULT_PEAK);
    }

    #[test]
    fn rejected_master_write_reports_failure() {
        let (backend, mixer) = mixer();
        backend.reject_master_writes(true);
        assert!(!mixer.set_master_volume(0.5));
        assert!(!mixer.set_master_mute(true));
    }

    #[test]
    fn no_device_yields_defaults_and_failures() {
        let mixer = Mixer::new(NullBackend);
        let snapshot = mixer.snapshot(true);
        assert_eq!(snapshot.master, MasterState::default());
        assert_eq!(snapshot.sessions, Some(Vec::new()));
        assert!(!mixer.set_master_volume(0.5));
        assert!(!mixer.set_master_mute(true));
        assert!(!mixer.set_session_volume("{a}", 0.5));
        assert!(!mixer.set_session_mute("{a}", true));
    }

    #[test]
    fn snapshot_includes_sessions_only_on_request() {
        let (_backend, mixer) = mixer();
        assert!(mixer.snapshot(false).sessions.is_none());
        assert_eq!(mixer.snapshot(true).sessions, Some(Vec::new()));
    }

    #[test]
    fn session_volume_is_clamped() {
        let (backend, mixer) = mixer();
        backend.add_session(MemorySession::new("{a}", 0).with_volume(0.5));

        assert!(mixer.set_session_volume("{a}", 7.0));
        assert_eq!(backend.session("{a}").unwrap().volume, 1.0);

        assert!(mixer.set_session_volume("{a}", -1.0));
        assert_eq!(backend.session("{a}").unwrap().volume, 0.0);
    }

    #[test]
    fn session_mute_applies_to_matching_session_only() {
        let (backend, mixer) = mixer();
        backend.add_session(MemorySession::new("{a}", 0));
        backend.add_session(MemorySession::new("{b}", 0));

        assert!(mixer.set_session_mute("{b}", true));
        assert!(!backend.session("{a}").unwrap().muted);
        assert!(backend.session("{b}").unwrap().muted);
    }

    #[test]
    fn writes_to_exited_session_fail() {
        let (backend, mixer) = mixer();
        backend.add_session(MemorySession::new("{a}", 0));
        let snapshot = mixer.snapshot(true);
        let session_id = snapshot.sessions.unwrap()[0].session_id.clone();

        backend.remove_session(&session_id);
        assert!(!mixer.set_session_volume(&session_id, 0.5));
        assert!(!mixer.set_session_mute(&session_id, true));
        assert!(!mixer.set_session_volume("{never-existed}", 0.5));
    }

    #[test]
    fn rejected_session_write_reports_failure() {
        let (backend, mixer) = mixer();
        backend.add_session(MemorySession::new("{a}", 0).rejecting_writes());
        backend.add_session(MemorySession::new("{b}", 0).without_volume_control());

        assert!(!mixer.set_session_volume("{a}", 0.5));
        assert!(!mixer.set_session_mute("{b}", true));
    }

    #[test]
    fn consecutive_snapshots_track_session_changes() {
        let (backend, mixer) = mixer();
        backend.add_process(100, r"C:\Apps\player.exe");
        backend.add_session(MemorySession::new("{player}", 100));

        let first = mixer.snapshot(true).sessions.unwrap();
        assert_eq!(first.len(), 1);

        backend.remove_session("{player}");
        backend.add_process(200, r"C:\Apps\browser.exe");
        backend.add_session(MemorySession::new("{browser}", 200));

        let second = mixer.snapshot(true).sessions.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].session_id, "{browser}");
        assert_eq!(second[0].executable_name, "browser.exe");
    }

    #[test]
    fn find_then_set_uses_fresh_enumeration() {
        let (backend, mixer) = mixer();
        backend.add_process(5, r"C:\Apps\Game.exe");
        backend.add_session(MemorySession::new("{game}", 5));

        let id = mixer.find_session_id_by_exe("GAME.EXE").unwrap();
        assert!(mixer.set_session_volume(&id, 0.25));
        assert_eq!(backend.session("{game}").unwrap().volume, 0.25);
    }
}
