//! Host lifecycle signals and their mapping onto session transitions.

use std::time::Instant;

use crossterm::event::Event;
use tracing::{debug, info};

use crate::manager::SessionManager;
use crate::session::SessionPhase;
use crate::store::SessionStore;

/// Process-level lifecycle notifications from whatever runtime hosts us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSignal {
    EnteredBackground,
    EnteredForeground,
}

impl HostSignal {
    /// Terminal focus changes stand in for backgrounding.
    pub fn from_event(event: &Event) -> Option<Self> {
        match event {
            Event::FocusLost => Some(Self::EnteredBackground),
            Event::FocusGained => Some(Self::EnteredForeground),
            _ => None,
        }
    }
}

/// The part of a session owner the bridge drives.
pub trait SessionLifecycle {
    fn phase(&self) -> SessionPhase;
    fn pause(&mut self);
    fn restore(&mut self);
}

impl<S: SessionStore> SessionLifecycle for SessionManager<S> {
    fn phase(&self) -> SessionPhase {
        SessionManager::phase(self)
    }

    fn pause(&mut self) {
        SessionManager::pause(self)
    }

    fn restore(&mut self) {
        SessionManager::restore(self)
    }
}

/// Turns background/foreground notifications into session calls.
///
/// Backgrounding pauses a running session so no time is counted while the
/// host cannot keep the timer honest. Foregrounding re-reads the store and
/// leaves resuming to the user.
#[derive(Debug, Default)]
pub struct LifecycleBridge {
    suspended_at: Option<Instant>,
}

impl LifecycleBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `signal`. Returns true only when it paused a running session.
    pub fn handle<M: SessionLifecycle>(&mut self, session: &mut M, signal: HostSignal) -> bool {
        match signal {
            HostSignal::EnteredBackground => self.on_suspend(session),
            HostSignal::EnteredForeground => {
                self.on_resume(session);
                false
            }
        }
    }

    pub fn on_suspend<M: SessionLifecycle>(&mut self, session: &mut M) -> bool {
        if self.suspended_at.is_none() {
            self.suspended_at = Some(Instant::now());
        }
        if session.phase() == SessionPhase::Running {
            info!("host entered background, pausing session");
            session.pause();
            true
        } else {
            debug!(phase = %session.phase(), "host entered background");
            false
        }
    }

    pub fn on_resume<M: SessionLifecycle>(&mut self, session: &mut M) {
        if let Some(since) = self.suspended_at.take() {
            debug!(
                away_ms = since.elapsed().as_millis() as u64,
                "host entered foreground"
            );
        }
        session.restore();
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::manager::ManagerOptions;
    use crate::session::WorkoutKind;
    use crate::store::MemorySessionStore;
    use chrono::{TimeZone, Utc};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        phase: Option<SessionPhase>,
        calls: Vec<&'static str>,
    }

    impl SessionLifecycle for Recorder {
        fn phase(&self) -> SessionPhase {
            self.phase.unwrap_or(SessionPhase::NoSession)
        }

        fn pause(&mut self) {
            self.calls.push("pause");
            self.phase = Some(SessionPhase::Paused);
        }

        fn restore(&mut self) {
            self.calls.push("restore");
        }
    }

    #[test]
    fn maps_focus_events() {
        assert_eq!(
            HostSignal::from_event(&Event::FocusLost),
            Some(HostSignal::EnteredBackground)
        );
        assert_eq!(
            HostSignal::from_event(&Event::FocusGained),
            Some(HostSignal::EnteredForeground)
        );
        let key = Event::Key(KeyEvent::new(KeyCode::Char('p'), KeyModifiers::NONE));
        assert_eq!(HostSignal::from_event(&key), None);
    }

    #[test]
    fn background_pauses_only_running_sessions() {
        let mut bridge = LifecycleBridge::new();

        let mut running = Recorder {
            phase: Some(SessionPhase::Running),
            ..Default::default()
        };
        assert!(bridge.handle(&mut running, HostSignal::EnteredBackground));
        assert_eq!(running.calls, vec!["pause"]);
        assert!(bridge.is_suspended());

        let mut paused = Recorder {
            phase: Some(SessionPhase::Paused),
            ..Default::default()
        };
        assert!(!bridge.handle(&mut paused, HostSignal::EnteredBackground));
        assert!(paused.calls.is_empty());

        let mut idle = Recorder::default();
        assert!(!bridge.handle(&mut idle, HostSignal::EnteredBackground));
        assert!(idle.calls.is_empty());

        assert!(!bridge.handle(&mut running, HostSignal::EnteredForeground));
    }

    #[test]
    fn foreground_restores_without_resuming() {
        let mut bridge = LifecycleBridge::new();
        let mut rec = Recorder {
            phase: Some(SessionPhase::Running),
            ..Default::default()
        };
        assert!(bridge.on_suspend(&mut rec));
        bridge.on_resume(&mut rec);
        assert_eq!(rec.calls, vec!["pause", "restore"]);
        assert_eq!(rec.phase(), SessionPhase::Paused);
        assert!(!bridge.is_suspended());
    }

    #[test]
    fn background_gap_is_not_counted() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 7, 30, 0).unwrap();
        let clock = ManualClock::new(t0);
        let options = ManagerOptions {
            tick_interval: Duration::from_secs(3600),
            max_resume_gap: None,
        };
        let mut manager =
            SessionManager::with_clock(MemorySessionStore::new(), clock.clone(), options);
        let mut bridge = LifecycleBridge::new();

        manager.start("S1", WorkoutKind::Outdoor);
        clock.advance_secs(120);
        bridge.handle(&mut manager, HostSignal::EnteredBackground);
        clock.advance_secs(900);
        bridge.handle(&mut manager, HostSignal::EnteredForeground);

        assert_eq!(manager.phase(), SessionPhase::Paused);
        assert_eq!(manager.elapsed_seconds(), 120);

        manager.resume();
        clock.advance_secs(30);
        assert_eq!(manager.end(), Some(150));
    }

    #[test]
    fn foreground_picks_up_external_changes() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 7, 30, 0).unwrap();
        let store = MemorySessionStore::new();
        let clock = ManualClock::new(t0);
        let mut manager =
            SessionManager::with_clock(store.clone(), clock.clone(), ManagerOptions::default());
        let mut bridge = LifecycleBridge::new();

        manager.start("S1", WorkoutKind::Cardio);
        assert!(bridge.on_suspend(&mut manager));
        // another process ended the session while we were away
        store.clear();
        bridge.on_resume(&mut manager);

        assert_eq!(manager.phase(), SessionPhase::NoSession);
        assert!(manager.restoration_info().is_none());
    }
}
