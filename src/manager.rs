//! Session lifecycle: the owner of the single active workout session.
//!
//! All transitions go through [`SessionManager`], which mutates the in-memory
//! record, persists it, then notifies observers. Elapsed time is always
//! derived from timestamps, so the ticker can be suspended or the process
//! killed without losing accuracy.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::elapsed::{elapsed, running_seconds};
use crate::runtime::TickHandle;
use crate::session::{SessionPhase, SessionSnapshot, SessionState, WorkoutKind};
use crate::store::SessionStore;

const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerOptions {
    /// How often observers get a `Tick` while running.
    pub tick_interval: Duration,
    /// Longest gap a restored running session may accrue. Beyond it the
    /// session is restored paused with exactly this much credited.
    pub max_resume_gap: Option<chrono::Duration>,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            max_resume_gap: None,
        }
    }
}

/// Notifications delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A transition was committed (or state was restored).
    Changed(SessionSnapshot),
    /// Display refresh while running. Carries no authority.
    Tick { elapsed_seconds: u64 },
}

type Observers = Arc<Mutex<Vec<Sender<SessionEvent>>>>;

fn broadcast(observers: &Observers, event: &SessionEvent) {
    let mut observers = observers.lock().unwrap_or_else(|e| e.into_inner());
    observers.retain(|tx| tx.send(event.clone()).is_ok());
}

pub struct SessionManager<S: SessionStore> {
    store: S,
    clock: Arc<dyn Clock>,
    options: ManagerOptions,
    state: Option<SessionState>,
    persist_failed: bool,
    tick: Option<TickHandle>,
    observers: Observers,
}

impl<S: SessionStore> SessionManager<S> {
    /// Manager on the system clock with default options, restored from `store`.
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock, ManagerOptions::default())
    }

    pub fn with_clock<C: Clock>(store: S, clock: C, options: ManagerOptions) -> Self {
        let mut manager = Self {
            store,
            clock: Arc::new(clock),
            options: ManagerOptions {
                tick_interval: options.tick_interval.max(MIN_TICK_INTERVAL),
                ..options
            },
            state: None,
            persist_failed: false,
            tick: None,
            observers: Arc::new(Mutex::new(Vec::new())),
        };
        manager.restore();
        manager
    }

    /// Begin timing a new session. Ignored while another session is active.
    pub fn start(&mut self, session_id: impl Into<String>, workout_kind: WorkoutKind) {
        if let Some(active) = &self.state {
            debug!(active = %active.session_id, "start ignored: session already active");
            return;
        }

        let state = SessionState::new(session_id.into(), workout_kind, self.clock.now());
        info!(session_id = %state.session_id, kind = %workout_kind, "session started");
        self.state = Some(state);
        self.persist();
        self.start_tick();
        self.publish_change();
    }

    /// Freeze elapsed time. Only meaningful while running.
    pub fn pause(&mut self) {
        let now = self.clock.now();
        let Some(state) = self.state.as_mut() else {
            debug!("pause ignored: no active session");
            return;
        };
        if state.is_paused {
            debug!(session_id = %state.session_id, "pause ignored: already paused");
            return;
        }

        let ran = running_seconds(state.reference_at, now);
        state.accumulated_seconds = state.accumulated_seconds.saturating_add(ran);
        state.is_paused = true;
        state.reference_at = now;
        info!(
            session_id = %state.session_id,
            accumulated = state.accumulated_seconds,
            "session paused"
        );

        self.persist();
        self.stop_tick();
        self.publish_change();
    }

    /// Continue a paused session from `now`.
    pub fn resume(&mut self) {
        let now = self.clock.now();
        let Some(state) = self.state.as_mut() else {
            debug!("resume ignored: no active session");
            return;
        };
        if !state.is_paused {
            debug!(session_id = %state.session_id, "resume ignored: not paused");
            return;
        }

        state.reference_at = now;
        state.is_paused = false;
        info!(session_id = %state.session_id, "session resumed");

        self.persist();
        self.start_tick();
        self.publish_change();
    }

    /// Finish the session and hand back its duration in seconds. The caller
    /// owns writing it into the workout record. `None` without a session.
    pub fn end(&mut self) -> Option<u64> {
        let Some(state) = self.state.take() else {
            debug!("end ignored: no active session");
            return None;
        };

        let seconds = elapsed(&state, self.clock.now());
        self.store.clear();
        self.persist_failed = false;
        self.stop_tick();
        info!(session_id = %state.session_id, seconds, "session ended");
        self.publish_change();
        Some(seconds)
    }

    /// Abandon the session without reporting a duration.
    pub fn discard(&mut self) {
        if let Some(seconds) = self.end() {
            debug!(seconds, "session discarded");
        }
    }

    /// Session the UI should reopen, if any. Falls back to the store so a
    /// cold-start caller gets an answer before anything else happens.
    pub fn restoration_info(&self) -> Option<(String, WorkoutKind)> {
        match &self.state {
            Some(state) => Some((state.session_id.clone(), state.workout_kind)),
            None => self
                .store
                .load()
                .map(|state| (state.session_id, state.workout_kind)),
        }
    }

    /// Store the opaque UI cursor with the session. No effect on timing.
    pub fn set_cursor(&mut self, index: Option<usize>) {
        let Some(state) = self.state.as_mut() else {
            debug!("cursor update ignored: no active session");
            return;
        };
        if state.selected_index == index {
            return;
        }
        state.selected_index = index;
        self.persist();
    }

    /// Rebuild in-memory state from the store. Never resumes a paused
    /// session; a running one keeps accruing across the gap.
    pub fn restore(&mut self) {
        self.stop_tick();

        if self.persist_failed && self.state.is_some() {
            // the store is behind; memory is the only accurate copy
            warn!("store out of date, keeping in-memory session");
            self.persist();
            self.start_tick();
            self.publish_change();
            return;
        }

        self.state = self.store.load();
        self.persist_failed = false;

        let now = self.clock.now();
        let mut restamp = false;
        if let (Some(state), Some(cap)) = (self.state.as_mut(), self.options.max_resume_gap) {
            // only time with no live process counts against the cap
            let last_seen = state.last_seen();
            let gap = now.signed_duration_since(last_seen);
            if !state.is_paused {
                if gap > cap {
                    let credited = running_seconds(state.reference_at, last_seen)
                        .saturating_add(u64::try_from(cap.num_seconds()).unwrap_or(0));
                    state.accumulated_seconds = state.accumulated_seconds.saturating_add(credited);
                    state.is_paused = true;
                    state.reference_at = now;
                    warn!(
                        session_id = %state.session_id,
                        gap_secs = gap.num_seconds(),
                        credited,
                        "restored session exceeded resume gap, pausing"
                    );
                }
                restamp = true;
            }
        }
        if restamp {
            self.persist();
        }

        match &self.state {
            Some(state) => info!(
                session_id = %state.session_id,
                phase = %state.phase(),
                "session restored"
            ),
            None => debug!("no session to restore"),
        }

        self.start_tick();
        self.publish_change();
    }

    /// Record that a live process is still watching the session. Long-lived
    /// hosts call this periodically so a crash is measured from here.
    pub fn touch(&mut self) {
        if self.state.as_ref().is_some_and(|s| !s.is_paused) {
            self.persist();
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.state
            .as_ref()
            .map_or(SessionPhase::NoSession, SessionState::phase)
    }

    pub fn has_active_session(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&SessionState> {
        self.state.as_ref()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.state
            .as_ref()
            .map_or(0, |state| elapsed(state, self.clock.now()))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        match &self.state {
            None => SessionSnapshot::empty(),
            Some(state) => SessionSnapshot {
                has_active_session: true,
                is_paused: state.is_paused,
                elapsed_seconds: elapsed(state, self.clock.now()),
                session_started_at: Some(state.started_at),
                active_workout_kind: Some(state.workout_kind),
            },
        }
    }

    /// Receive `Changed` on every transition and `Tick` while running. The
    /// current snapshot is delivered first.
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(SessionEvent::Changed(self.snapshot()));
        self.observers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tx);
        rx
    }

    pub fn is_ticking(&self) -> bool {
        self.tick.as_ref().is_some_and(TickHandle::is_active)
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    fn persist(&mut self) {
        let now = self.clock.now();
        let Some(state) = self.state.as_mut() else {
            return;
        };
        state.last_seen_at = Some(now);
        match self.store.save(state) {
            Ok(()) => self.persist_failed = false,
            Err(e) => {
                warn!(
                    error = %e,
                    session_id = %state.session_id,
                    "failed to persist session, continuing in memory"
                );
                self.persist_failed = true;
            }
        }
    }

    fn start_tick(&mut self) {
        self.stop_tick();
        let Some(state) = self.state.as_ref().filter(|s| !s.is_paused) else {
            return;
        };

        let frozen = state.clone();
        let clock = Arc::clone(&self.clock);
        let observers = Arc::clone(&self.observers);
        self.tick = Some(TickHandle::spawn(self.options.tick_interval, move || {
            let elapsed_seconds = elapsed(&frozen, clock.now());
            broadcast(&observers, &SessionEvent::Tick { elapsed_seconds });
        }));
    }

    fn stop_tick(&mut self) {
        if let Some(mut tick) = self.tick.take() {
            tick.stop();
        }
    }

    fn publish_change(&self) {
        broadcast(&self.observers, &SessionEvent::Changed(self.snapshot()));
    }
}
