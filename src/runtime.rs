use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent};
use tracing::{debug, warn};

use crate::lifecycle::HostSignal;

/// Unified event type consumed by the watch host
#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Host(HostSignal),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, focus, resize)
pub trait AppEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;
}

/// Production event source using crossterm. Focus changes become host
/// lifecycle signals.
pub struct CrosstermEventSource {
    rx: Receiver<AppEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || loop {
            let ev = match event::read() {
                Ok(CtEvent::Key(key)) => AppEvent::Key(key),
                Ok(CtEvent::Resize(_, _)) => AppEvent::Resize,
                Ok(other) => match HostSignal::from_event(&other) {
                    Some(signal) => AppEvent::Host(signal),
                    None => continue,
                },
                Err(_) => break,
            };
            if tx.send(ev).is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AppEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Events pushed in by hand. Headless hosts and tests script key presses and
/// focus changes through the returned sender.
pub struct ScriptedEventSource {
    rx: Receiver<AppEvent>,
}

impl ScriptedEventSource {
    pub fn channel() -> (Sender<AppEvent>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { rx })
    }
}

impl AppEventSource for ScriptedEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Drives a host loop: waits at most `poll` for input so the screen can
/// redraw the clock even when nobody touches the keyboard.
pub struct Runner<E: AppEventSource> {
    source: E,
    poll: Duration,
}

impl<E: AppEventSource> Runner<E> {
    pub fn new(source: E, poll: Duration) -> Self {
        Self { source, poll }
    }

    /// Next input event, or `Tick` when the poll window passes quietly. A
    /// closed source also yields `Tick`; the host decides when to stop.
    pub fn step(&self) -> AppEvent {
        self.source
            .recv_timeout(self.poll)
            .unwrap_or(AppEvent::Tick)
    }
}

/// Cancellable periodic task. Calls `on_tick` every `interval` on a worker
/// thread until stopped or dropped.
#[derive(Debug)]
pub struct TickHandle {
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl TickHandle {
    pub fn spawn<F>(interval: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let spawned = thread::Builder::new()
            .name("pacekeep-tick".into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => on_tick(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            });

        match spawned {
            Ok(worker) => {
                debug!(interval_ms = interval.as_millis() as u64, "tick started");
                Self {
                    stop: Some(stop_tx),
                    worker: Some(worker),
                }
            }
            Err(e) => {
                // display refresh only; elapsed time stays correct without it
                warn!(error = %e, "failed to spawn tick thread");
                Self {
                    stop: None,
                    worker: None,
                }
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.worker.is_some()
    }

    /// Stop the worker and wait for it to exit. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
            debug!("tick stopped");
        }
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
