use std::time::Duration;

use chrono::{TimeZone, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use pacekeep::runtime::{AppEvent, Runner, ScriptedEventSource};
use pacekeep::{
    HostSignal, LifecycleBridge, ManagerOptions, ManualClock, MemorySessionStore, SessionManager,
    SessionPhase, WorkoutKind,
};

fn key(c: char) -> AppEvent {
    AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

fn quiet() -> ManagerOptions {
    ManagerOptions {
        tick_interval: Duration::from_secs(3600),
        max_resume_gap: None,
    }
}

// Headless host loop built from the same pieces as the watch screen:
// Runner + ScriptedEventSource feeding keys and focus signals to the manager.
#[test]
fn headless_host_pauses_in_background_and_waits_for_user() {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 7, 0, 0).unwrap());
    let mut manager = SessionManager::with_clock(MemorySessionStore::new(), clock.clone(), quiet());
    manager.start("S1", WorkoutKind::Cardio);

    let (tx, source) = ScriptedEventSource::channel();
    let runner = Runner::new(source, Duration::from_millis(5));
    let mut bridge = LifecycleBridge::new();

    // (event, seconds to advance before it is handled)
    let script = [
        (AppEvent::Host(HostSignal::EnteredBackground), 300),
        (AppEvent::Host(HostSignal::EnteredForeground), 1200),
        (key('r'), 5),
        (key('q'), 60),
    ];
    let mut advances = Vec::new();
    for (event, secs) in script {
        advances.push(secs);
        tx.send(event).unwrap();
    }

    let mut handled = 0;
    let mut result = None;
    for _ in 0..100u32 {
        let event = runner.step();
        if matches!(event, AppEvent::Tick) {
            continue;
        }
        clock.advance_secs(advances[handled]);
        handled += 1;
        match event {
            AppEvent::Host(signal) => {
                bridge.handle(&mut manager, signal);
            }
            AppEvent::Key(k) => match k.code {
                KeyCode::Char('r') => manager.resume(),
                KeyCode::Char('q') => {
                    result = manager.end();
                    break;
                }
                _ => {}
            },
            _ => {}
        }
        if handled == 2 {
            assert_eq!(manager.phase(), SessionPhase::Paused);
        }
    }

    // 300s before backgrounding, nothing while away, 60s after resuming
    assert_eq!(result, Some(360));
}

#[test]
fn headless_restart_between_steps_keeps_time() {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 7, 0, 0).unwrap());
    let store = MemorySessionStore::new();

    let mut manager = SessionManager::with_clock(store.clone(), clock.clone(), quiet());
    manager.start("S2", WorkoutKind::Outdoor);
    manager.set_cursor(Some(3));
    clock.advance_secs(240);
    drop(manager); // process killed, no pause

    clock.advance_secs(600);
    let mut relaunched = SessionManager::with_clock(store, clock.clone(), quiet());
    assert_eq!(
        relaunched.restoration_info(),
        Some(("S2".to_string(), WorkoutKind::Outdoor))
    );
    assert_eq!(relaunched.state().unwrap().selected_index, Some(3));
    assert_eq!(relaunched.phase(), SessionPhase::Running);

    let mut bridge = LifecycleBridge::new();
    bridge.on_suspend(&mut relaunched);
    assert_eq!(relaunched.end(), Some(840));
}
