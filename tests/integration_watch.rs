// Drives the watch screen through a pseudo terminal.
//
// Notes:
// - Requires a TTY; uses expectrl which allocates a pseudo terminal.
// - Marked Unix-only and ignored by default to avoid CI/platform issues.
// - Run manually via: `cargo test --test integration_watch -- --ignored`.

#![cfg(unix)]

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use expectrl::{Eof, Session};

// Every path the binary might touch lives under `dir`, logs included.
fn pacekeep(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin("pacekeep"));
    cmd.arg("--db")
        .arg(dir.join("session.db"))
        .arg("--history")
        .arg(dir.join("workouts.csv"))
        .arg("--config")
        .arg(dir.join("config.json"))
        .env("HOME", dir)
        .env_remove("PACEKEEP_LOG")
        .env_remove("PACEKEEP_DEBUG_LOG");
    cmd
}

#[test]
#[ignore]
fn watch_pauses_running_session_and_quits() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;

    let status = pacekeep(dir.path())
        .args(["start", "--id", "S1", "--kind", "cardio"])
        .status()?;
    assert!(status.success());

    let mut watch = pacekeep(dir.path());
    watch.args(["watch", "--tick-ms", "50"]);
    let mut p = Session::spawn(watch)?;

    // Give the app a moment to initialize the terminal/alternate screen
    std::thread::sleep(Duration::from_millis(300));

    p.send("p")?;
    std::thread::sleep(Duration::from_millis(200));
    p.send("q")?;
    p.expect(Eof)?;

    let out = pacekeep(dir.path()).args(["status", "--json"]).output()?;
    let json: serde_json::Value = serde_json::from_slice(&out.stdout)?;
    assert_eq!(json["phase"], "paused");
    // logs land in the sandboxed state dir
    assert!(dir.path().join(".local/state/pacekeep/logs").is_dir());
    Ok(())
}
