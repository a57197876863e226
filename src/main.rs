mod ui;

use clap::{Parser, Subcommand};
use crossterm::{
    event::{DisableFocusChange, EnableFocusChange, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::EnvFilter;

use pacekeep::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    runtime::{AppEvent, CrosstermEventSource, Runner},
    util::{format_clock, humanize_since},
    workout_log::{CsvWorkoutLog, WorkoutLog, WorkoutRecord},
    Clock, LifecycleBridge, SessionEvent, SessionManager, SessionSnapshot, SqliteSessionStore,
    SystemClock, WorkoutKind,
};

const INPUT_POLL_MS: u64 = 100;
const PRESENCE_EVERY: Duration = Duration::from_secs(30);

/// keeps workout timers honest across pauses, backgrounding and restarts
#[derive(Parser, Debug)]
#[clap(version, about)]
pub struct Cli {
    /// session database to use instead of the configured one
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    /// config file to read
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// completed-workout CSV to append to
    #[clap(long, global = true)]
    history: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// start timing a workout
    Start {
        /// id of the workout record this session belongs to
        #[clap(long)]
        id: String,

        #[clap(long, value_enum)]
        kind: WorkoutKind,
    },
    /// pause the running session
    Pause,
    /// resume the paused session
    Resume,
    /// end the session and log its duration
    End {
        /// do not append to the workout history
        #[clap(long)]
        no_log: bool,
    },
    /// abandon the session without logging it
    Discard,
    /// show the active session
    Status {
        #[clap(long)]
        json: bool,
    },
    /// set or clear the selected exercise index
    Cursor { index: Option<usize> },
    /// live view; losing terminal focus pauses the session
    Watch {
        /// display refresh interval in milliseconds
        #[clap(long)]
        tick_ms: Option<u64>,
    },
    /// list recently completed workouts
    History {
        #[clap(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
    /// print the effective configuration
    Config {
        /// write the current configuration to the config file
        #[clap(long)]
        init: bool,
    },
}

/// State rendered by the watch screen
#[derive(Debug, Default)]
pub struct WatchView {
    pub snapshot: SessionSnapshot,
    pub session_id: Option<String>,
    pub cursor: Option<usize>,
    pub notice: Option<String>,
}

impl WatchView {
    fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Changed(snapshot) => self.snapshot = snapshot,
            SessionEvent::Tick { elapsed_seconds } => {
                if self.snapshot.has_active_session && !self.snapshot.is_paused {
                    self.snapshot.elapsed_seconds = elapsed_seconds;
                }
            }
        }
    }

    fn sync(&mut self, manager: &SessionManager<SqliteSessionStore>) {
        let state = manager.state();
        self.session_id = state.map(|s| s.session_id.clone());
        self.cursor = state.and_then(|s| s.selected_index);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config_store = cli
        .config
        .as_ref()
        .map(FileConfigStore::with_path)
        .unwrap_or_default();
    let mut config = config_store.load();

    let watching = matches!(cli.command, Command::Watch { .. });
    let _log_guard = init_logging(watching, &config);

    if let Command::Config { init } = cli.command {
        if init {
            config_store.save(&config)?;
            eprintln!("wrote {}", config_store.path().display());
        }
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    if let Command::Watch {
        tick_ms: Some(ms), ..
    } = cli.command
    {
        config.tick_interval_ms = ms;
    }

    let db_path = cli
        .db
        .clone()
        .or_else(|| config.db_path.clone())
        .or_else(AppDirs::db_path)
        .unwrap_or_else(|| PathBuf::from("pacekeep_session.db"));
    let history_path = cli
        .history
        .clone()
        .or_else(|| config.history_path.clone())
        .or_else(AppDirs::workout_log_path)
        .unwrap_or_else(|| PathBuf::from("pacekeep_workouts.csv"));

    let store = SqliteSessionStore::open(&db_path)?;
    let mut manager = SessionManager::with_clock(store, SystemClock, config.manager_options());
    let history = CsvWorkoutLog::new(history_path);

    match cli.command {
        Command::Start { id, kind } => {
            if let Some(active) = manager.state() {
                return Err(format!(
                    "session {} ({}) is already active",
                    active.session_id, active.workout_kind
                )
                .into());
            }
            manager.start(id.clone(), kind);
            println!("started {kind} session {id}");
        }
        Command::Pause => {
            manager.pause();
            print_status(&manager, false)?;
        }
        Command::Resume => {
            manager.resume();
            print_status(&manager, false)?;
        }
        Command::End { no_log } => match finish(&mut manager, (!no_log).then_some(&history))? {
            Some(record) => println!(
                "ended {} session {} after {}",
                record.workout_kind,
                record.session_id,
                format_clock(record.elapsed_seconds)
            ),
            None => eprintln!("no active session"),
        },
        Command::Discard => {
            if manager.has_active_session() {
                manager.discard();
                println!("session discarded");
            } else {
                eprintln!("no active session");
            }
        }
        Command::Status { json } => print_status(&manager, json)?,
        Command::Cursor { index } => {
            if manager.has_active_session() {
                manager.set_cursor(index);
            } else {
                eprintln!("no active session");
            }
        }
        Command::Watch { .. } => run_watch(&mut manager, &history)?,
        Command::History { limit } => {
            for record in history.recent(limit)? {
                println!(
                    "{}  {:<8} {:>9}  {}",
                    record.ended_at.format("%Y-%m-%d %H:%M"),
                    record.workout_kind,
                    format_clock(record.elapsed_seconds),
                    record.session_id
                );
            }
        }
        // printed before the store was opened
        Command::Config { .. } => {}
    }

    Ok(())
}

fn init_logging(to_file: bool, config: &Config) -> Option<WorkerGuard> {
    let debug_enabled = std::env::var("PACEKEEP_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("PACEKEEP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // the watch screen owns the terminal, so its logs go to a file
    if to_file {
        let appender = config
            .log_dir
            .clone()
            .or_else(AppDirs::log_dir)
            .and_then(|dir| match file_appender(&dir) {
                Ok(appender) => Some(appender),
                Err(e) => {
                    eprintln!("pacekeep: not logging to {}: {e}", dir.display());
                    None
                }
            });
        let (writer, guard) = tracing_appender::non_blocking(appender?);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(writer)
            .init();
        return Some(guard);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    None
}

fn file_appender(dir: &Path) -> Result<RollingFileAppender, Box<dyn Error>> {
    std::fs::create_dir_all(dir)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("pacekeep.log")
        .build(dir)?;
    Ok(appender)
}

/// Write the duration into the log, when one is given, and only then end the
/// session. A failed write leaves the session in place for another try.
fn finish(
    manager: &mut SessionManager<SqliteSessionStore>,
    history: Option<&CsvWorkoutLog>,
) -> Result<Option<WorkoutRecord>, Box<dyn Error>> {
    let Some(state) = manager.state().cloned() else {
        return Ok(None);
    };

    let record = WorkoutRecord::new(
        state.session_id,
        state.workout_kind,
        state.started_at,
        SystemClock.now(),
        manager.elapsed_seconds(),
    );
    if let Some(history) = history {
        history.record(&record)?;
    }
    manager.end();
    Ok(Some(record))
}

fn print_status(
    manager: &SessionManager<SqliteSessionStore>,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let snapshot = manager.snapshot();
    let state = manager.state();

    if json {
        let report = serde_json::json!({
            "phase": snapshot.phase(),
            "sessionID": state.map(|s| s.session_id.as_str()),
            "selectedIndex": state.and_then(|s| s.selected_index),
            "snapshot": snapshot,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match state {
        None => println!("no active session"),
        Some(state) => {
            println!(
                "{} {} session {}",
                snapshot.phase(),
                state.workout_kind,
                state.session_id
            );
            println!("elapsed  {}", format_clock(snapshot.elapsed_seconds));
            println!(
                "started  {} ({})",
                state.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
                humanize_since(state.started_at, SystemClock.now())
            );
        }
    }
    Ok(())
}

fn run_watch(
    manager: &mut SessionManager<SqliteSessionStore>,
    history: &CsvWorkoutLog,
) -> Result<(), Box<dyn Error>> {
    if !stdin().is_tty() {
        return Err("watch needs an interactive terminal".into());
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = watch_loop(&mut terminal, manager, history);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableFocusChange,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn watch_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    manager: &mut SessionManager<SqliteSessionStore>,
    history: &CsvWorkoutLog,
) -> Result<(), Box<dyn Error>> {
    let updates = manager.subscribe();
    let runner = Runner::new(
        CrosstermEventSource::new(),
        Duration::from_millis(INPUT_POLL_MS),
    );
    let mut bridge = LifecycleBridge::new();
    let mut view = WatchView::default();
    view.sync(manager);
    let mut last_presence = Instant::now();

    loop {
        for event in updates.try_iter() {
            view.apply(event);
        }
        terminal.draw(|f| f.render_widget(&view, f.area()))?;

        match runner.step() {
            AppEvent::Tick | AppEvent::Resize => {
                if last_presence.elapsed() >= PRESENCE_EVERY {
                    manager.touch();
                    last_presence = Instant::now();
                }
                continue;
            }
            AppEvent::Host(signal) => {
                if bridge.handle(manager, signal) {
                    view.notice = Some("paused while in the background".to_string());
                }
            }
            AppEvent::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                view.notice = None;
                match key.code {
                    KeyCode::Esc | KeyCode::Char('q') => break,
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,
                    KeyCode::Char('p') => manager.pause(),
                    KeyCode::Char('r') => manager.resume(),
                    KeyCode::Char(' ') => {
                        if manager.snapshot().is_paused {
                            manager.resume();
                        } else {
                            manager.pause();
                        }
                    }
                    KeyCode::Char('e') => match finish(manager, Some(history)) {
                        Ok(Some(record)) => {
                            view.notice = Some(format!(
                                "logged {} after {}",
                                record.session_id,
                                format_clock(record.elapsed_seconds)
                            ));
                        }
                        Ok(None) => {}
                        Err(e) => view.notice = Some(format!("could not log workout: {e}")),
                    },
                    KeyCode::Char('d') => manager.discard(),
                    KeyCode::Up => {
                        let next = view.cursor.map_or(0, |c| c.saturating_sub(1));
                        manager.set_cursor(Some(next));
                    }
                    KeyCode::Down => {
                        let next = view.cursor.map_or(0, |c| c + 1);
                        manager.set_cursor(Some(next));
                    }
                    _ => {}
                }
            }
        }
        view.sync(manager);
    }

    Ok(())
}
