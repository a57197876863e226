// Library surface for the binary, headless hosts and integration tests.
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod elapsed;
pub mod error;
pub mod lifecycle;
pub mod manager;
pub mod runtime;
pub mod session;
pub mod store;
pub mod util;
pub mod workout_log;

pub use clock::{Clock, ManualClock, SystemClock};
pub use lifecycle::{HostSignal, LifecycleBridge, SessionLifecycle};
pub use manager::{ManagerOptions, SessionEvent, SessionManager};
pub use session::{SessionPhase, SessionSnapshot, SessionState, WorkoutKind};
pub use store::{MemorySessionStore, SessionStore, SqliteSessionStore};
