pub mod cli;
pub mod config;
pub mod database;
pub mod logging;
pub mod models;
pub mod planner;
pub mod sync;
pub mod template;
pub mod tui;
pub mod utils;

pub use config::Config;
pub use database::Database;
pub use models::{Channel, ChannelKind, DayRecord, Store, SyncDescriptor, SyncStatus, Task, TextField};
pub use planner::DayKey;
pub use utils::Profile;
