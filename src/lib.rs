pub mod app;
pub mod config;
pub mod date_key;
pub mod engine;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod rollover;
pub mod state;
pub mod stats;
pub mod storage;
pub mod store;
pub mod streak;

pub use app::router;
pub use config::AppConfig;
pub use date_key::TimezonePolicy;
pub use engine::StreakEngine;
pub use errors::StreakError;
pub use state::AppState;
pub use storage::JsonFileStore;
pub use store::CheckInStore;
