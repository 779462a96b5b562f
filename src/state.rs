use crate::engine::StreakEngine;
use crate::storage::JsonFileStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<StreakEngine<JsonFileStore>>,
}

impl AppState {
    pub fn new(engine: StreakEngine<JsonFileStore>) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}
