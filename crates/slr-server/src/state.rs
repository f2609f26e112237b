use std::sync::Arc;

use crate::data::DataFile;
use crate::gemini::QueryGenerator;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub data: DataFile,
    pub generator: Arc<dyn QueryGenerator>,
}

impl AppState {
    pub fn new(data: DataFile, generator: Arc<dyn QueryGenerator>) -> Self {
        Self { data, generator }
    }
}
