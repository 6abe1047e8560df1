//! Shared application state.

use std::sync::Arc;

use crate::analysis::Analyzer;
use crate::config::Config;
use crate::pool::AiPool;

/// Everything the handlers need, shared behind an `Arc`.
#[derive(Debug)]
pub struct AppState {
    pub config: Config,
    pub pool: Arc<AiPool>,
    pub analyzer: Analyzer,
}

impl AppState {
    pub fn new(config: Config, pool: Arc<AiPool>, analyzer: Analyzer) -> Self {
        Self {
            config,
            pool,
            analyzer,
        }
    }
}
