//! Shared server state

use std::sync::Arc;
use std::time::Instant;

use crate::dispatch::Orchestrator;

/// State handed to every handler
#[derive(Debug)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    started_at: Instant,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
