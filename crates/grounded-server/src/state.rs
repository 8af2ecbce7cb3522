use grounded::agent::Agent;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
    /// Applied to every turn when set
    pub turn_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(agent: Arc<Agent>, turn_timeout: Option<Duration>) -> Self {
        Self {
            agent,
            turn_timeout,
        }
    }
}
