//! Application state for the Axum server

use application::EventDispatcher;
use std::sync::Arc;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<EventDispatcher>,
    pub gemini_available: bool,
}

impl AppState {
    pub fn new(dispatcher: Arc<EventDispatcher>, gemini_available: bool) -> Self {
        Self {
            dispatcher,
            gemini_available,
        }
    }
}
