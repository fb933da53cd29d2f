//! Shared application state.

use std::sync::Arc;

use goodshelf_domain::Services;

use crate::sessions::SessionStore;

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(services: Services, sessions: Arc<SessionStore>) -> Self {
        Self { services, sessions }
    }
}
