//! Shared handler state.

use crate::enrollment::EnrollmentService;
use crate::portal::session::SessionManager;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    pub enrollment: Arc<EnrollmentService>,
    pub sessions: Arc<SessionManager>,
    pub started_at: Instant,
}
