use std::sync::Arc;

use crate::config::Config;
use crate::db::UserStore;
use crate::email::Mailer;
use crate::rate_limit::ResetAttemptLimiter;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Config,
    pub reset_limiter: ResetAttemptLimiter,
}
