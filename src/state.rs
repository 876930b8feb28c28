//! Shared application state.

use std::sync::Arc;

use crate::config::Config;
use crate::db::Db;
use crate::mail::Mailer;
use crate::rate_limit::RateLimiter;

pub struct AppState {
    pub config: Config,
    pub db: Db,
    /// Present only when SMTP is configured.
    pub mailer: Option<Mailer>,
    pub auth_limiter: RateLimiter,
}

pub type SharedState = Arc<AppState>;
