pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod flash;
pub mod models;
pub mod rate_limit;
pub mod reset;
pub mod state;
pub mod views;

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::UserStore;
use crate::email::{LogMailer, Mailer, SmtpMailer};
use crate::rate_limit::ResetAttemptLimiter;
use crate::state::{AppState, SharedState};

/// Pick the outbound mailer: SMTP when configured and valid, otherwise the log.
pub fn mailer_from_config(config: &Config) -> Arc<dyn Mailer> {
    match config.smtp.as_ref().map(SmtpMailer::new) {
        Some(Ok(mailer)) => {
            tracing::info!("SMTP configured");
            Arc::new(mailer)
        }
        Some(Err(e)) => {
            tracing::warn!("SMTP not available: {e}");
            Arc::new(LogMailer)
        }
        None => {
            tracing::warn!("SMTP not configured, emails will be logged");
            Arc::new(LogMailer)
        }
    }
}

pub fn build_state(
    store: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
    config: Config,
) -> SharedState {
    Arc::new(AppState {
        store,
        mailer,
        config,
        reset_limiter: ResetAttemptLimiter::new(),
    })
}

pub fn build_app(state: SharedState) -> Router {
    Router::new()
        .merge(views::view_routes())
        .route("/health", axum::routing::get(health))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
