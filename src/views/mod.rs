pub mod forgot;
pub mod home;
pub mod reset;

use askama::Template;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::error::AppError;
use crate::state::SharedState;

pub fn view_routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(home::index))
        .route("/forgot", get(forgot::page).post(forgot::submit))
        .route("/reset/{id}/{token}", get(reset::page).post(reset::submit))
}

pub(crate) fn render<T: Template>(template: &T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => AppError::Internal(format!("Template render failed: {e}")).into_response(),
    }
}
