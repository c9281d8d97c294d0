use askama::Template;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::CookieJar;

use crate::auth::session::{session_cookie, SessionUser};
use crate::error::AppError;
use crate::flash::Flashes;
use crate::reset::{self, ResetForm};
use crate::state::SharedState;
use crate::views::render;

pub const MSG_LOGGED_IN: &str = "You are logged in with your new password!";
pub const MSG_NOTICE_FAILED: &str =
    "Your password was reset, but the confirmation email could not be sent.";

#[derive(Template)]
#[template(path = "account/reset.html")]
struct ResetTemplate<'a> {
    title: &'a str,
    url: String,
    valid_token: bool,
    flashes: Flashes,
}

fn reset_url(id: &str, token: &str) -> String {
    format!("/reset/{id}/{token}")
}

/// GET /reset/{id}/{token}
pub async fn page(
    State(state): State<SharedState>,
    session: Option<SessionUser>,
    Path((id, token)): Path<(String, String)>,
) -> Response {
    if session.is_some() {
        return Redirect::to("/").into_response();
    }

    let mut flashes = Flashes::new();
    let checked = match reset::parse_user_id(&id) {
        Ok(user_id) => reset::check_link(&state, user_id, &token).await,
        Err(e) => Err(e),
    };

    let valid_token = match checked {
        Ok(_) => {
            flashes.success(reset::MSG_TOKEN_ACCEPTED);
            true
        }
        Err(e) => {
            tracing::debug!("Reset link rejected: {e}");
            e.flash_into(&mut flashes);
            false
        }
    };

    render(&ResetTemplate {
        title: &state.config.title,
        url: reset_url(&id, &token),
        valid_token,
        flashes,
    })
}

/// POST /reset/{id}/{token}
pub async fn submit(
    State(state): State<SharedState>,
    Path((id, token)): Path<(String, String)>,
    jar: CookieJar,
    Form(form): Form<ResetForm>,
) -> Response {
    let mut flashes = Flashes::new();

    let keep_form = match reset::complete_reset(&state, &id, &token, &form).await {
        Ok(user) => {
            let secret = &state.config.session_secret;
            match session_cookie(user.id, secret, state.config.session_hours) {
                Ok(cookie) => {
                    if reset::notify(&state, &user).await.is_err() {
                        flashes.error(MSG_NOTICE_FAILED);
                    }
                    flashes.info(MSG_LOGGED_IN);
                    let jar = jar.add(cookie).add(flashes.into_cookie());
                    return (jar, Redirect::to("/")).into_response();
                }
                // The password is already changed; only the login step failed.
                Err(e) => {
                    flashes.error(AppError::Internal(e).public_message());
                    false
                }
            }
        }
        Err(e) => {
            tracing::debug!("Password reset rejected: {e}");
            e.flash_into(&mut flashes);
            e.keeps_form()
        }
    };

    render(&ResetTemplate {
        title: &state.config.title,
        url: reset_url(&id, &token),
        valid_token: keep_form,
        flashes,
    })
}
