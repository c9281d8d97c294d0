use askama::Template;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Form;
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::flash::Flashes;
use crate::reset;
use crate::state::SharedState;
use crate::views::render;

pub const MSG_LINK_SENT: &str = "If that email is registered, a reset link has been sent.";

#[derive(Template)]
#[template(path = "account/forgot.html")]
struct ForgotTemplate<'a> {
    title: &'a str,
    flashes: Flashes,
}

#[derive(Deserialize)]
pub struct ForgotForm {
    #[serde(default)]
    pub email: String,
}

pub async fn page(State(state): State<SharedState>, jar: CookieJar) -> Response {
    let (jar, flashes) = Flashes::take(jar);
    let template = ForgotTemplate {
        title: &state.config.title,
        flashes,
    };
    (jar, render(&template)).into_response()
}

pub async fn submit(State(state): State<SharedState>, Form(form): Form<ForgotForm>) -> Response {
    let mut flashes = Flashes::new();
    let email = form.email.trim();

    if email.is_empty() {
        flashes.error("Please enter your email address.");
    } else {
        match reset::request_reset(&state, email).await {
            Ok(()) => flashes.info(MSG_LINK_SENT),
            Err(e) => flashes.error(e.public_message()),
        }
    }

    render(&ForgotTemplate {
        title: &state.config.title,
        flashes,
    })
}
