use askama::Template;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;

use crate::auth::session::SessionUser;
use crate::flash::Flashes;
use crate::state::SharedState;
use crate::views::render;

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate<'a> {
    title: &'a str,
    flashes: Flashes,
    signed_in_as: Option<String>,
}

pub async fn index(
    State(state): State<SharedState>,
    session: Option<SessionUser>,
    jar: CookieJar,
) -> Response {
    let (jar, flashes) = Flashes::take(jar);

    let signed_in_as = match session {
        Some(session) => match state.store.find_by_id(session.user_id).await {
            Ok(user) => user.map(|u| u.email),
            Err(e) => {
                tracing::error!("Failed to load session user: {e}");
                None
            }
        },
        None => None,
    };

    let template = HomeTemplate {
        title: &state.config.title,
        flashes,
        signed_in_as,
    };
    (jar, render(&template)).into_response()
}
