use std::convert::Infallible;

use axum::extract::OptionalFromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::SharedState;

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: i64,
}

impl Claims {
    /// Claims for `user_id` expiring `hours` from now. Fails instead of
    /// overflowing on out-of-range lifetimes.
    pub fn new(user_id: Uuid, hours: i64) -> Result<Self, String> {
        let exp = Duration::try_hours(hours)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| format!("Session lifetime out of range: {hours}h"))?;
        Ok(Self {
            sub: user_id,
            exp: exp.timestamp(),
        })
    }
}

pub fn encode_token(claims: &Claims, secret: &str) -> Result<String, String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| format!("Session encode failed: {e}"))
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Session decode failed: {e}"))
}

/// Log `user_id` in: a signed session cookie good for `hours`.
pub fn session_cookie(user_id: Uuid, secret: &str, hours: i64) -> Result<Cookie<'static>, String> {
    let max_age = hours
        .checked_mul(3600)
        .map(time::Duration::seconds)
        .ok_or_else(|| format!("Session lifetime out of range: {hours}h"))?;
    let token = encode_token(&Claims::new(user_id, hours)?, secret)?;
    Ok(Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build())
}

/// The user behind a valid session cookie.
#[derive(Debug, Clone, Copy)]
pub struct SessionUser {
    pub user_id: Uuid,
}

impl SessionUser {
    fn from_jar(jar: &CookieJar, secret: &str) -> Option<Self> {
        let cookie = jar.get(SESSION_COOKIE)?;
        decode_token(cookie.value(), secret)
            .ok()
            .map(|claims| SessionUser { user_id: claims.sub })
    }
}

impl OptionalFromRequestParts<SharedState> for SessionUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Option<Self>, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        Ok(SessionUser::from_jar(&jar, &state.config.session_secret))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_round_trips_to_user() {
        let id = Uuid::now_v7();
        let cookie = session_cookie(id, "secret-secret-secret", 1).unwrap();
        let jar = CookieJar::new().add(cookie);
        let user = SessionUser::from_jar(&jar, "secret-secret-secret").unwrap();
        assert_eq!(user.user_id, id);
    }

    #[test]
    fn out_of_range_lifetime_is_an_error() {
        assert!(Claims::new(Uuid::now_v7(), i64::MAX / 2).is_err());
        assert!(session_cookie(Uuid::now_v7(), "secret-secret-secret", i64::MAX / 2).is_err());
    }

    #[test]
    fn wrong_secret_is_no_session() {
        let cookie = session_cookie(Uuid::now_v7(), "secret-secret-secret", 1).unwrap();
        let jar = CookieJar::new().add(cookie);
        assert!(SessionUser::from_jar(&jar, "another-secret-entirely").is_none());
    }
}
