//! One-shot user-facing messages.
//!
//! A page that re-renders shows its [`Flashes`] directly. A handler that
//! redirects stores them in a short-lived cookie which the next page takes
//! (reads and clears).

use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl FlashLevel {
    pub fn css_class(&self) -> &'static str {
        match self {
            FlashLevel::Success => "flash-success",
            FlashLevel::Info => "flash-info",
            FlashLevel::Warning => "flash-warning",
            FlashLevel::Error => "flash-error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub msg: String,
}

#[derive(Debug, Clone, Default)]
pub struct Flashes {
    messages: Vec<FlashMessage>,
}

impl Flashes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, level: FlashLevel, msg: impl Into<String>) {
        self.messages.push(FlashMessage {
            level,
            msg: msg.into(),
        });
    }

    pub fn success(&mut self, msg: impl Into<String>) {
        self.push(FlashLevel::Success, msg);
    }

    pub fn info(&mut self, msg: impl Into<String>) {
        self.push(FlashLevel::Info, msg);
    }

    pub fn warning(&mut self, msg: impl Into<String>) {
        self.push(FlashLevel::Warning, msg);
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.push(FlashLevel::Error, msg);
    }

    pub fn messages(&self) -> &[FlashMessage] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Carry these messages across a redirect.
    pub fn into_cookie(self) -> Cookie<'static> {
        // Hex keeps the JSON clear of cookie-reserved characters.
        let value = serde_json::to_vec(&self.messages)
            .map(hex::encode)
            .unwrap_or_default();
        Cookie::build((FLASH_COOKIE, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::minutes(5))
            .build()
    }

    /// Read the carried-over messages and clear the cookie.
    pub fn take(jar: CookieJar) -> (CookieJar, Flashes) {
        let Some(cookie) = jar.get(FLASH_COOKIE) else {
            return (jar, Flashes::new());
        };

        let messages = hex::decode(cookie.value())
            .ok()
            .and_then(|bytes| serde_json::from_slice::<Vec<FlashMessage>>(&bytes).ok())
            .unwrap_or_else(|| {
                tracing::debug!("Discarding unreadable flash cookie");
                Vec::new()
            });

        let jar = jar.remove(Cookie::build(FLASH_COOKIE).path("/"));
        (jar, Flashes { messages })
    }
}
