//! Reset-token lifecycle: request, validate, consume, invalidate.
//!
//! The plain token only ever exists in the emailed link. The user record keeps
//! its SHA-256 digest and an expiry; a consumed request is left with an empty
//! digest and an expiry of "now", so the same link can never be replayed.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::auth::password;
use crate::email;
use crate::error::AppError;
use crate::flash::Flashes;
use crate::models::User;
use crate::state::AppState;

const TOKEN_BYTES: usize = 32;

pub const MSG_EXPIRED: &str = "Your reset request is invalid.  It may have expired.";
pub const MSG_BAD_TOKEN: &str = "Your reset request token is invalid.";
pub const MSG_TOKEN_ACCEPTED: &str = "Token accepted. Reset your password!";
pub const MSG_PASSWORDS_DIFFER: &str = "Passwords must match.";

#[derive(Debug, Deserialize)]
pub struct ResetForm {
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm: String,
}

#[derive(Debug)]
pub enum ResetError {
    /// New password rejected by the policy; one message per failed rule.
    Form(Vec<String>),
    /// No such user, or no open request for them.
    Expired,
    InvalidToken,
    /// Too many wrong tokens; seconds until the next attempt.
    Throttled(u64),
    Store(AppError),
}

impl std::fmt::Display for ResetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResetError::Form(msgs) => write!(f, "Invalid form: {}", msgs.join(" ")),
            ResetError::Expired => write!(f, "Reset request missing or expired"),
            ResetError::InvalidToken => write!(f, "Reset token mismatch"),
            ResetError::Throttled(secs) => write!(f, "Reset attempts throttled for {secs}s"),
            ResetError::Store(err) => write!(f, "{err}"),
        }
    }
}

impl From<AppError> for ResetError {
    fn from(err: AppError) -> Self {
        ResetError::Store(err)
    }
}

impl ResetError {
    /// Whether the reset form should still be offered after this failure.
    pub fn keeps_form(&self) -> bool {
        matches!(self, ResetError::Form(_) | ResetError::Store(_))
    }

    pub fn flash_into(&self, flashes: &mut Flashes) {
        match self {
            ResetError::Form(msgs) => {
                for msg in msgs {
                    flashes.error(msg.clone());
                }
            }
            ResetError::Expired => flashes.warning(MSG_EXPIRED),
            ResetError::InvalidToken => flashes.error(MSG_BAD_TOKEN),
            ResetError::Throttled(secs) => flashes.error(format!(
                "Too many attempts. Please try again in {} minutes.",
                secs.div_ceil(60).max(1)
            )),
            ResetError::Store(err) => flashes.error(err.public_message()),
        }
    }
}

/// A fresh token: `plain` goes into the link, `digest` into the user record.
pub struct IssuedToken {
    pub plain: String,
    pub digest: String,
}

pub fn generate_token() -> IssuedToken {
    let bytes: [u8; TOKEN_BYTES] = rand::random();
    let plain = hex::encode(bytes);
    let digest = hash_token(&plain);
    IssuedToken { plain, digest }
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Constant-time comparison of a candidate against a stored digest.
pub fn token_matches(candidate: &str, stored_digest: &str) -> bool {
    if stored_digest.is_empty() {
        return false;
    }
    hash_token(candidate)
        .as_bytes()
        .ct_eq(stored_digest.as_bytes())
        .into()
}

pub struct PasswordPolicy {
    pub min_length: usize,
}

impl PasswordPolicy {
    pub fn check(&self, password: &str, confirm: &str) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if password.chars().count() < self.min_length {
            errors.push(format!(
                "Password must be at least {} characters long.",
                self.min_length
            ));
        }
        if confirm != password {
            errors.push(MSG_PASSWORDS_DIFFER.to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

pub fn parse_user_id(raw: &str) -> Result<Uuid, ResetError> {
    Uuid::parse_str(raw).map_err(|_| ResetError::Expired)
}

/// Decide whether `candidate` opens the reset request on `user` at `now`.
pub fn validate_token(
    user: Option<User>,
    candidate: &str,
    now: DateTime<Utc>,
) -> Result<User, ResetError> {
    let user = user.ok_or(ResetError::Expired)?;
    if user.reset_password_expires <= now {
        return Err(ResetError::Expired);
    }
    if !token_matches(candidate, &user.reset_password_token) {
        return Err(ResetError::InvalidToken);
    }
    Ok(user)
}

/// Look the request up and check the token, counting wrong guesses.
pub async fn check_link(
    state: &AppState,
    user_id: Uuid,
    token: &str,
) -> Result<User, ResetError> {
    state
        .reset_limiter
        .check(user_id)
        .map_err(ResetError::Throttled)?;

    let now = Utc::now();
    let user = state.store.find_pending_reset(user_id, now).await?;

    validate_token(user, token, now).inspect_err(|err| {
        if matches!(err, ResetError::InvalidToken) {
            tracing::warn!(%user_id, "Reset token mismatch");
            state.reset_limiter.record_failure(user_id);
        }
    })
}

/// Validate the form and the link, then store the new password and close the
/// request. Returns the updated user.
pub async fn complete_reset(
    state: &AppState,
    raw_user_id: &str,
    token: &str,
    form: &ResetForm,
) -> Result<User, ResetError> {
    let policy = PasswordPolicy {
        min_length: state.config.min_password_length,
    };
    policy
        .check(&form.password, &form.confirm)
        .map_err(ResetError::Form)?;

    // Looked up again here in case the URL was edited after the GET.
    let user_id = parse_user_id(raw_user_id)?;
    let mut user = check_link(state, user_id, token).await?;

    let password_hash = password::hash_blocking(form.password.clone())
        .await
        .map_err(AppError::Internal)?;

    let now = Utc::now();
    let consumed = state
        .store
        .consume_reset(user.id, &user.reset_password_token, &password_hash, now)
        .await?;
    if !consumed {
        // Another submission closed the request between lookup and update.
        return Err(ResetError::Expired);
    }
    state.reset_limiter.clear(user.id);

    user.password_hash = password_hash;
    user.reset_password_token.clear();
    user.reset_password_expires = now;
    user.updated_at = now;

    tracing::info!(user_id = %user.id, "Password reset completed");
    Ok(user)
}

/// Courtesy notice after a reset. Failures are logged and handed back for
/// display; they never undo the reset.
pub async fn notify(state: &AppState, user: &User) -> Result<(), String> {
    email::send_reset_notice(state.mailer.as_ref(), user, &state.config.title)
        .await
        .inspect_err(|e| tracing::warn!(user_id = %user.id, "Reset notice not sent: {e}"))
}

/// Open a reset request for `email` and mail the link. Unknown addresses are
/// accepted silently.
pub async fn request_reset(state: &AppState, email_address: &str) -> Result<(), AppError> {
    let Some(user) = state.store.find_by_email(email_address).await? else {
        tracing::info!("Password reset requested for unknown email");
        return Ok(());
    };

    let token = generate_token();
    let ttl = state.config.token_ttl_minutes;
    let expires_at = Duration::try_minutes(ttl)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        .ok_or_else(|| AppError::Internal(format!("Reset token lifetime out of range: {ttl}m")))?;
    state
        .store
        .set_reset_token(user.id, &token.digest, expires_at)
        .await?;

    let reset_url = format!(
        "{}/reset/{}/{}",
        state.config.base_url.trim_end_matches('/'),
        user.id,
        token.plain
    );
    if let Err(e) =
        email::send_reset_link(state.mailer.as_ref(), &user, &state.config.title, &reset_url).await
    {
        tracing::error!(user_id = %user.id, "Failed to send password reset email: {e}");
    }
    Ok(())
}
