use std::net::IpAddr;

/// Seven days.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 7 * 24 * 60;
/// One year.
pub const MAX_SESSION_HOURS: i64 = 366 * 24;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub session_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub base_url: String,
    /// Application title used in page headers and the courtesy email.
    pub title: String,
    pub token_ttl_minutes: i64,
    pub min_password_length: usize,
    pub session_hours: i64,
    pub log_level: String,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from_name: String,
    pub from_address: String,
}

impl SmtpConfig {
    /// Sender mailbox in `Name <address>` form.
    pub fn from_mailbox(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_address)
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let session_secret = env_required("RESETFLOW_SESSION_SECRET")?;

        let host: IpAddr = env_or("RESETFLOW_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid RESETFLOW_HOST: {e}"))?;

        let port: u16 = env_or("RESETFLOW_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid RESETFLOW_PORT: {e}"))?;

        let base_url = env_or("RESETFLOW_BASE_URL", &format!("http://{host}:{port}"));
        let title = env_or("RESETFLOW_TITLE", "Reset Flow");

        let token_ttl_minutes = parse_bounded(
            "RESETFLOW_TOKEN_TTL_MINUTES",
            &env_or("RESETFLOW_TOKEN_TTL_MINUTES", "60"),
            MAX_TOKEN_TTL_MINUTES,
        )?;

        let min_password_length: usize = env_or("RESETFLOW_MIN_PASSWORD_LENGTH", "4")
            .parse()
            .map_err(|e| format!("Invalid RESETFLOW_MIN_PASSWORD_LENGTH: {e}"))?;

        let session_hours = parse_bounded(
            "RESETFLOW_SESSION_HOURS",
            &env_or("RESETFLOW_SESSION_HOURS", "24"),
            MAX_SESSION_HOURS,
        )?;

        let log_level = env_or("RESETFLOW_LOG_LEVEL", "info");

        let smtp = match (
            std::env::var("RESETFLOW_SMTP_HOST").ok(),
            std::env::var("RESETFLOW_SMTP_PORT").ok(),
            std::env::var("RESETFLOW_SMTP_USER").ok(),
            std::env::var("RESETFLOW_SMTP_PASS").ok(),
            std::env::var("RESETFLOW_SMTP_FROM_ADDRESS").ok(),
        ) {
            (Some(host), Some(port), Some(user), Some(pass), Some(from_address)) => {
                Some(SmtpConfig {
                    host,
                    port: port
                        .parse()
                        .map_err(|e| format!("Invalid RESETFLOW_SMTP_PORT: {e}"))?,
                    user,
                    pass,
                    from_name: env_or("RESETFLOW_SMTP_FROM_NAME", &title),
                    from_address,
                })
            }
            _ => None,
        };

        Ok(Config {
            database_url,
            session_secret,
            host,
            port,
            base_url,
            title,
            token_ttl_minutes,
            min_password_length,
            session_hours,
            log_level,
            smtp,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a positive count no larger than `max`.
fn parse_bounded(key: &str, raw: &str, max: i64) -> Result<i64, String> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|e| format!("Invalid {key}: {e}"))?;
    if value < 1 || value > max {
        return Err(format!("Invalid {key}: must be between 1 and {max}, got {value}"));
    }
    Ok(value)
}
