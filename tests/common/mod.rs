use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Client, Response, StatusCode};
use uuid::Uuid;

use resetflow::auth::password;
use resetflow::config::Config;
use resetflow::db::{MemoryUserStore, UserStore};
use resetflow::email::Mailer;
use resetflow::error::AppError;
use resetflow::models::User;
use resetflow::reset;

pub const SESSION_SECRET: &str = "test-session-secret-that-is-long-enough";
pub const BASE_URL: &str = "http://app.test";
pub const TITLE: &str = "Test App";

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mailer that keeps every message and can be told to fail.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_sends(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("connection refused".to_string());
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// How `FaultyUserStore` sabotages the final reset update.
#[derive(Debug, Clone, Copy)]
pub enum ConsumeFault {
    /// The write fails, e.g. the database went away.
    Error,
    /// The write matches no row, as if another submission got there first.
    Lost,
}

/// Memory store whose `consume_reset` misbehaves; everything else delegates.
pub struct FaultyUserStore {
    inner: Arc<MemoryUserStore>,
    fault: ConsumeFault,
}

#[async_trait]
impl UserStore for FaultyUserStore {
    async fn create(&self, email: &str, password_hash: &str, name: &str) -> Result<User, AppError> {
        self.inner.create(email, password_hash, name).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.inner.find_by_email(email).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        self.inner.find_by_id(id).await
    }

    async fn find_pending_reset(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, AppError> {
        self.inner.find_pending_reset(id, now).await
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.inner.set_reset_token(id, token_hash, expires_at).await
    }

    async fn consume_reset(
        &self,
        _id: Uuid,
        _token_hash: &str,
        _password_hash: &str,
        _now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        match self.fault {
            ConsumeFault::Error => Err(AppError::Internal("connection reset by peer".to_string())),
            ConsumeFault::Lost => Ok(false),
        }
    }
}

/// Whether `user` still has an open reset request.
pub fn reset_pending(user: &User) -> bool {
    !user.reset_password_token.is_empty() && user.reset_password_expires > Utc::now()
}

/// A running test server backed by the in-memory store.
pub struct TestApp {
    pub addr: std::net::SocketAddr,
    pub store: Arc<MemoryUserStore>,
    pub mailer: Arc<RecordingMailer>,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn seed_user(&self, email: &str, password_plain: &str, name: &str) -> User {
        let hash = password::hash(password_plain).unwrap();
        self.store.create(email, &hash, name).await.unwrap()
    }

    /// Open a reset request expiring `ttl` from now; returns the plain token.
    pub async fn open_reset(&self, user_id: Uuid, ttl: Duration) -> String {
        let token = reset::generate_token();
        self.store
            .set_reset_token(user_id, &token.digest, Utc::now() + ttl)
            .await
            .unwrap();
        token.plain
    }

    pub async fn stored(&self, user_id: Uuid) -> User {
        self.store.find_by_id(user_id).await.unwrap().unwrap()
    }

    pub async fn get_page(&self, path: &str) -> (StatusCode, String) {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        (status, resp.text().await.unwrap())
    }

    pub async fn get_with_cookies(&self, path: &str, cookies: &str) -> Response {
        self.client
            .get(self.url(path))
            .header(COOKIE, cookies)
            .send()
            .await
            .expect("get request failed")
    }

    pub async fn post_reset(
        &self,
        user_id: &str,
        token: &str,
        password: &str,
        confirm: &str,
    ) -> Response {
        self.client
            .post(self.url(&format!("/reset/{user_id}/{token}")))
            .form(&[("password", password), ("confirm", confirm)])
            .send()
            .await
            .expect("reset request failed")
    }

    pub async fn post_forgot(&self, email: &str) -> (StatusCode, String) {
        let resp = self
            .client
            .post(self.url("/forgot"))
            .form(&[("email", email)])
            .send()
            .await
            .expect("forgot request failed");
        let status = resp.status();
        (status, resp.text().await.unwrap())
    }
}

/// `name=value` pairs from every Set-Cookie header, joined for a Cookie header.
pub fn cookies_from(resp: &Response) -> String {
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(str::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        session_secret: SESSION_SECRET.to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        base_url: BASE_URL.to_string(),
        title: TITLE.to_string(),
        token_ttl_minutes: 60,
        min_password_length: 4,
        session_hours: 1,
        log_level: "warn".to_string(),
        smtp: None,
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config(), None).await
}

/// Spawn with a custom config, optionally sabotaging the final reset update.
/// `TestApp::store` is always the underlying memory store.
pub async fn spawn_app_with(config: Config, fault: Option<ConsumeFault>) -> TestApp {
    let store = Arc::new(MemoryUserStore::new());
    let mailer = Arc::new(RecordingMailer::default());

    let backing: Arc<dyn UserStore> = match fault {
        Some(fault) => Arc::new(FaultyUserStore {
            inner: store.clone(),
            fault,
        }),
        None => store.clone(),
    };

    let state = resetflow::build_state(backing, mailer.clone(), config);
    let app = resetflow::build_app(state);

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        store,
        mailer,
        client,
    }
}
