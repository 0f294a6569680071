//! Server-side session lifecycle
//!
//! A session is a server-side record keyed by a signed identifier. The
//! identifier alone proves nothing: validation checks the signature, then
//! the record, then idle expiry, and only then refreshes the last-access
//! time. Expired records are dropped both inline during validation and by
//! the periodic sweeper, so a stale identifier never validates regardless
//! of sweep timing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::config::SessionConfig;
use crate::error::AuthError;
use crate::token::TokenService;
use crate::AuthResult;

/// A server-side session record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every successful validation; never moves backwards
    pub last_access_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl Session {
    /// Whether the session has been idle longer than `idle_ttl`
    pub fn is_idle_expired(&self, idle_ttl: Duration, now: DateTime<Utc>) -> bool {
        now - self.last_access_at > idle_ttl
    }
}

/// Storage backend for session records.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str) -> AuthResult<Option<Session>>;
    async fn put(&self, session: Session) -> AuthResult<()>;
    async fn delete(&self, session_id: &str) -> AuthResult<()>;
    /// Delete every session belonging to a user, returning how many existed
    async fn delete_for_user(&self, user_id: &str) -> AuthResult<usize>;
    /// Drop sessions idle longer than `idle_ttl`, returning how many were dropped
    async fn sweep_expired(&self, idle_ttl: Duration) -> AuthResult<usize>;
    async fn count(&self) -> AuthResult<usize>;
}

/// In-memory session store for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str) -> AuthResult<Option<Session>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn put(&self, session: Session) -> AuthResult<()> {
        self.sessions
            .write()
            .await
            .insert(session.session_id.clone(), session);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> AuthResult<()> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }

    async fn delete_for_user(&self, user_id: &str) -> AuthResult<usize> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.user_id != user_id);
        Ok(before - sessions.len())
    }

    async fn sweep_expired(&self, idle_ttl: Duration) -> AuthResult<usize> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_idle_expired(idle_ttl, now));
        Ok(before - sessions.len())
    }

    async fn count(&self) -> AuthResult<usize> {
        Ok(self.sessions.read().await.len())
    }
}

/// Manages session creation, validation, and expiry.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    tokens: Arc<TokenService>,
    config: SessionConfig,
    sweeper_running: Arc<AtomicBool>,
}

impl SessionManager {
    /// Create a manager backed by an in-memory store
    pub fn new(tokens: Arc<TokenService>, config: SessionConfig) -> Self {
        Self::with_store(tokens, config, Arc::new(MemorySessionStore::new()))
    }

    /// Create a manager backed by an injected store
    pub fn with_store(
        tokens: Arc<TokenService>,
        config: SessionConfig,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            store,
            tokens,
            config,
            sweeper_running: Arc::new(AtomicBool::new(false)),
        }
    }

    fn idle_ttl(&self) -> Duration {
        Duration::seconds(self.config.inactivity_ttl as i64)
    }

    /// Create a session for a user, returning its signed identifier
    pub async fn create_session(
        &self,
        user_id: &str,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> AuthResult<String> {
        let session_id = self.tokens.generate_session_id(user_id)?;
        let now = Utc::now();
        let session = Session {
            session_id: session_id.clone(),
            user_id: user_id.to_string(),
            created_at: now,
            last_access_at: now,
            ip_address: ip_address.map(str::to_string),
            user_agent: user_agent.map(str::to_string),
        };
        self.store.put(session).await?;
        tracing::debug!("Created session for user {}", user_id);
        Ok(session_id)
    }

    /// Validate a session identifier.
    ///
    /// Checks the signature, the existence of the record, and idle expiry,
    /// in that order; a passing session has its last-access time refreshed.
    /// An idle-expired record is deleted on sight.
    pub async fn validate_session(&self, session_id: &str) -> AuthResult<bool> {
        if self.tokens.verify_session_id(session_id).is_none() {
            return Ok(false);
        }

        let mut session = match self.store.get(session_id).await? {
            Some(session) => session,
            None => return Ok(false),
        };

        let now = Utc::now();
        if session.is_idle_expired(self.idle_ttl(), now) {
            self.store.delete(session_id).await?;
            tracing::debug!("Dropped idle-expired session for user {}", session.user_id);
            return Ok(false);
        }

        session.last_access_at = now;
        self.store.put(session).await?;
        Ok(true)
    }

    /// Destroy a session. Destroying an unknown session is not an error.
    pub async fn destroy_session(&self, session_id: &str) -> AuthResult<()> {
        self.store.delete(session_id).await
    }

    /// Destroy every session belonging to a user, returning how many existed
    pub async fn destroy_user_sessions(&self, user_id: &str) -> AuthResult<usize> {
        let removed = self.store.delete_for_user(user_id).await?;
        if removed > 0 {
            tracing::debug!("Destroyed {} sessions for user {}", removed, user_id);
        }
        Ok(removed)
    }

    /// Drop every idle-expired session, returning how many were dropped
    pub async fn cleanup_expired_sessions(&self) -> AuthResult<usize> {
        let removed = self.store.sweep_expired(self.idle_ttl()).await?;
        if removed > 0 {
            tracing::debug!("Removed {} expired sessions", removed);
        }
        Ok(removed)
    }

    /// Number of live sessions in the store
    pub async fn active_session_count(&self) -> AuthResult<usize> {
        self.store.count().await
    }

    /// Start the background expiry sweeper.
    ///
    /// Runs until [`stop_sweeper`] is called. Starting a second sweeper
    /// while one is running is an error.
    ///
    /// [`stop_sweeper`]: SessionManager::stop_sweeper
    pub fn start_sweeper(&self) -> AuthResult<JoinHandle<()>> {
        if self.sweeper_running.swap(true, Ordering::SeqCst) {
            return Err(AuthError::config_error("Session sweeper is already running"));
        }

        let store = Arc::clone(&self.store);
        let running = Arc::clone(&self.sweeper_running);
        let idle_ttl = self.idle_ttl();
        let period = std::time::Duration::from_secs(self.config.cleanup_interval.max(1));

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            while running.load(Ordering::SeqCst) {
                interval.tick().await;
                match store.sweep_expired(idle_ttl).await {
                    Ok(0) => {}
                    Ok(removed) => {
                        tracing::info!("Session sweep removed {} expired sessions", removed)
                    }
                    Err(err) => tracing::error!("Session sweep failed: {}", err),
                }
            }
        });

        tracing::info!(
            "Started session sweeper with interval {}s",
            self.config.cleanup_interval
        );
        Ok(handle)
    }

    /// Signal the background sweeper to stop after its current tick
    pub fn stop_sweeper(&self) {
        self.sweeper_running.store(false, Ordering::SeqCst);
    }

    /// Render the Set-Cookie header value for a session identifier
    pub fn create_cookie_header(&self, session_id: &str) -> String {
        let mut cookie = format!("{}={}", self.config.cookie_name, session_id);
        cookie.push_str(&format!("; Path={}", self.config.cookie_path));
        if let Some(domain) = &self.config.cookie_domain {
            cookie.push_str(&format!("; Domain={}", domain));
        }
        cookie.push_str(&format!("; Max-Age={}", self.config.inactivity_ttl));
        if self.config.cookie_secure {
            cookie.push_str("; Secure");
        }
        if self.config.cookie_http_only {
            cookie.push_str("; HttpOnly");
        }
        cookie.push_str(&format!("; SameSite={}", self.config.cookie_same_site));
        cookie
    }

    /// Extract the session identifier from a Cookie header value
    pub fn extract_session_id(&self, cookie_header: Option<&str>) -> Option<String> {
        let cookies = cookie_header?;
        for cookie in cookies.split(';') {
            let cookie = cookie.trim();
            if let Some((name, value)) = cookie.split_once('=') {
                if name == self.config.cookie_name && !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
        None
    }
}
