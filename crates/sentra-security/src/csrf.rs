//! CSRF protection
//!
//! Anti-forgery tokens are random values keyed by session: generating a
//! token for a session replaces any previous one, and validation requires
//! an exact match against the live, unexpired entry. Safe methods (GET,
//! HEAD, OPTIONS) and configured exempt paths bypass protection entirely.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use http::{header, HeaderMap, Method};
use rand::{thread_rng, Rng};
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;

use crate::config::CsrfConfig;
use crate::{SecurityError, SecurityResult};

/// CSRF token length in raw bytes; hex-encoded tokens are twice this long
const TOKEN_BYTES: usize = 32;

/// A stored anti-forgery token with its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfEntry {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

impl CsrfEntry {
    /// Whether the token is expired at `now`
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}

/// Storage backend for anti-forgery tokens, keyed by session id.
#[async_trait]
pub trait CsrfTokenStore: Send + Sync {
    async fn get(&self, session_id: &str) -> SecurityResult<Option<CsrfEntry>>;
    async fn put(&self, session_id: &str, entry: CsrfEntry) -> SecurityResult<()>;
    async fn delete(&self, session_id: &str) -> SecurityResult<()>;
    /// Drop entries expired at `now`, returning how many were dropped
    async fn sweep_expired(&self, now: OffsetDateTime) -> SecurityResult<usize>;
}

/// In-memory token store for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryCsrfStore {
    entries: RwLock<HashMap<String, CsrfEntry>>,
}

impl MemoryCsrfStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CsrfTokenStore for MemoryCsrfStore {
    async fn get(&self, session_id: &str) -> SecurityResult<Option<CsrfEntry>> {
        Ok(self.entries.read().await.get(session_id).cloned())
    }

    async fn put(&self, session_id: &str, entry: CsrfEntry) -> SecurityResult<()> {
        self.entries
            .write()
            .await
            .insert(session_id.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> SecurityResult<()> {
        self.entries.write().await.remove(session_id);
        Ok(())
    }

    async fn sweep_expired(&self, now: OffsetDateTime) -> SecurityResult<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok(before - entries.len())
    }
}

/// Issues and validates per-session anti-forgery tokens.
pub struct CsrfGuard {
    config: CsrfConfig,
    store: Arc<dyn CsrfTokenStore>,
}

impl CsrfGuard {
    /// Create a guard backed by an in-memory store
    pub fn new(config: CsrfConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryCsrfStore::new()))
    }

    /// Create a guard backed by an injected store
    pub fn with_store(config: CsrfConfig, store: Arc<dyn CsrfTokenStore>) -> Self {
        Self { config, store }
    }

    /// Start building a guard
    pub fn builder() -> CsrfGuardBuilder {
        CsrfGuardBuilder::new()
    }

    /// Issue a fresh token for a session, superseding any previous one
    pub async fn generate_token(&self, session_id: &str) -> SecurityResult<String> {
        let token_bytes: [u8; TOKEN_BYTES] = thread_rng().gen();
        let token = hex::encode(token_bytes);
        let now = OffsetDateTime::now_utc();

        let entry = CsrfEntry {
            token: token.clone(),
            expires_at: now + Duration::seconds(self.config.token_lifetime as i64),
        };
        self.store.put(session_id, entry).await?;

        // Drop expired entries while we are here
        self.store.sweep_expired(now).await?;

        Ok(token)
    }

    /// Validate a candidate token for a session.
    ///
    /// True only when a live, unexpired token exists for the session and
    /// the candidate matches it exactly. Store failures reject the token.
    pub async fn validate_token(&self, session_id: &str, candidate: &str) -> bool {
        let entry = match self.store.get(session_id).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return false,
            Err(err) => {
                tracing::warn!("CSRF store lookup failed, rejecting token: {}", err);
                return false;
            }
        };

        if entry.is_expired(OffsetDateTime::now_utc()) {
            return false;
        }

        entry.token == candidate
    }

    /// Drop the live token for a session, if any
    pub async fn invalidate(&self, session_id: &str) -> SecurityResult<()> {
        self.store.delete(session_id).await
    }

    /// Drop every expired token, returning how many were dropped
    pub async fn cleanup(&self) -> SecurityResult<usize> {
        self.store.sweep_expired(OffsetDateTime::now_utc()).await
    }

    /// Whether a path is exempt from protection
    pub fn is_exempt_path(&self, path: &str) -> bool {
        self.config.exempt_paths.iter().any(|pattern| {
            if let Some(prefix) = pattern.strip_suffix('*') {
                path.starts_with(prefix)
            } else {
                path == pattern
            }
        })
    }

    /// Whether a request needs a valid token: state-changing methods on
    /// non-exempt paths
    pub fn requires_protection(&self, method: &Method, path: &str) -> bool {
        if *method == Method::GET || *method == Method::HEAD || *method == Method::OPTIONS {
            return false;
        }
        !self.is_exempt_path(path)
    }

    /// Extract the candidate token from request headers.
    ///
    /// The dedicated header wins; the cookie copy is the fallback.
    pub fn extract_token(&self, headers: &HeaderMap) -> Option<String> {
        if let Some(value) = headers.get(self.config.token_header.as_str()) {
            if let Ok(token) = value.to_str() {
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }

        let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
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

    /// Render the Set-Cookie header value for the double-submit copy
    pub fn create_cookie_header(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; SameSite=Strict",
            self.config.cookie_name, token, self.config.token_lifetime
        );
        if self.config.secure_cookie {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// Check a whole request: protected methods must carry a valid token
    pub async fn check_request(
        &self,
        session_id: &str,
        method: &Method,
        path: &str,
        headers: &HeaderMap,
    ) -> SecurityResult<()> {
        if !self.requires_protection(method, path) {
            return Ok(());
        }

        if let Some(token) = self.extract_token(headers) {
            if self.validate_token(session_id, &token).await {
                return Ok(());
            }
        }

        tracing::warn!("CSRF validation failed for {} {}", method, path);
        Err(SecurityError::CsrfValidationFailed)
    }
}

/// Fluent builder for [`CsrfGuard`].
pub struct CsrfGuardBuilder {
    config: CsrfConfig,
    store: Option<Arc<dyn CsrfTokenStore>>,
}

impl CsrfGuardBuilder {
    pub fn new() -> Self {
        Self {
            config: CsrfConfig::default(),
            store: None,
        }
    }

    pub fn token_header(mut self, header: impl Into<String>) -> Self {
        self.config.token_header = header.into();
        self
    }

    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.config.cookie_name = name.into();
        self
    }

    pub fn token_lifetime(mut self, seconds: u64) -> Self {
        self.config.token_lifetime = seconds;
        self
    }

    pub fn secure_cookie(mut self, secure: bool) -> Self {
        self.config.secure_cookie = secure;
        self
    }

    pub fn exempt_path(mut self, path: impl Into<String>) -> Self {
        self.config.exempt_paths.insert(path.into());
        self
    }

    pub fn exempt_paths(mut self, paths: impl IntoIterator<Item = String>) -> Self {
        self.config.exempt_paths.extend(paths);
        self
    }

    pub fn store(mut self, store: Arc<dyn CsrfTokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> CsrfGuard {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryCsrfStore::new()));
        CsrfGuard::with_store(self.config, store)
    }
}

impl Default for CsrfGuardBuilder {
    fn default() -> Self {
        Self::new()
    }
}
