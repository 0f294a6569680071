//! Append-only audit trail
//!
//! Records security-relevant events: logins, permission denials,
//! administrative changes. Entries are never mutated after being written;
//! retention is managed by pruning whole time ranges.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::AuthResult;

/// A single audit event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Stamped by the log at write time
    pub timestamp: DateTime<Utc>,
    /// The acting user, when one is known
    pub user_id: Option<String>,
    /// What happened, e.g. "login" or "access_denied"
    pub action: String,
    /// What it happened to, e.g. a path or an entity id
    pub resource: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    /// Whether the action succeeded
    pub success: bool,
    /// Free-form context, e.g. the denial reason
    pub details: Option<String>,
}

impl AuditEntry {
    /// Create a successful entry for an action on a resource
    pub fn new(action: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            user_id: None,
            action: action.into(),
            resource: resource.into(),
            ip_address: None,
            user_agent: None,
            success: true,
            details: None,
        }
    }

    /// Attribute the entry to a user
    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Record the client address
    pub fn from_ip(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    /// Record the client user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Attach free-form context
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Mark the entry as a failure, with the reason as details
    pub fn denied(mut self, reason: impl Into<String>) -> Self {
        self.success = false;
        self.details = Some(reason.into());
        self
    }
}

/// Conjunctive query filter: an entry matches when every set field matches.
/// The time range is half-open, `from` inclusive and `until` exclusive.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub user_id: Option<String>,
    pub action: Option<String>,
    pub resource: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl AuditFilter {
    /// An empty filter matching every entry
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn for_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn for_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn since(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    /// Whether an entry satisfies every set field
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(user_id) = &self.user_id {
            if entry.user_id.as_deref() != Some(user_id.as_str()) {
                return false;
            }
        }
        if let Some(action) = &self.action {
            if entry.action != *action {
                return false;
            }
        }
        if let Some(resource) = &self.resource {
            if entry.resource != *resource {
                return false;
            }
        }
        if let Some(from) = self.from {
            if entry.timestamp < from {
                return false;
            }
        }
        if let Some(until) = self.until {
            if entry.timestamp >= until {
                return false;
            }
        }
        true
    }
}

/// Storage backend for audit entries.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> AuthResult<()>;
    /// Matching entries in insertion order
    async fn query(&self, filter: &AuditFilter) -> AuthResult<Vec<AuditEntry>>;
    /// Drop entries strictly older than `cutoff`, returning how many
    async fn prune_before(&self, cutoff: DateTime<Utc>) -> AuthResult<usize>;
    async fn len(&self) -> AuthResult<usize>;
}

/// In-memory audit store for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    entries: RwLock<Vec<AuditEntry>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(&self, entry: AuditEntry) -> AuthResult<()> {
        self.entries.write().await.push(entry);
        Ok(())
    }

    async fn query(&self, filter: &AuditFilter) -> AuthResult<Vec<AuditEntry>> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect())
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> AuthResult<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|entry| entry.timestamp >= cutoff);
        Ok(before - entries.len())
    }

    async fn len(&self) -> AuthResult<usize> {
        Ok(self.entries.read().await.len())
    }
}

/// The audit log facade.
///
/// Entries are re-stamped with the write time as they are logged, so stored
/// timestamps reflect when the log saw the event, not when the entry was
/// built.
pub struct AuditLog {
    store: Arc<dyn AuditStore>,
}

impl AuditLog {
    /// Create a log backed by an in-memory store
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryAuditStore::new()))
    }

    /// Create a log backed by an injected store
    pub fn with_store(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Record an entry
    pub async fn log(&self, mut entry: AuditEntry) -> AuthResult<()> {
        entry.timestamp = Utc::now();
        tracing::debug!(
            "Audit: action={} resource={} success={}",
            entry.action,
            entry.resource,
            entry.success
        );
        self.store.append(entry).await
    }

    /// Query entries, in insertion order
    pub async fn get_logs(&self, filter: &AuditFilter) -> AuthResult<Vec<AuditEntry>> {
        self.store.query(filter).await
    }

    /// Drop entries strictly older than `before`, returning how many
    pub async fn cleanup(&self, before: DateTime<Utc>) -> AuthResult<usize> {
        let removed = self.store.prune_before(before).await?;
        if removed > 0 {
            tracing::debug!("Pruned {} audit entries", removed);
        }
        Ok(removed)
    }

    /// Number of stored entries
    pub async fn entry_count(&self) -> AuthResult<usize> {
        self.store.len().await
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}
