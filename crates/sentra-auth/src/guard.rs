//! Request authorization guard
//!
//! A guard is an ordered chain of steps run in front of a protected
//! handler. The first step authenticates the caller from request
//! credentials; later steps check permissions or roles against the
//! authenticated identity. The chain short-circuits on the first failing
//! step, and every denial is written to the audit log before the error is
//! returned.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::audit::{AuditEntry, AuditLog};
use crate::error::AuthError;
use crate::rbac::{Permission, Role};
use crate::token::{Identity, TokenService};
use crate::AuthResult;

/// An account as seen by the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
}

/// Lookup interface to the account backing store.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn lookup_user(&self, user_id: &str) -> AuthResult<Option<DirectoryUser>>;
}

/// In-memory directory for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    users: RwLock<HashMap<String, DirectoryUser>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user: DirectoryUser) {
        self.users.write().await.insert(user.id.clone(), user);
    }

    pub async fn remove(&self, user_id: &str) {
        self.users.write().await.remove(user_id);
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn lookup_user(&self, user_id: &str) -> AuthResult<Option<DirectoryUser>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }
}

/// Per-request state threaded through the guard chain.
///
/// Request surface fields are public; the authenticated identity and user
/// record are set only by the authentication step and read through
/// accessors.
#[derive(Debug, Clone)]
pub struct GuardContext {
    /// Request path, used as the audit resource
    pub path: String,
    /// Raw `Authorization` header value, if any
    pub authorization: Option<String>,
    /// Raw `Cookie` header value, if any
    pub cookie: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    identity: Option<Identity>,
    user: Option<DirectoryUser>,
}

impl GuardContext {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            authorization: None,
            cookie: None,
            ip_address: None,
            user_agent: None,
            identity: None,
            user: None,
        }
    }

    pub fn with_authorization(mut self, header: impl Into<String>) -> Self {
        self.authorization = Some(header.into());
        self
    }

    pub fn with_cookie(mut self, header: impl Into<String>) -> Self {
        self.cookie = Some(header.into());
        self
    }

    pub fn with_client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }

    /// The authenticated identity, once authentication has run
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// The directory record of the authenticated user
    pub fn user(&self) -> Option<&DirectoryUser> {
        self.user.as_ref()
    }

    fn require_identity(&self) -> AuthResult<&Identity> {
        self.identity.as_ref().ok_or_else(|| {
            AuthError::authentication_required("No authenticated identity in request context")
        })
    }
}

/// One link in a guard chain.
#[async_trait]
pub trait GuardStep: Send + Sync {
    /// Step name as it appears in audit details
    fn name(&self) -> &'static str;

    /// Run the check, passing the context through on success
    async fn apply(&self, ctx: GuardContext) -> AuthResult<GuardContext>;
}

/// Authenticates the caller from the bearer header or the token cookie.
///
/// The token's embedded role is the authority for later authorization
/// steps; the directory is consulted only for existence and active status.
pub struct AuthenticateStep {
    tokens: Arc<TokenService>,
    directory: Arc<dyn UserDirectory>,
}

impl AuthenticateStep {
    pub fn new(tokens: Arc<TokenService>, directory: Arc<dyn UserDirectory>) -> Self {
        Self { tokens, directory }
    }

    fn extract_cookie_token(&self, cookie_header: Option<&str>) -> Option<String> {
        let cookies = cookie_header?;
        let name = self.tokens.cookie_name();
        for cookie in cookies.split(';') {
            let cookie = cookie.trim();
            if let Some((key, value)) = cookie.split_once('=') {
                if key == name && !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
        None
    }
}

#[async_trait]
impl GuardStep for AuthenticateStep {
    fn name(&self) -> &'static str {
        "authenticate"
    }

    async fn apply(&self, mut ctx: GuardContext) -> AuthResult<GuardContext> {
        let token = match TokenService::extract_bearer_token(ctx.authorization.as_deref()) {
            Some(token) => token.to_string(),
            None => match self.extract_cookie_token(ctx.cookie.as_deref()) {
                Some(token) => token,
                None => {
                    return Err(AuthError::authentication_required(
                        "Missing authentication token",
                    ))
                }
            },
        };

        let identity = match self.tokens.verify_token(&token) {
            Some(identity) => identity,
            None => return Err(AuthError::token_error("Invalid or expired token")),
        };

        let user = match self.directory.lookup_user(&identity.user_id).await? {
            Some(user) => user,
            None => return Err(AuthError::UserNotFound),
        };

        if !user.is_active {
            return Err(AuthError::AccountInactive);
        }

        ctx.identity = Some(identity);
        ctx.user = Some(user);
        Ok(ctx)
    }
}

/// Requires a single permission.
pub struct RequirePermission {
    permission: Permission,
}

impl RequirePermission {
    pub fn new(permission: Permission) -> Self {
        Self { permission }
    }
}

#[async_trait]
impl GuardStep for RequirePermission {
    fn name(&self) -> &'static str {
        "require_permission"
    }

    async fn apply(&self, ctx: GuardContext) -> AuthResult<GuardContext> {
        let role = ctx.require_identity()?.role;
        if !role.has_permission(self.permission) {
            return Err(AuthError::access_denied(format!(
                "Missing required permission: {}",
                self.permission
            )));
        }
        Ok(ctx)
    }
}

/// Requires at least one of a set of permissions.
pub struct RequireAnyPermission {
    permissions: Vec<Permission>,
}

impl RequireAnyPermission {
    pub fn new(permissions: Vec<Permission>) -> Self {
        Self { permissions }
    }
}

#[async_trait]
impl GuardStep for RequireAnyPermission {
    fn name(&self) -> &'static str {
        "require_any_permission"
    }

    async fn apply(&self, ctx: GuardContext) -> AuthResult<GuardContext> {
        let role = ctx.require_identity()?.role;
        if !role.has_any_permission(&self.permissions) {
            return Err(AuthError::access_denied(format!(
                "Missing all of the permissions: {}",
                join_permissions(&self.permissions)
            )));
        }
        Ok(ctx)
    }
}

/// Requires every one of a set of permissions.
pub struct RequireAllPermissions {
    permissions: Vec<Permission>,
}

impl RequireAllPermissions {
    pub fn new(permissions: Vec<Permission>) -> Self {
        Self { permissions }
    }
}

#[async_trait]
impl GuardStep for RequireAllPermissions {
    fn name(&self) -> &'static str {
        "require_all_permissions"
    }

    async fn apply(&self, ctx: GuardContext) -> AuthResult<GuardContext> {
        let role = ctx.require_identity()?.role;
        if !role.has_all_permissions(&self.permissions) {
            return Err(AuthError::access_denied(format!(
                "Missing one of the permissions: {}",
                join_permissions(&self.permissions)
            )));
        }
        Ok(ctx)
    }
}

/// Requires the caller's role to be in an allow list.
pub struct RequireRole {
    roles: Vec<Role>,
}

impl RequireRole {
    pub fn new(roles: Vec<Role>) -> Self {
        Self { roles }
    }
}

#[async_trait]
impl GuardStep for RequireRole {
    fn name(&self) -> &'static str {
        "require_role"
    }

    async fn apply(&self, ctx: GuardContext) -> AuthResult<GuardContext> {
        let role = ctx.require_identity()?.role;
        if !self.roles.contains(&role) {
            return Err(AuthError::access_denied(format!(
                "Role {} is not permitted for this resource",
                role
            )));
        }
        Ok(ctx)
    }
}

fn join_permissions(permissions: &[Permission]) -> String {
    permissions
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// An ordered chain of guard steps in front of a handler.
pub struct RequestGuard {
    steps: Vec<Box<dyn GuardStep>>,
    audit: Arc<AuditLog>,
}

impl RequestGuard {
    /// Start a chain with the standard authentication step
    pub fn with_auth(
        tokens: Arc<TokenService>,
        directory: Arc<dyn UserDirectory>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            steps: vec![Box::new(AuthenticateStep::new(tokens, directory))],
            audit,
        }
    }

    /// Start an empty chain; useful when composing custom steps
    pub fn bare(audit: Arc<AuditLog>) -> Self {
        Self {
            steps: Vec::new(),
            audit,
        }
    }

    pub fn require_permission(mut self, permission: Permission) -> Self {
        self.steps.push(Box::new(RequirePermission::new(permission)));
        self
    }

    pub fn require_any_permission(
        mut self,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Self {
        self.steps.push(Box::new(RequireAnyPermission::new(
            permissions.into_iter().collect(),
        )));
        self
    }

    pub fn require_all_permissions(
        mut self,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Self {
        self.steps.push(Box::new(RequireAllPermissions::new(
            permissions.into_iter().collect(),
        )));
        self
    }

    pub fn require_role(self, role: Role) -> Self {
        self.require_any_role([role])
    }

    pub fn require_any_role(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.steps
            .push(Box::new(RequireRole::new(roles.into_iter().collect())));
        self
    }

    /// Append a custom step
    pub fn step(mut self, step: Box<dyn GuardStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Step names in execution order
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Run the chain over a request context.
    ///
    /// Steps run in order; the first failure is written to the audit log
    /// and returned. A failed audit write is logged but never masks the
    /// original denial.
    pub async fn authorize(&self, ctx: GuardContext) -> AuthResult<GuardContext> {
        let path = ctx.path.clone();
        let ip_address = ctx.ip_address.clone();
        let user_agent = ctx.user_agent.clone();

        let mut ctx = ctx;
        for step in &self.steps {
            let user_id = ctx.identity().map(|identity| identity.user_id.clone());
            ctx = match step.apply(ctx).await {
                Ok(ctx) => ctx,
                Err(err) => {
                    tracing::warn!("Request to {} denied at {}: {}", path, step.name(), err);

                    let mut entry = AuditEntry::new("access_denied", path)
                        .denied(format!("{}: {}", step.name(), err));
                    if let Some(user_id) = user_id {
                        entry = entry.for_user(user_id);
                    }
                    if let Some(ip_address) = ip_address {
                        entry = entry.from_ip(ip_address);
                    }
                    if let Some(user_agent) = user_agent {
                        entry = entry.with_user_agent(user_agent);
                    }
                    if let Err(log_err) = self.audit.log(entry).await {
                        tracing::error!("Failed to write audit entry for denial: {}", log_err);
                    }

                    return Err(err);
                }
            };
        }

        tracing::debug!("Request to {} passed {} guard steps", path, self.steps.len());
        Ok(ctx)
    }

    /// Authorize the context, then hand it to the handler.
    ///
    /// The handler runs only when every step passes.
    pub async fn run<H, Fut, T>(&self, ctx: GuardContext, handler: H) -> AuthResult<T>
    where
        H: FnOnce(GuardContext) -> Fut + Send,
        Fut: Future<Output = AuthResult<T>> + Send,
        T: Send,
    {
        let ctx = self.authorize(ctx).await?;
        handler(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditFilter;
    use crate::config::TokenConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TestBed {
        tokens: Arc<TokenService>,
        directory: Arc<MemoryUserDirectory>,
        audit: Arc<AuditLog>,
    }

    impl TestBed {
        fn guard(&self) -> RequestGuard {
            RequestGuard::with_auth(
                self.tokens.clone(),
                self.directory.clone(),
                self.audit.clone(),
            )
        }

        fn token_for(&self, user_id: &str, email: &str, role: Role) -> String {
            let identity = Identity {
                user_id: user_id.to_string(),
                email: email.to_string(),
                role,
            };
            self.tokens.generate_token(&identity).unwrap()
        }
    }

    async fn test_bed() -> TestBed {
        let config = TokenConfig {
            secret: "test-secret-key-that-is-long-enough-for-hs256".to_string(),
            ..TokenConfig::default()
        };
        let tokens = Arc::new(TokenService::new(config).unwrap());
        let directory = Arc::new(MemoryUserDirectory::new());

        directory
            .insert(DirectoryUser {
                id: "alice".to_string(),
                email: "alice@example.com".to_string(),
                name: "Alice".to_string(),
                role: Role::Admin,
                is_active: true,
            })
            .await;
        directory
            .insert(DirectoryUser {
                id: "bob".to_string(),
                email: "bob@example.com".to_string(),
                name: "Bob".to_string(),
                role: Role::Viewer,
                is_active: true,
            })
            .await;
        directory
            .insert(DirectoryUser {
                id: "carol".to_string(),
                email: "carol@example.com".to_string(),
                name: "Carol".to_string(),
                role: Role::Editor,
                is_active: false,
            })
            .await;

        TestBed {
            tokens,
            directory,
            audit: Arc::new(AuditLog::new()),
        }
    }

    #[tokio::test]
    async fn test_authorized_request_passes() {
        let bed = test_bed().await;
        let guard = bed.guard().require_permission(Permission::ProductDelete);
        let token = bed.token_for("alice", "alice@example.com", Role::Admin);

        let ctx = GuardContext::new("/admin/products/1")
            .with_authorization(format!("Bearer {}", token));
        let ctx = guard.authorize(ctx).await.unwrap();

        assert_eq!(ctx.identity().unwrap().user_id, "alice");
        assert_eq!(ctx.user().unwrap().name, "Alice");
        assert_eq!(bed.audit.entry_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_credentials_are_required() {
        let bed = test_bed().await;
        let guard = bed.guard();

        let err = guard
            .authorize(GuardContext::new("/admin/products"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "AUTHENTICATION_REQUIRED");
        assert_eq!(err.status_code(), 401);
    }

    #[tokio::test]
    async fn test_invalid_token_is_rejected() {
        let bed = test_bed().await;
        let guard = bed.guard();

        let ctx = GuardContext::new("/admin/products")
            .with_authorization("Bearer not-a-real-token");
        let err = guard.authorize(ctx).await.unwrap_err();
        assert_eq!(err.error_code(), "TOKEN_ERROR");
        assert_eq!(err.status_code(), 401);
    }

    #[tokio::test]
    async fn test_unknown_user_is_rejected() {
        let bed = test_bed().await;
        let guard = bed.guard();
        let token = bed.token_for("mallory", "mallory@example.com", Role::Admin);

        let ctx =
            GuardContext::new("/admin/products").with_authorization(format!("Bearer {}", token));
        let err = guard.authorize(ctx).await.unwrap_err();
        assert_eq!(err, AuthError::UserNotFound);
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_inactive_user_is_rejected() {
        let bed = test_bed().await;
        let guard = bed.guard();
        let token = bed.token_for("carol", "carol@example.com", Role::Editor);

        let ctx =
            GuardContext::new("/admin/content").with_authorization(format!("Bearer {}", token));
        let err = guard.authorize(ctx).await.unwrap_err();
        assert_eq!(err, AuthError::AccountInactive);
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_missing_permission_is_denied_and_audited() {
        let bed = test_bed().await;
        let guard = bed.guard().require_permission(Permission::ProductDelete);
        let token = bed.token_for("bob", "bob@example.com", Role::Viewer);

        let ctx = GuardContext::new("/admin/products/1")
            .with_authorization(format!("Bearer {}", token))
            .with_client(Some("203.0.113.9".to_string()), Some("test-agent".to_string()));
        let err = guard.authorize(ctx).await.unwrap_err();
        assert_eq!(err.error_code(), "ACCESS_DENIED");
        assert_eq!(err.status_code(), 403);

        let entries = bed
            .audit
            .get_logs(&AuditFilter::new().for_action("access_denied"))
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.resource, "/admin/products/1");
        // The permission step ran after authentication, so the actor is known
        assert_eq!(entry.user_id.as_deref(), Some("bob"));
        assert_eq!(entry.ip_address.as_deref(), Some("203.0.113.9"));
        assert!(!entry.success);
        assert!(entry
            .details
            .as_deref()
            .unwrap()
            .contains("product:delete"));
    }

    #[tokio::test]
    async fn test_authentication_failures_are_audited_without_user() {
        let bed = test_bed().await;
        let guard = bed.guard();

        let _ = guard
            .authorize(GuardContext::new("/admin/products"))
            .await
            .unwrap_err();

        let entries = bed.audit.get_logs(&AuditFilter::new()).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user_id, None);
        assert_eq!(entries[0].resource, "/admin/products");
    }

    #[tokio::test]
    async fn test_token_role_is_the_authority() {
        // The directory says admin, but the token was minted as viewer;
        // authorization follows the token
        let bed = test_bed().await;
        let guard = bed.guard().require_permission(Permission::UserManage);
        let token = bed.token_for("alice", "alice@example.com", Role::Viewer);

        let ctx =
            GuardContext::new("/admin/users").with_authorization(format!("Bearer {}", token));
        let err = guard.authorize(ctx).await.unwrap_err();
        assert_eq!(err.error_code(), "ACCESS_DENIED");
    }

    #[tokio::test]
    async fn test_cookie_token_is_accepted() {
        let bed = test_bed().await;
        let guard = bed.guard();
        let token = bed.token_for("alice", "alice@example.com", Role::Admin);

        let ctx = GuardContext::new("/admin")
            .with_cookie(format!("theme=dark; sentra_token={}", token));
        let ctx = guard.authorize(ctx).await.unwrap();
        assert_eq!(ctx.identity().unwrap().user_id, "alice");
    }

    #[tokio::test]
    async fn test_bearer_header_takes_precedence_over_cookie() {
        let bed = test_bed().await;
        let guard = bed.guard();
        let admin_token = bed.token_for("alice", "alice@example.com", Role::Admin);
        let viewer_token = bed.token_for("bob", "bob@example.com", Role::Viewer);

        let ctx = GuardContext::new("/admin")
            .with_authorization(format!("Bearer {}", admin_token))
            .with_cookie(format!("sentra_token={}", viewer_token));
        let ctx = guard.authorize(ctx).await.unwrap();
        assert_eq!(ctx.identity().unwrap().user_id, "alice");
    }

    #[tokio::test]
    async fn test_any_permission_chain() {
        let bed = test_bed().await;
        let guard = bed.guard().require_any_permission([
            Permission::InquiryExport,
            Permission::InquiryRead,
        ]);
        let token = bed.token_for("bob", "bob@example.com", Role::Viewer);

        let ctx =
            GuardContext::new("/admin/inquiries").with_authorization(format!("Bearer {}", token));
        assert!(guard.authorize(ctx).await.is_ok());
    }

    #[tokio::test]
    async fn test_all_permissions_chain() {
        let bed = test_bed().await;
        let guard = bed.guard().require_all_permissions([
            Permission::InquiryExport,
            Permission::InquiryRead,
        ]);
        let token = bed.token_for("bob", "bob@example.com", Role::Viewer);

        let ctx =
            GuardContext::new("/admin/inquiries/export").with_authorization(format!("Bearer {}", token));
        let err = guard.authorize(ctx).await.unwrap_err();
        assert_eq!(err.error_code(), "ACCESS_DENIED");
    }

    #[tokio::test]
    async fn test_role_allow_list() {
        let bed = test_bed().await;
        let guard = bed
            .guard()
            .require_any_role([Role::Manager, Role::Admin]);

        let admin_token = bed.token_for("alice", "alice@example.com", Role::Admin);
        let ctx = GuardContext::new("/admin/reports")
            .with_authorization(format!("Bearer {}", admin_token));
        assert!(guard.authorize(ctx).await.is_ok());

        let viewer_token = bed.token_for("bob", "bob@example.com", Role::Viewer);
        let ctx = GuardContext::new("/admin/reports")
            .with_authorization(format!("Bearer {}", viewer_token));
        assert!(guard.authorize(ctx).await.is_err());
    }

    #[tokio::test]
    async fn test_steps_run_in_declared_order() {
        let bed = test_bed().await;
        let guard = bed
            .guard()
            .require_permission(Permission::ProductRead)
            .require_role(Role::Admin);
        assert_eq!(
            guard.step_names(),
            vec!["authenticate", "require_permission", "require_role"]
        );

        // Bob passes the permission step, then fails the role step
        let token = bed.token_for("bob", "bob@example.com", Role::Viewer);
        let ctx =
            GuardContext::new("/admin/catalog").with_authorization(format!("Bearer {}", token));
        let err = guard.authorize(ctx).await.unwrap_err();
        assert!(err.to_string().contains("Role VIEWER"));
    }

    #[tokio::test]
    async fn test_run_invokes_handler_only_on_success() {
        let bed = test_bed().await;
        let guard = bed.guard().require_permission(Permission::ProductRead);
        let calls = Arc::new(AtomicUsize::new(0));

        let token = bed.token_for("bob", "bob@example.com", Role::Viewer);
        let ctx = GuardContext::new("/products").with_authorization(format!("Bearer {}", token));
        let counter = calls.clone();
        let body = guard
            .run(ctx, move |ctx| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(format!("products for {}", ctx.identity().unwrap().user_id))
            })
            .await
            .unwrap();
        assert_eq!(body, "products for bob");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Denied request: the handler must not run
        let counter = calls.clone();
        let result: AuthResult<String> = guard
            .run(GuardContext::new("/products"), move |_ctx| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok("unreachable".to_string())
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bare_chain_with_custom_step() {
        struct PathPrefixStep;

        #[async_trait]
        impl GuardStep for PathPrefixStep {
            fn name(&self) -> &'static str {
                "path_prefix"
            }

            async fn apply(&self, ctx: GuardContext) -> AuthResult<GuardContext> {
                if ctx.path.starts_with("/admin/") {
                    Ok(ctx)
                } else {
                    Err(AuthError::access_denied("Outside the admin area"))
                }
            }
        }

        let bed = test_bed().await;
        let guard = RequestGuard::bare(bed.audit.clone()).step(Box::new(PathPrefixStep));

        assert!(guard
            .authorize(GuardContext::new("/admin/panel"))
            .await
            .is_ok());
        assert!(guard
            .authorize(GuardContext::new("/public"))
            .await
            .is_err());
    }
}
