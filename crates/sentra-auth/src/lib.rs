//! # sentra-auth
//!
//! Authentication and authorization core for the sentra platform.
//!
//! This crate provides the trust kernel shared by the public site and the
//! back office: signed identity tokens, server-side sessions, a fixed
//! role/permission model, password hashing, and a composable request guard
//! that fronts protected handlers.
//!
//! ## Features
//!
//! - **Identity tokens**: HS256-signed, self-expiring bearer tokens
//! - **Sessions**: server-side session records with idle expiry and sweeping
//! - **RBAC**: four ordered roles over a fixed permission table
//! - **Password hashing**: Argon2 and bcrypt with configurable policies
//! - **Request guards**: ordered authentication/authorization check chains
//! - **Audit trail**: append-only record of security-relevant events

pub mod audit;
pub mod config;
pub mod crypto;
pub mod error;
pub mod guard;
pub mod rbac;
pub mod session;
pub mod token;

// Re-export commonly used types
pub use audit::{AuditEntry, AuditFilter, AuditLog, AuditStore, MemoryAuditStore};
pub use config::{AuthConfig, PasswordConfig, SessionConfig, TokenConfig};
pub use crypto::{CryptoUtils, PasswordHasher, PasswordHasherFactory};
pub use error::AuthError;
pub use guard::{
    DirectoryUser, GuardContext, GuardStep, MemoryUserDirectory, RequestGuard, UserDirectory,
};
pub use rbac::{Permission, Role};
pub use session::{MemorySessionStore, Session, SessionManager, SessionStore};
pub use token::{Identity, TokenClaims, TokenService};

#[cfg(feature = "argon2")]
pub use crypto::Argon2Hasher;

#[cfg(feature = "bcrypt")]
pub use crypto::BcryptHasher;

/// Authentication result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication system version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
