//! # sentra-security
//!
//! Request-surface security for the sentra platform.
//!
//! This crate covers the untrusted edge of the system: anti-forgery tokens
//! for state-changing requests, sanitization of user-supplied strings,
//! format validation, and display-side masking of personal data.
//!
//! ## Features
//!
//! - **CSRF protection**: per-session, expiring anti-forgery tokens
//! - **Sanitization**: HTML entity escaping and script/markup stripping
//! - **Validation**: strict email, URL, and file name predicates
//! - **Masking**: irreversible partial redaction of PII for display

pub mod config;
pub mod csrf;
pub mod masking;
pub mod sanitize;
pub mod validate;

pub use config::CsrfConfig;
pub use csrf::{CsrfEntry, CsrfGuard, CsrfGuardBuilder, CsrfTokenStore, MemoryCsrfStore};

/// Common result type for security operations
pub type SecurityResult<T> = Result<T, SecurityError>;

/// Security-related errors
#[derive(thiserror::Error, Debug)]
pub enum SecurityError {
    /// The request carried no valid anti-forgery token
    #[error("CSRF token validation failed")]
    CsrfValidationFailed,

    /// The token store failed
    #[error("Security storage error: {message}")]
    StorageError { message: String },
}

/// Security system version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
