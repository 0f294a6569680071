//! Authentication and authorization error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by the authentication and authorization core.
///
/// Every variant maps to a stable machine-readable code and an HTTP status
/// so callers can translate failures uniformly at the edge.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthError {
    /// No usable credential was presented
    #[error("Authentication required: {message}")]
    AuthenticationRequired { message: String },

    /// A credential was presented but failed verification
    #[error("Token error: {message}")]
    TokenError { message: String },

    /// The authenticated principal lacks the required permission or role
    #[error("Access denied: {message}")]
    AccessDenied { message: String },

    /// The account exists but has been deactivated
    #[error("User account is inactive")]
    AccountInactive,

    /// No account matches the authenticated identity
    #[error("User not found")]
    UserNotFound,

    /// No session matches the presented identifier
    #[error("Session not found")]
    SessionNotFound,

    /// Input failed one or more validation rules; all violations are listed
    #[error("Validation failed: {}", violations.join("; "))]
    ValidationFailed { violations: Vec<String> },

    /// Unknown role name
    #[error("Role not found: {role}")]
    RoleNotFound { role: String },

    /// Unknown permission name
    #[error("Permission not found: {permission}")]
    PermissionNotFound { permission: String },

    /// The component was constructed with unusable settings
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// A cryptographic primitive failed
    #[error("Cryptographic error: {message}")]
    CryptographicError { message: String },

    /// The backing store failed
    #[error("Storage error: {message}")]
    StorageError { message: String },

    /// Unclassified internal failure
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AuthError {
    /// Create an authentication-required error
    pub fn authentication_required(message: impl Into<String>) -> Self {
        Self::AuthenticationRequired {
            message: message.into(),
        }
    }

    /// Create a token error
    pub fn token_error(message: impl Into<String>) -> Self {
        Self::TokenError {
            message: message.into(),
        }
    }

    /// Create an access-denied error
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied {
            message: message.into(),
        }
    }

    /// Create a validation error carrying every violated rule
    pub fn validation_failed(violations: Vec<String>) -> Self {
        Self::ValidationFailed { violations }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Create a cryptographic error
    pub fn crypto_error(message: impl Into<String>) -> Self {
        Self::CryptographicError {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage_error(message: impl Into<String>) -> Self {
        Self::StorageError {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AuthenticationRequired { .. } => "AUTHENTICATION_REQUIRED",
            Self::TokenError { .. } => "TOKEN_ERROR",
            Self::AccessDenied { .. } => "ACCESS_DENIED",
            Self::AccountInactive => "ACCOUNT_INACTIVE",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::ValidationFailed { .. } => "VALIDATION_FAILED",
            Self::RoleNotFound { .. } => "ROLE_NOT_FOUND",
            Self::PermissionNotFound { .. } => "PERMISSION_NOT_FOUND",
            Self::ConfigurationError { .. } => "CONFIGURATION_ERROR",
            Self::CryptographicError { .. } => "CRYPTOGRAPHIC_ERROR",
            Self::StorageError { .. } => "STORAGE_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// HTTP status code this error maps to at the edge
    pub fn status_code(&self) -> u16 {
        match self {
            Self::AuthenticationRequired { .. } | Self::TokenError { .. } => 401,
            Self::AccessDenied { .. } | Self::AccountInactive => 403,
            Self::UserNotFound | Self::SessionNotFound => 404,
            Self::ValidationFailed { .. }
            | Self::RoleNotFound { .. }
            | Self::PermissionNotFound { .. } => 400,
            Self::ConfigurationError { .. }
            | Self::CryptographicError { .. }
            | Self::StorageError { .. }
            | Self::Internal { .. } => 500,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::token_error(err.to_string())
    }
}

#[cfg(feature = "argon2")]
impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::crypto_error(format!("Argon2 error: {}", err))
    }
}

#[cfg(feature = "bcrypt")]
impl From<bcrypt::BcryptError> for AuthError {
    fn from(err: bcrypt::BcryptError) -> Self {
        Self::crypto_error(format!("Bcrypt error: {}", err))
    }
}
