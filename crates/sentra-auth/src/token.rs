//! Signed identity tokens and session identifiers
//!
//! Both artifacts are HS256-signed claim sets over the same secret but with
//! deliberately different shapes: identity tokens carry who the caller is,
//! session identifiers carry only an opaque link to a server-side record.
//! Neither verifies as the other.

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::TokenConfig;
use crate::error::AuthError;
use crate::rbac::Role;
use crate::AuthResult;

/// Purpose claim stamped into session identifiers
const SESSION_PURPOSE: &str = "session";

/// An authenticated principal as carried by an identity token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub role: Role,
}

/// Claim set of an identity token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the user id
    pub sub: String,
    /// Email at issuance time
    pub email: String,
    /// Role at issuance time; authorization decisions use this value
    pub role: Role,
    /// Issuer
    pub iss: String,
    /// Issued-at, Unix seconds
    pub iat: i64,
    /// Expiry, Unix seconds
    pub exp: i64,
}

/// Claim set of a session identifier. The `purpose` claim and the absence
/// of identity fields keep these from ever verifying as identity tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    purpose: String,
    /// Random per-identifier id; two identifiers for one user never collide
    jti: String,
    iss: String,
    iat: i64,
    exp: i64,
}

/// Issues and verifies signed tokens.
pub struct TokenService {
    config: TokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    /// Create a service from configuration.
    ///
    /// Fails if the signing secret is shorter than 32 characters.
    pub fn new(config: TokenConfig) -> AuthResult<Self> {
        if config.secret.len() < 32 {
            return Err(AuthError::config_error(
                "Token signing secret must be at least 32 characters long",
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            config,
        })
    }

    /// Name of the cookie that may carry an identity token
    pub fn cookie_name(&self) -> &str {
        &self.config.cookie_name
    }

    /// Issue an identity token for a principal
    pub fn generate_token(&self, identity: &Identity) -> AuthResult<String> {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            sub: identity.user_id.clone(),
            email: identity.email.clone(),
            role: identity.role,
            iss: self.config.issuer.clone(),
            iat: now,
            exp: now + self.config.expiry as i64,
        };
        encode(&Header::default(), &claims, &self.encoding_key).map_err(AuthError::from)
    }

    /// Verify an identity token.
    ///
    /// Returns the embedded identity, or `None` for anything unverifiable:
    /// bad signature, expiry, wrong issuer, or a claim shape that is not an
    /// identity token.
    pub fn verify_token(&self, token: &str) -> Option<Identity> {
        match self.decode_claims(token) {
            Ok(claims) => Some(Identity {
                user_id: claims.sub,
                email: claims.email,
                role: claims.role,
            }),
            Err(err) => {
                tracing::debug!("Rejected identity token: {}", err);
                None
            }
        }
    }

    /// Verify an identity token, reporting why it was rejected
    pub fn decode_claims(&self, token: &str) -> AuthResult<TokenClaims> {
        decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::token_error("Token has expired"),
                ErrorKind::InvalidSignature => {
                    AuthError::token_error("Token signature is invalid")
                }
                ErrorKind::InvalidIssuer => {
                    AuthError::token_error("Token issuer is not recognized")
                }
                _ => AuthError::token_error(format!("Token is malformed: {}", err)),
            })
    }

    /// Issue a signed session identifier for a user.
    ///
    /// Identifiers are unique even when issued within the same second.
    pub fn generate_session_id(&self, user_id: &str) -> AuthResult<String> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: user_id.to_string(),
            purpose: SESSION_PURPOSE.to_string(),
            jti: Uuid::new_v4().to_string(),
            iss: self.config.issuer.clone(),
            iat: now,
            exp: now + self.config.expiry as i64,
        };
        encode(&Header::default(), &claims, &self.encoding_key).map_err(AuthError::from)
    }

    /// Verify a session identifier, returning the user id it was issued to
    pub fn verify_session_id(&self, session_id: &str) -> Option<String> {
        match decode::<SessionClaims>(session_id, &self.decoding_key, &self.validation) {
            Ok(data) if data.claims.purpose == SESSION_PURPOSE => Some(data.claims.sub),
            Ok(_) => {
                tracing::debug!("Rejected session identifier: wrong purpose claim");
                None
            }
            Err(err) => {
                tracing::debug!("Rejected session identifier: {}", err);
                None
            }
        }
    }

    /// Extract a bearer token from an `Authorization` header value
    pub fn extract_bearer_token(header: Option<&str>) -> Option<&str> {
        let token = header?.trim().strip_prefix("Bearer ")?.trim();
        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    }
}
