//! Authentication configuration
//!
//! All durations are expressed in seconds. Each section carries serde
//! defaults so partial configuration files deserialize into a complete,
//! working configuration.

use serde::{Deserialize, Serialize};

/// Top-level authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Signed token settings
    #[serde(default)]
    pub token: TokenConfig,

    /// Server-side session settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Password policy and hashing settings
    #[serde(default)]
    pub password: PasswordConfig,
}

/// Signed identity token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Signing secret, at least 32 characters
    #[serde(default = "default_token_secret")]
    pub secret: String,

    /// Issuer claim stamped into and required from every token
    #[serde(default = "default_token_issuer")]
    pub issuer: String,

    /// Token lifetime in seconds
    #[serde(default = "default_token_expiry")]
    pub expiry: u64,

    /// Cookie used when the token travels as a cookie instead of a header
    #[serde(default = "default_token_cookie_name")]
    pub cookie_name: String,
}

/// Server-side session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle lifetime in seconds; a session untouched for longer is expired
    #[serde(default = "default_session_inactivity_ttl")]
    pub inactivity_ttl: u64,

    /// Session cookie name
    #[serde(default = "default_session_cookie_name")]
    pub cookie_name: String,

    /// Optional cookie domain
    #[serde(default)]
    pub cookie_domain: Option<String>,

    /// Cookie path
    #[serde(default = "default_cookie_path")]
    pub cookie_path: String,

    /// Whether the session cookie requires HTTPS
    #[serde(default)]
    pub cookie_secure: bool,

    /// Whether the session cookie is hidden from script access
    #[serde(default = "default_true")]
    pub cookie_http_only: bool,

    /// SameSite attribute: Strict, Lax, or None
    #[serde(default = "default_same_site")]
    pub cookie_same_site: String,

    /// Interval between background expiry sweeps, in seconds
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval: u64,
}

/// Password policy and hashing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordConfig {
    /// Minimum password length
    #[serde(default = "default_password_min_length")]
    pub min_length: usize,

    /// Maximum password length
    #[serde(default = "default_password_max_length")]
    pub max_length: usize,

    /// Require at least one uppercase letter
    #[serde(default = "default_true")]
    pub require_uppercase: bool,

    /// Require at least one lowercase letter
    #[serde(default = "default_true")]
    pub require_lowercase: bool,

    /// Require at least one digit
    #[serde(default = "default_true")]
    pub require_numbers: bool,

    /// Require at least one special character
    #[serde(default = "default_true")]
    pub require_special: bool,

    /// Hashing algorithm: "bcrypt" or "argon2"
    #[serde(default = "default_hash_algorithm")]
    pub hash_algorithm: String,

    /// Bcrypt work factor
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,

    /// Argon2 memory cost in KiB
    #[serde(default = "default_argon2_memory")]
    pub argon2_memory: u32,

    /// Argon2 iteration count
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 lane count
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,
}

fn default_token_secret() -> String {
    "change-me-sentra-development-token-secret-0123456789".to_string()
}

fn default_token_issuer() -> String {
    "sentra".to_string()
}

fn default_token_expiry() -> u64 {
    7 * 24 * 60 * 60 // 7 days
}

fn default_token_cookie_name() -> String {
    "sentra_token".to_string()
}

fn default_session_inactivity_ttl() -> u64 {
    24 * 60 * 60 // 24 hours
}

fn default_session_cookie_name() -> String {
    "sentra_session".to_string()
}

fn default_cookie_path() -> String {
    "/".to_string()
}

fn default_same_site() -> String {
    "Lax".to_string()
}

fn default_cleanup_interval() -> u64 {
    60 * 60 // 1 hour
}

fn default_password_min_length() -> usize {
    8
}

fn default_password_max_length() -> usize {
    128
}

fn default_hash_algorithm() -> String {
    "bcrypt".to_string()
}

fn default_bcrypt_cost() -> u32 {
    12
}

fn default_argon2_memory() -> u32 {
    65536 // 64 MiB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

fn default_true() -> bool {
    true
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token: TokenConfig::default(),
            session: SessionConfig::default(),
            password: PasswordConfig::default(),
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: default_token_secret(),
            issuer: default_token_issuer(),
            expiry: default_token_expiry(),
            cookie_name: default_token_cookie_name(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_ttl: default_session_inactivity_ttl(),
            cookie_name: default_session_cookie_name(),
            cookie_domain: None,
            cookie_path: default_cookie_path(),
            cookie_secure: false,
            cookie_http_only: true,
            cookie_same_site: default_same_site(),
            cleanup_interval: default_cleanup_interval(),
        }
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: default_password_min_length(),
            max_length: default_password_max_length(),
            require_uppercase: true,
            require_lowercase: true,
            require_numbers: true,
            require_special: true,
            hash_algorithm: default_hash_algorithm(),
            bcrypt_cost: default_bcrypt_cost(),
            argon2_memory: default_argon2_memory(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
        }
    }
}

impl AuthConfig {
    /// Development preset: relaxed policy, fast hashing, plain-HTTP cookies
    pub fn development() -> Self {
        let mut config = Self::default();
        config.token.secret = "sentra-development-secret-key-not-for-production".to_string();
        config.session.cookie_secure = false;
        config.password.require_special = false;
        config.password.bcrypt_cost = 4;
        config
    }

    /// Production preset: strict policy and HTTPS-only cookies
    pub fn production() -> Self {
        let mut config = Self::default();
        config.session.cookie_secure = true;
        config.session.cookie_same_site = "Strict".to_string();
        config.password.min_length = 12;
        config.password.require_special = true;
        config
    }

    /// Validate the configuration, returning the first problem found
    pub fn validate(&self) -> Result<(), String> {
        if self.token.secret.len() < 32 {
            return Err("Token secret must be at least 32 characters long".to_string());
        }

        if self.token.issuer.is_empty() {
            return Err("Token issuer must not be empty".to_string());
        }

        if self.token.expiry == 0 {
            return Err("Token expiry must be greater than 0".to_string());
        }

        if self.session.inactivity_ttl == 0 {
            return Err("Session inactivity TTL must be greater than 0".to_string());
        }

        if self.session.cleanup_interval == 0 {
            return Err("Session cleanup interval must be greater than 0".to_string());
        }

        if !matches!(self.session.cookie_same_site.as_str(), "Strict" | "Lax" | "None") {
            return Err(format!(
                "Invalid SameSite value: {}",
                self.session.cookie_same_site
            ));
        }

        if self.password.min_length == 0 {
            return Err("Password minimum length must be greater than 0".to_string());
        }

        if self.password.min_length > self.password.max_length {
            return Err("Password minimum length cannot exceed maximum length".to_string());
        }

        if !matches!(self.password.hash_algorithm.as_str(), "bcrypt" | "argon2") {
            return Err(format!(
                "Unsupported hash algorithm: {}",
                self.password.hash_algorithm
            ));
        }

        if !(4..=31).contains(&self.password.bcrypt_cost) {
            return Err("Bcrypt cost must be between 4 and 31".to_string());
        }

        Ok(())
    }
}
