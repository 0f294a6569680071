//! Security configuration types

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// CSRF protection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrfConfig {
    /// Header name carrying the anti-forgery token
    pub token_header: String,

    /// Cookie name for the double-submit copy of the token
    pub cookie_name: String,

    /// Token lifetime in seconds
    pub token_lifetime: u64,

    /// Whether the token cookie requires HTTPS
    pub secure_cookie: bool,

    /// Paths exempt from CSRF protection. An entry ending in `*` matches
    /// every path with that prefix; any other entry matches exactly.
    pub exempt_paths: HashSet<String>,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            token_header: "X-CSRF-Token".to_string(),
            cookie_name: "_csrf_token".to_string(),
            token_lifetime: 3600, // 1 hour
            secure_cookie: true,
            exempt_paths: HashSet::new(),
        }
    }
}
