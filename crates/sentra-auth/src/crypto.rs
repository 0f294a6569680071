//! Password hashing and cryptographic utilities
//!
//! Password hashes are self-describing strings (algorithm, parameters, and
//! salt embedded), so verification never needs the original configuration.
//! Field-level encryption uses ChaCha20-Poly1305 with a fresh random nonce
//! per call; equal plaintexts therefore never produce equal ciphertexts.

use std::collections::HashMap;

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::{distributions::Alphanumeric, seq::SliceRandom, thread_rng, Rng};
use sha2::{Digest, Sha256};

use crate::config::PasswordConfig;
use crate::error::AuthError;
use crate::AuthResult;

#[cfg(feature = "argon2")]
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Argon2,
};

/// Characters accepted as "special" by the password policy
const SPECIAL_CHARACTERS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

/// ChaCha20-Poly1305 nonce length in bytes
const NONCE_LEN: usize = 12;

/// Password hashing backend.
///
/// Implementations produce self-describing hash strings and verify
/// candidates against them.
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password
    fn hash_password(&self, password: &str) -> AuthResult<String>;

    /// Verify a plaintext password against a stored hash
    fn verify_password(&self, password: &str, hash: &str) -> AuthResult<bool>;

    /// Backend name, e.g. "bcrypt"
    fn hasher_name(&self) -> &'static str;
}

/// Argon2id password hasher
#[cfg(feature = "argon2")]
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    memory_cost: u32,
    time_cost: u32,
    parallelism: u32,
}

#[cfg(feature = "argon2")]
impl Argon2Hasher {
    /// Create a hasher with explicit parameters
    pub fn new(memory_cost: u32, time_cost: u32, parallelism: u32) -> Self {
        Self {
            memory_cost,
            time_cost,
            parallelism,
        }
    }

    /// Production parameters: 64 MiB, 3 iterations, 4 lanes
    pub fn production() -> Self {
        Self::new(65536, 3, 4)
    }

    /// Fast parameters for tests and local development
    pub fn development() -> Self {
        Self::new(1024, 1, 1)
    }

    fn argon2(&self) -> AuthResult<Argon2<'static>> {
        let params = argon2::Params::new(self.memory_cost, self.time_cost, self.parallelism, None)
            .map_err(|e| AuthError::crypto_error(format!("Invalid Argon2 parameters: {}", e)))?;
        Ok(Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            params,
        ))
    }
}

#[cfg(feature = "argon2")]
impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::production()
    }
}

#[cfg(feature = "argon2")]
impl PasswordHasher for Argon2Hasher {
    fn hash_password(&self, password: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::crypto_error(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    fn verify_password(&self, password: &str, hash: &str) -> AuthResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AuthError::crypto_error(format!("Invalid password hash: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    fn hasher_name(&self) -> &'static str {
        "argon2"
    }
}

/// Bcrypt password hasher
#[cfg(feature = "bcrypt")]
#[derive(Debug, Clone)]
pub struct BcryptHasher {
    cost: u32,
}

#[cfg(feature = "bcrypt")]
impl BcryptHasher {
    /// Create a hasher with an explicit work factor
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Production work factor
    pub fn production() -> Self {
        Self::new(12)
    }

    /// Minimum work factor, for tests and local development
    pub fn development() -> Self {
        Self::new(4)
    }
}

#[cfg(feature = "bcrypt")]
impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

#[cfg(feature = "bcrypt")]
impl PasswordHasher for BcryptHasher {
    fn hash_password(&self, password: &str) -> AuthResult<String> {
        bcrypt::hash(password, self.cost)
            .map_err(|e| AuthError::crypto_error(format!("Failed to hash password: {}", e)))
    }

    fn verify_password(&self, password: &str, hash: &str) -> AuthResult<bool> {
        bcrypt::verify(password, hash)
            .map_err(|e| AuthError::crypto_error(format!("Failed to verify password: {}", e)))
    }

    fn hasher_name(&self) -> &'static str {
        "bcrypt"
    }
}

/// Builds password hashers from configuration.
pub struct PasswordHasherFactory;

impl PasswordHasherFactory {
    /// Create a hasher by algorithm name with loosely typed options.
    ///
    /// Recognized options: `cost` for bcrypt; `memory_cost`, `time_cost`,
    /// and `parallelism` for Argon2. Missing options fall back to
    /// production parameters.
    pub fn create_hasher(
        algorithm: &str,
        config: HashMap<String, serde_json::Value>,
    ) -> AuthResult<Box<dyn PasswordHasher>> {
        match algorithm.to_lowercase().as_str() {
            #[cfg(feature = "bcrypt")]
            "bcrypt" => {
                let cost = config
                    .get("cost")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(12) as u32;
                Ok(Box::new(BcryptHasher::new(cost)))
            }
            #[cfg(feature = "argon2")]
            "argon2" => {
                let memory_cost = config
                    .get("memory_cost")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(65536) as u32;
                let time_cost = config
                    .get("time_cost")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(3) as u32;
                let parallelism = config
                    .get("parallelism")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(4) as u32;
                Ok(Box::new(Argon2Hasher::new(memory_cost, time_cost, parallelism)))
            }
            _ => Err(AuthError::config_error(format!(
                "Unsupported hashing algorithm: {}",
                algorithm
            ))),
        }
    }

    /// Create the hasher described by a password policy
    pub fn from_config(config: &PasswordConfig) -> AuthResult<Box<dyn PasswordHasher>> {
        match config.hash_algorithm.as_str() {
            #[cfg(feature = "bcrypt")]
            "bcrypt" => Ok(Box::new(BcryptHasher::new(config.bcrypt_cost))),
            #[cfg(feature = "argon2")]
            "argon2" => Ok(Box::new(Argon2Hasher::new(
                config.argon2_memory,
                config.argon2_iterations,
                config.argon2_parallelism,
            ))),
            other => Err(AuthError::config_error(format!(
                "Unsupported hashing algorithm: {}",
                other
            ))),
        }
    }

    /// The default hasher when no configuration is supplied
    pub fn default_hasher() -> Box<dyn PasswordHasher> {
        #[cfg(feature = "bcrypt")]
        {
            Box::new(BcryptHasher::production())
        }
        #[cfg(all(feature = "argon2", not(feature = "bcrypt")))]
        {
            Box::new(Argon2Hasher::production())
        }
        #[cfg(not(any(feature = "argon2", feature = "bcrypt")))]
        {
            panic!("No password hashing feature enabled; enable 'bcrypt' or 'argon2'")
        }
    }
}

/// Stateless cryptographic helpers.
pub struct CryptoUtils;

impl CryptoUtils {
    /// Generate a 32-byte random key, hex-encoded (64 characters)
    pub fn generate_key() -> String {
        let bytes: [u8; 32] = thread_rng().gen();
        hex::encode(bytes)
    }

    /// Generate a random alphanumeric string
    pub fn generate_random_string(length: usize) -> String {
        thread_rng()
            .sample_iter(&Alphanumeric)
            .take(length)
            .map(char::from)
            .collect()
    }

    /// Generate a random password that satisfies the default policy.
    ///
    /// One character from each required class is always present; lengths
    /// below the default policy minimum are raised to it.
    pub fn generate_secure_password(length: usize) -> String {
        const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
        const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
        const DIGITS: &[u8] = b"0123456789";

        let length = length.max(PasswordConfig::default().min_length);
        let special = SPECIAL_CHARACTERS.as_bytes();
        let mut rng = thread_rng();

        let mut chars: Vec<u8> = vec![
            UPPERCASE[rng.gen_range(0..UPPERCASE.len())],
            LOWERCASE[rng.gen_range(0..LOWERCASE.len())],
            DIGITS[rng.gen_range(0..DIGITS.len())],
            special[rng.gen_range(0..special.len())],
        ];

        let pool: Vec<u8> = [UPPERCASE, LOWERCASE, DIGITS, special].concat();
        while chars.len() < length {
            chars.push(pool[rng.gen_range(0..pool.len())]);
        }
        chars.shuffle(&mut rng);

        String::from_utf8(chars).unwrap_or_default()
    }

    /// Check a password against a policy, collecting every violated rule.
    ///
    /// All rules are evaluated; the error lists each violation so callers
    /// can surface the complete picture in one pass.
    pub fn validate_password_strength(
        password: &str,
        policy: &PasswordConfig,
    ) -> AuthResult<()> {
        let mut violations = Vec::new();
        let length = password.chars().count();

        if length < policy.min_length {
            violations.push(format!(
                "Password must be at least {} characters long",
                policy.min_length
            ));
        }

        if length > policy.max_length {
            violations.push(format!(
                "Password must be at most {} characters long",
                policy.max_length
            ));
        }

        if policy.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            violations.push("Password must contain at least one uppercase letter".to_string());
        }

        if policy.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
            violations.push("Password must contain at least one lowercase letter".to_string());
        }

        if policy.require_numbers && !password.chars().any(|c| c.is_ascii_digit()) {
            violations.push("Password must contain at least one number".to_string());
        }

        if policy.require_special && !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
            violations.push("Password must contain at least one special character".to_string());
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(AuthError::ValidationFailed { violations })
        }
    }

    /// Hash a password with the default hasher
    pub fn hash_password(password: &str) -> AuthResult<String> {
        PasswordHasherFactory::default_hasher().hash_password(password)
    }

    /// Verify a password against a stored hash.
    /// Malformed hashes verify as false rather than erroring.
    pub fn verify_password(password: &str, hash: &str) -> bool {
        PasswordHasherFactory::default_hasher()
            .verify_password(password, hash)
            .unwrap_or(false)
    }

    /// Encrypt a string with ChaCha20-Poly1305.
    ///
    /// `key` is a hex-encoded 32-byte key as produced by [`generate_key`].
    /// The output is hex of `nonce || ciphertext`; the nonce is random per
    /// call.
    ///
    /// [`generate_key`]: CryptoUtils::generate_key
    pub fn encrypt(plaintext: &str, key: &str) -> AuthResult<String> {
        let key_bytes = hex::decode(key)
            .map_err(|_| AuthError::crypto_error("Encryption key must be hex-encoded"))?;
        let cipher = ChaCha20Poly1305::new_from_slice(&key_bytes)
            .map_err(|_| AuthError::crypto_error("Encryption key must be 32 bytes"))?;

        let nonce_bytes: [u8; NONCE_LEN] = thread_rng().gen();
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| AuthError::crypto_error("Encryption failed"))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(hex::encode(out))
    }

    /// Decrypt a string produced by [`encrypt`].
    ///
    /// Any failure (wrong key, truncation, tampering, bad encoding) yields
    /// `None`; no detail about the failure mode is exposed.
    ///
    /// [`encrypt`]: CryptoUtils::encrypt
    pub fn decrypt(ciphertext: &str, key: &str) -> Option<String> {
        let key_bytes = hex::decode(key).ok()?;
        let cipher = ChaCha20Poly1305::new_from_slice(&key_bytes).ok()?;

        let data = hex::decode(ciphertext).ok()?;
        if data.len() < NONCE_LEN {
            return None;
        }
        let (nonce_bytes, payload) = data.split_at(NONCE_LEN);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), payload)
            .ok()?;
        String::from_utf8(plaintext).ok()
    }

    /// Hash a value for storage-side comparison, returning `salt:digest`.
    ///
    /// Unlike [`encrypt`], this is one-way; use [`verify_hashed_data`] to
    /// compare later values.
    ///
    /// [`encrypt`]: CryptoUtils::encrypt
    /// [`verify_hashed_data`]: CryptoUtils::verify_hashed_data
    pub fn hash_sensitive_data(value: &str) -> String {
        let salt_bytes: [u8; 16] = thread_rng().gen();
        let salt = hex::encode(salt_bytes);
        let digest = Self::salted_digest(&salt, value);
        format!("{}:{}", salt, digest)
    }

    /// Verify a value against a `salt:digest` string from
    /// [`hash_sensitive_data`]. Malformed stored values verify as false.
    ///
    /// [`hash_sensitive_data`]: CryptoUtils::hash_sensitive_data
    pub fn verify_hashed_data(value: &str, stored: &str) -> bool {
        match stored.split_once(':') {
            Some((salt, digest)) if !salt.is_empty() => {
                Self::salted_digest(salt, value) == digest
            }
            _ => false,
        }
    }

    fn salted_digest(salt: &str, value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(value.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_key_format() {
        let key = CryptoUtils::generate_key();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(key, CryptoUtils::generate_key());
    }

    #[test]
    fn test_generate_random_string() {
        let s = CryptoUtils::generate_random_string(24);
        assert_eq!(s.len(), 24);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[cfg(feature = "bcrypt")]
    #[test]
    fn test_bcrypt_hash_and_verify() {
        let hasher = BcryptHasher::development();
        let hash = hasher.hash_password("S3cure!pass").unwrap();
        assert!(hash.starts_with("$2"));
        assert!(hasher.verify_password("S3cure!pass", &hash).unwrap());
        assert!(!hasher.verify_password("wrong", &hash).unwrap());
    }

    #[cfg(feature = "bcrypt")]
    #[test]
    fn test_bcrypt_hashes_are_salted() {
        let hasher = BcryptHasher::development();
        let first = hasher.hash_password("same-password").unwrap();
        let second = hasher.hash_password("same-password").unwrap();
        assert_ne!(first, second);
        assert!(hasher.verify_password("same-password", &first).unwrap());
        assert!(hasher.verify_password("same-password", &second).unwrap());
    }

    #[cfg(feature = "argon2")]
    #[test]
    fn test_argon2_hash_and_verify() {
        let hasher = Argon2Hasher::development();
        let hash = hasher.hash_password("S3cure!pass").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify_password("S3cure!pass", &hash).unwrap());
        assert!(!hasher.verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_factory_rejects_unknown_algorithm() {
        let result = PasswordHasherFactory::create_hasher("md5", HashMap::new());
        assert!(result.is_err());
    }

    #[cfg(feature = "bcrypt")]
    #[test]
    fn test_factory_reads_options() {
        let mut options = HashMap::new();
        options.insert("cost".to_string(), serde_json::json!(4));
        let hasher = PasswordHasherFactory::create_hasher("bcrypt", options).unwrap();
        assert_eq!(hasher.hasher_name(), "bcrypt");
        let hash = hasher.hash_password("test-password").unwrap();
        assert!(hasher.verify_password("test-password", &hash).unwrap());
    }

    #[cfg(feature = "bcrypt")]
    #[test]
    fn test_factory_from_config() {
        let mut config = PasswordConfig::default();
        config.hash_algorithm = "bcrypt".to_string();
        config.bcrypt_cost = 4;
        let hasher = PasswordHasherFactory::from_config(&config).unwrap();
        assert_eq!(hasher.hasher_name(), "bcrypt");
    }

    #[cfg(any(feature = "bcrypt", feature = "argon2"))]
    #[test]
    fn test_verify_password_round_trip() {
        let hash = CryptoUtils::hash_password("S3cure!pass").unwrap();
        assert!(CryptoUtils::verify_password("S3cure!pass", &hash));
        assert!(!CryptoUtils::verify_password("wrong", &hash));
    }

    #[cfg(any(feature = "bcrypt", feature = "argon2"))]
    #[test]
    fn test_verify_password_malformed_hash_is_false() {
        // Corrupt or foreign-format stored hashes verify as false, never panic
        assert!(!CryptoUtils::verify_password("secret", "not-a-valid-hash"));
        assert!(!CryptoUtils::verify_password("secret", ""));
        assert!(!CryptoUtils::verify_password("secret", "$argon2id$v=19$m=4096,t=3,p=1"));
    }

    #[test]
    fn test_password_strength_collects_all_violations() {
        let policy = PasswordConfig::default();

        let err = CryptoUtils::validate_password_strength("short", &policy).unwrap_err();
        match err {
            AuthError::ValidationFailed { violations } => {
                assert_eq!(violations.len(), 4);
                assert!(violations.iter().any(|v| v.contains("at least 8 characters")));
                assert!(violations.iter().any(|v| v.contains("uppercase")));
                assert!(violations.iter().any(|v| v.contains("number")));
                assert!(violations.iter().any(|v| v.contains("special")));
            }
            other => panic!("expected ValidationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_password_strength_single_violation() {
        let policy = PasswordConfig::default();

        let err = CryptoUtils::validate_password_strength("alllowercase1!", &policy).unwrap_err();
        match err {
            AuthError::ValidationFailed { violations } => {
                assert_eq!(violations.len(), 1);
                assert!(violations[0].contains("uppercase"));
            }
            other => panic!("expected ValidationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_password_strength_accepts_compliant_password() {
        let policy = PasswordConfig::default();
        assert!(CryptoUtils::validate_password_strength("Str0ng!pass", &policy).is_ok());
    }

    #[test]
    fn test_password_strength_respects_policy_toggles() {
        let mut policy = PasswordConfig::default();
        policy.require_special = false;
        policy.require_uppercase = false;
        assert!(CryptoUtils::validate_password_strength("plainword1", &policy).is_ok());
    }

    #[test]
    fn test_password_strength_rejects_overlong() {
        let policy = PasswordConfig::default();
        let long = format!("Aa1!{}", "x".repeat(140));
        let err = CryptoUtils::validate_password_strength(&long, &policy).unwrap_err();
        match err {
            AuthError::ValidationFailed { violations } => {
                assert_eq!(violations.len(), 1);
                assert!(violations[0].contains("at most 128"));
            }
            other => panic!("expected ValidationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_generated_passwords_satisfy_default_policy() {
        let policy = PasswordConfig::default();
        for length in [8, 12, 16, 32] {
            let password = CryptoUtils::generate_secure_password(length);
            assert_eq!(password.chars().count(), length);
            assert!(CryptoUtils::validate_password_strength(&password, &policy).is_ok());
        }
        // Undersized requests are raised to the policy minimum
        assert_eq!(CryptoUtils::generate_secure_password(2).chars().count(), 8);
    }

    #[test]
    fn test_generated_passwords_do_not_repeat() {
        assert_ne!(
            CryptoUtils::generate_secure_password(16),
            CryptoUtils::generate_secure_password(16)
        );
    }

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let key = CryptoUtils::generate_key();
        for plaintext in ["hello", "", "héllo wörld 世界", "line\nbreaks\tand tabs"] {
            let ciphertext = CryptoUtils::encrypt(plaintext, &key).unwrap();
            assert_eq!(CryptoUtils::decrypt(&ciphertext, &key).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_encrypt_is_randomized() {
        let key = CryptoUtils::generate_key();
        let first = CryptoUtils::encrypt("same input", &key).unwrap();
        let second = CryptoUtils::encrypt("same input", &key).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_decrypt_fails_closed() {
        let key = CryptoUtils::generate_key();
        let other_key = CryptoUtils::generate_key();
        let ciphertext = CryptoUtils::encrypt("secret", &key).unwrap();

        // Wrong key
        assert!(CryptoUtils::decrypt(&ciphertext, &other_key).is_none());
        // Tampered ciphertext
        let mut tampered = ciphertext.clone();
        tampered.pop();
        tampered.push(if ciphertext.ends_with('0') { '1' } else { '0' });
        assert!(CryptoUtils::decrypt(&tampered, &key).is_none());
        // Not hex at all
        assert!(CryptoUtils::decrypt("zz-not-hex", &key).is_none());
        // Too short to hold a nonce
        assert!(CryptoUtils::decrypt("0011", &key).is_none());
    }

    #[test]
    fn test_encrypt_rejects_bad_keys() {
        assert!(CryptoUtils::encrypt("data", "not-hex").is_err());
        assert!(CryptoUtils::encrypt("data", "00ff").is_err());
    }

    #[test]
    fn test_sensitive_data_hashing() {
        let stored = CryptoUtils::hash_sensitive_data("user@example.com");
        let (salt, digest) = stored.split_once(':').unwrap();
        assert_eq!(salt.len(), 32);
        assert_eq!(digest.len(), 64);

        assert!(CryptoUtils::verify_hashed_data("user@example.com", &stored));
        assert!(!CryptoUtils::verify_hashed_data("other@example.com", &stored));
        assert!(!CryptoUtils::verify_hashed_data("user@example.com", "malformed"));
        assert!(!CryptoUtils::verify_hashed_data("user@example.com", ":missing-salt"));
    }

    #[test]
    fn test_sensitive_data_hashes_are_salted() {
        let first = CryptoUtils::hash_sensitive_data("same value");
        let second = CryptoUtils::hash_sensitive_data("same value");
        assert_ne!(first, second);
        assert!(CryptoUtils::verify_hashed_data("same value", &first));
        assert!(CryptoUtils::verify_hashed_data("same value", &second));
    }
}
