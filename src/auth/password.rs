//! Password hashing and verification using Argon2id

use crate::{auth::AuthError, config::SecurityConfig};
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use std::collections::{HashMap, HashSet};

const REPLACE_CHARS: &str = "!@$&*";
const SEP_CHARS: &str = "_-., ";
const OTHER_SPECIAL_CHARS: &str = "\"#%'()+/:;<=>?[\\]^{|}~";
const LOWER_CHARS: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPER_CHARS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGIT_CHARS: &str = "0123456789";

/// Runs of more than two characters from these sequences only count twice.
const COMMON_SEQUENCES: &[&str] = &[
    "0123456789",
    "qwertyuiop",
    "asdfghjkl",
    "zxcvbnm",
    "abcdefghijklmnopqrstuvwxyz",
];

/// Hashing cost and password policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    /// Plaintexts longer than this many bytes are refused, never truncated
    pub max_password_bytes: usize,
    /// Entropy gate: assumed minimum length
    pub min_length: u32,
    /// Entropy gate: assumed alphabet size
    pub alphabet_size: u32,
}

impl PasswordConfig {
    pub fn from_security(security: &SecurityConfig) -> Self {
        Self {
            memory_kib: security.argon2_memory_kib,
            iterations: security.argon2_iterations,
            parallelism: security.argon2_parallelism,
            max_password_bytes: security.max_password_bytes,
            min_length: security.min_password_length,
            alphabet_size: security.password_alphabet_size,
        }
    }

    /// Minimum accepted entropy in bits: log2(alphabet_size ^ min_length)
    pub fn min_entropy_bits(&self) -> f64 {
        f64::from(self.min_length) * f64::from(self.alphabet_size).log2()
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        // OWASP recommended parameters: m=64MiB, t=3 iterations, p=4 lanes
        Self {
            memory_kib: 65536,
            iterations: 3,
            parallelism: 4,
            max_password_bytes: 72,
            min_length: 12,
            alphabet_size: 89,
        }
    }
}

/// Password hasher with configurable parameters
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    config: PasswordConfig,
}

impl PasswordHasher {
    pub fn new(config: PasswordConfig) -> Result<Self, AuthError> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| AuthError::Hashing(format!("invalid Argon2 parameters: {}", e)))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        Ok(Self { argon2, config })
    }

    pub fn config(&self) -> &PasswordConfig {
        &self.config
    }

    /// Hash a password
    pub fn create_hash(&self, password: &str) -> Result<String, AuthError> {
        if password.len() > self.config.max_password_bytes {
            return Err(AuthError::InputTooLong);
        }

        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| match e {
                password_hash::Error::Password => AuthError::InputTooLong,
                e => {
                    tracing::error!("Failed to hash password: {:?}", e);
                    AuthError::Hashing(e.to_string())
                }
            })?
            .to_string();

        Ok(password_hash)
    }

    /// Check a password against a stored hash. Malformed hashes never match.
    pub fn is_valid(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!("Failed to parse password hash: {:?}", e);
                return false;
            }
        };

        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Entropy gate, run by callers before `create_hash`
    pub fn check_entropy(&self, password: &str) -> Result<(), AuthError> {
        if estimate_entropy(password) < self.config.min_entropy_bits() {
            return Err(AuthError::WeakPassword);
        }
        Ok(())
    }
}

/// Estimated entropy in bits: effective length times log2 of the alphabet in use.
pub fn estimate_entropy(password: &str) -> f64 {
    let base = alphabet_base(password);
    if base == 0 {
        return 0.0;
    }
    effective_length(password) as f64 * f64::from(base).log2()
}

fn alphabet_base(password: &str) -> u32 {
    let mut classes = [false; 6];
    let mut other = HashSet::new();

    for c in password.chars() {
        if REPLACE_CHARS.contains(c) {
            classes[0] = true;
        } else if SEP_CHARS.contains(c) {
            classes[1] = true;
        } else if OTHER_SPECIAL_CHARS.contains(c) {
            classes[2] = true;
        } else if LOWER_CHARS.contains(c) {
            classes[3] = true;
        } else if UPPER_CHARS.contains(c) {
            classes[4] = true;
        } else if DIGIT_CHARS.contains(c) {
            classes[5] = true;
        } else {
            other.insert(c);
        }
    }

    let sizes = [
        REPLACE_CHARS.len(),
        SEP_CHARS.len(),
        OTHER_SPECIAL_CHARS.len(),
        LOWER_CHARS.len(),
        UPPER_CHARS.len(),
        DIGIT_CHARS.len(),
    ];

    let base: usize = classes
        .iter()
        .zip(sizes)
        .filter(|(present, _)| **present)
        .map(|(_, size)| size)
        .sum();

    (base + other.len()) as u32
}

fn effective_length(password: &str) -> usize {
    let trimmed = COMMON_SEQUENCES
        .iter()
        .fold(password.to_string(), |acc, seq| trim_sequence_runs(&acc, seq));

    let mut counts: HashMap<char, usize> = HashMap::new();
    for c in trimmed.chars() {
        let count = counts.entry(c).or_insert(0);
        if *count < 2 {
            *count += 1;
        }
    }
    counts.values().sum()
}

/// Keep at most two characters of any ascending run taken from `seq` (case-insensitive).
fn trim_sequence_runs(password: &str, seq: &str) -> String {
    let seq: Vec<char> = seq.chars().collect();
    let position = |c: char| seq.iter().position(|s| *s == c.to_ascii_lowercase());

    let mut out = String::with_capacity(password.len());
    let mut run = 0usize;
    let mut prev: Option<usize> = None;

    for c in password.chars() {
        let pos = position(c);
        run = match (prev, pos) {
            (Some(p), Some(q)) if q == p + 1 => run + 1,
            (_, Some(_)) => 1,
            _ => 0,
        };
        prev = pos;

        if run <= 2 {
            out.push(c);
        }
    }
    out
}
