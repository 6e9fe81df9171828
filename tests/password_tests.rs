//! 密码哈希功能单元测试
//!
//! 测试 Argon2id 密码哈希、验证与熵检查

use unsubtle_core::auth::{password::estimate_entropy, AuthError, PasswordConfig, PasswordHasher};

fn fast_hasher() -> PasswordHasher {
    PasswordHasher::new(PasswordConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
        ..PasswordConfig::default()
    })
    .expect("valid argon2 params")
}

#[test]
fn test_password_hash_and_verify() {
    let hasher = fast_hasher();
    let password = "Syp9393-Syp9292-Syp9191";

    let hash = hasher.create_hash(password).expect("Hashing should succeed");

    // 哈希值应该包含 argon2id 标识
    assert!(hash.starts_with("$argon2id$"));
    assert!(hasher.is_valid(password, &hash));
    assert!(!hasher.is_valid("Syp9393-Syp9292-Syp9190", &hash));
}

#[test]
fn test_password_hash_different_each_time() {
    let hasher = fast_hasher();

    let hash1 = hasher.create_hash("TestPassword123!").unwrap();
    let hash2 = hasher.create_hash("TestPassword123!").unwrap();

    // 由于随机盐，每次生成的哈希应该不同
    assert_ne!(hash1, hash2);
}

#[test]
fn test_hash_from_other_cost_parameters_still_verifies() {
    let strong = PasswordHasher::new(PasswordConfig {
        memory_kib: 2048,
        iterations: 2,
        parallelism: 1,
        ..PasswordConfig::default()
    })
    .unwrap();

    let hash = strong.create_hash("TestPassword123!").unwrap();
    assert!(fast_hasher().is_valid("TestPassword123!", &hash));
}

#[test]
fn test_long_password_is_refused_not_truncated() {
    let hasher = fast_hasher();
    let long = format!("{}{}", "x".repeat(72), "tail");

    assert_eq!(hasher.create_hash(&long), Err(AuthError::InputTooLong));
}

#[test]
fn test_configured_byte_bound() {
    let hasher = PasswordHasher::new(PasswordConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
        max_password_bytes: 16,
        ..PasswordConfig::default()
    })
    .unwrap();

    assert!(hasher.create_hash("sixteen-bytes-ok").is_ok());
    assert_eq!(
        hasher.create_hash("seventeen-bytes!!"),
        Err(AuthError::InputTooLong)
    );
}

#[test]
fn test_entropy_gate() {
    let hasher = fast_hasher();

    assert!(hasher.check_entropy("Syp9393-Syp9292-Syp9191").is_ok());

    for weak in ["password", "123456789012", "qwertyuiopasdf", "aaaaaaaaaaaaaaaaaaaa"] {
        assert_eq!(hasher.check_entropy(weak), Err(AuthError::WeakPassword), "{weak}");
    }
}

#[test]
fn test_entropy_grows_with_variety() {
    assert!(estimate_entropy("abcdefgh") < estimate_entropy("aZ3!qP9-"));
    assert_eq!(estimate_entropy(""), 0.0);
}
