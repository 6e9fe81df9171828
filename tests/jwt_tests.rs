//! 会话令牌单元测试
//!
//! 测试令牌签发、校验与过期

use chrono::Duration;
use secrecy::Secret;
use unsubtle_core::auth::{
    jwt::{mint, validate},
    AuthError, JwtService,
};
use uuid::Uuid;

const SECRET: &str = "test_secret_key_32_characters_long!";

#[test]
fn test_round_trip_for_many_subjects() {
    for _ in 0..20 {
        let subject = Uuid::new_v4();
        let token = mint(subject, SECRET, Duration::minutes(60)).unwrap();
        assert_eq!(validate(&token, SECRET).unwrap(), subject);
    }
}

#[test]
fn test_zero_ttl_is_rejected() {
    assert_eq!(
        mint(Uuid::new_v4(), SECRET, Duration::zero()),
        Err(AuthError::InvalidTtl)
    );
}

#[test]
fn test_token_from_other_secret() {
    let token = mint(Uuid::new_v4(), SECRET, Duration::minutes(5)).unwrap();
    assert_eq!(
        validate(&token, "a-completely-different-secret-value"),
        Err(AuthError::BadSignature)
    );
}

#[test]
fn test_tampered_payload() {
    let token = mint(Uuid::new_v4(), SECRET, Duration::minutes(5)).unwrap();
    let parts: Vec<&str> = token.split('.').collect();
    let other = mint(Uuid::new_v4(), SECRET, Duration::minutes(5)).unwrap();
    let other_payload = other.split('.').nth(1).unwrap();

    let tampered = format!("{}.{}.{}", parts[0], other_payload, parts[2]);
    assert_eq!(validate(&tampered, SECRET), Err(AuthError::BadSignature));
}

#[tokio::test]
async fn test_short_lived_token_expires() {
    let token = mint(Uuid::new_v4(), SECRET, Duration::seconds(1)).unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(2100)).await;

    assert_eq!(validate(&token, SECRET), Err(AuthError::Expired));
}

#[test]
fn test_jwt_service_uses_configured_ttl() {
    let service = JwtService::new(Secret::new(SECRET.to_string()), 3600);
    assert_eq!(service.expires_in(), 3600);

    let user_id = Uuid::new_v4();
    let token = service.issue(user_id).unwrap();
    assert_eq!(service.verify(&token).unwrap(), user_id);
}
