//! 密码哈希功能单元测试
//!
//! 测试 Argon2id 密码哈希和验证功能

use account_service::auth::password::PasswordHasher;

#[test]
fn test_password_hash_and_verify() {
    let hasher = PasswordHasher::new();
    let password = "TestPassword123!";

    let hash = hasher.hash(password).expect("Hashing should succeed");

    // 哈希值应该包含 argon2 标识
    assert!(hash.contains("$argon2"));

    // 验证正确密码
    hasher.verify(password, &hash).expect("Verification should succeed");
}

#[test]
fn test_password_verify_with_wrong_password() {
    let hasher = PasswordHasher::new();
    let password = "TestPassword123!";

    let hash = hasher.hash(password).expect("Hashing should succeed");

    // 验证错误密码应该失败
    let result = hasher.verify("WrongPassword123!", &hash);
    assert!(result.is_err(), "Wrong password should fail verification");
}

#[test]
fn test_password_hash_different_each_time() {
    let hasher = PasswordHasher::new();
    let password = "TestPassword123!";

    let hash1 = hasher.hash(password).expect("First hash should succeed");
    let hash2 = hasher.hash(password).expect("Second hash should succeed");

    // 由于随机盐，每次生成的哈希应该不同
    assert_ne!(hash1, hash2, "Hashes should be different due to salt");

    // 但两个哈希都应该能验证同一个密码
    hasher.verify(password, &hash1).expect("First hash should verify");
    hasher.verify(password, &hash2).expect("Second hash should verify");
}

#[test]
fn test_password_hash_unicode() {
    let hasher = PasswordHasher::new();
    let password = "密码测试Test123!🔒";

    let hash = hasher.hash(password).expect("Unicode password should hash");

    hasher.verify(password, &hash).expect("Unicode password should verify");

    // 稍有不同的 Unicode 密码应该失败
    assert!(hasher.verify("密码测试Test123🔒", &hash).is_err());
}

#[test]
fn test_password_hash_long_password() {
    let hasher = PasswordHasher::new();
    // 超长密码
    let password = "a".repeat(500) + "B1!";

    let hash = hasher.hash(&password).expect("Long password should hash");

    hasher.verify(&password, &hash).expect("Long password should verify");
}

#[test]
fn test_password_verify_with_invalid_hash() {
    let hasher = PasswordHasher::new();
    let password = "TestPassword123!";

    // 无效的哈希格式
    assert!(hasher.verify(password, "invalid_hash").is_err());
    assert!(hasher.verify(password, "$argon2id$v=19$invalid").is_err());
    assert!(hasher.verify(password, "").is_err());
}

#[test]
fn test_password_verify_failures_are_indistinguishable() {
    let hasher = PasswordHasher::new();
    let hash = hasher.hash("TestPassword123!").unwrap();

    // 密码错误和哈希损坏必须返回同样的错误码
    let wrong = hasher.verify("WrongPassword123!", &hash).unwrap_err();
    let corrupt = hasher.verify("TestPassword123!", "corrupted").unwrap_err();

    assert_eq!(wrong.error_code(), corrupt.error_code());
    assert_eq!(wrong.user_message(), corrupt.user_message());
}

#[test]
fn test_password_hasher_default() {
    let hasher1 = PasswordHasher::default();
    let hasher2 = PasswordHasher::new();

    let password = "TestPassword123!";
    let hash1 = hasher1.hash(password).unwrap();
    let hash2 = hasher2.hash(password).unwrap();

    // 两个不同的 hasher 应该都能正常工作
    assert_ne!(hash1, hash2);
    hasher1.verify(password, &hash1).unwrap();
    hasher2.verify(password, &hash2).unwrap();
}
