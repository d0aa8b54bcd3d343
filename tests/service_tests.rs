//! 服务层集成测试

use account_service::{
    auth::jwt::JwtService,
    config::AppConfig,
    models::user::{LoginRequest, RegisterRequest},
    services::{AuthService, SessionService},
};
use serial_test::serial;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

mod common;
use common::{create_test_config, create_test_user, setup_test_db};

fn make_auth_service(config: &AppConfig, pool: PgPool) -> AuthService {
    let jwt_service = Arc::new(JwtService::from_config(config).expect("JWT service"));
    AuthService::new(pool, jwt_service, Arc::new(config.clone()))
}

fn register_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: "Secret123".to_string(),
        first_name: Some("Alice".to_string()),
        last_name: None,
    }
}

#[tokio::test]
#[serial]
async fn test_register_creates_user_with_default_role() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let auth = make_auth_service(&config, pool);

    let user = auth.register(register_request("alice@example.com")).await.unwrap();

    assert_eq!(user.email, "alice@example.com");
    assert_eq!(user.role.as_str(), "user");
}

#[tokio::test]
#[serial]
async fn test_register_duplicate_email_conflicts() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let auth = make_auth_service(&config, pool);

    auth.register(register_request("alice@example.com")).await.unwrap();

    let err = auth
        .register(register_request("alice@example.com"))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "CONFLICT");
}

#[tokio::test]
#[serial]
async fn test_login_issues_tokens_and_session() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let auth = make_auth_service(&config, pool.clone());

    let user_id = create_test_user(&pool, "alice@example.com", "Secret123")
        .await
        .unwrap();

    let issued = auth
        .login(
            LoginRequest {
                email: "alice@example.com".to_string(),
                password: "Secret123".to_string(),
            },
            Some("10.0.0.1"),
            Some("Firefox"),
        )
        .await
        .unwrap();

    assert!(!issued.access_token.is_empty());
    assert!(!issued.refresh_token.is_empty());
    assert_ne!(issued.access_token, issued.refresh_token);
    assert_eq!(issued.user.id, user_id);

    // 登录同时创建了会话
    let sessions = SessionService::new(pool)
        .list_active_sessions(user_id)
        .await
        .unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].ip_address.as_deref(), Some("10.0.0.1"));
}

#[tokio::test]
#[serial]
async fn test_login_failures_return_identical_error() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let auth = make_auth_service(&config, pool.clone());

    create_test_user(&pool, "alice@example.com", "Secret123")
        .await
        .unwrap();

    let wrong_password = auth
        .login(
            LoginRequest {
                email: "alice@example.com".to_string(),
                password: "WrongPassword".to_string(),
            },
            None,
            None,
        )
        .await
        .unwrap_err();

    let unknown_email = auth
        .login(
            LoginRequest {
                email: "ghost@example.com".to_string(),
                password: "Secret123".to_string(),
            },
            None,
            None,
        )
        .await
        .unwrap_err();

    assert_eq!(wrong_password.error_code(), "INVALID_CREDENTIALS");
    assert_eq!(wrong_password.error_code(), unknown_email.error_code());
    assert_eq!(wrong_password.user_message(), unknown_email.user_message());
}

#[tokio::test]
#[serial]
async fn test_rotate_refresh_token_invalidates_old() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let auth = make_auth_service(&config, pool.clone());

    create_test_user(&pool, "alice@example.com", "Secret123")
        .await
        .unwrap();

    let issued = auth
        .login(
            LoginRequest {
                email: "alice@example.com".to_string(),
                password: "Secret123".to_string(),
            },
            None,
            None,
        )
        .await
        .unwrap();

    let rotated = auth
        .rotate_refresh_token(&issued.refresh_token, None, None)
        .await
        .unwrap();
    assert_ne!(rotated.refresh_token, issued.refresh_token);

    // 旧令牌重放被拒绝
    let err = auth
        .rotate_refresh_token(&issued.refresh_token, None, None)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_REFRESH_TOKEN");

    // 新令牌仍然可用
    auth.rotate_refresh_token(&rotated.refresh_token, None, None)
        .await
        .unwrap();
}

#[tokio::test]
#[serial]
async fn test_rotate_rejects_garbage_token() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let auth = make_auth_service(&config, pool);

    let err = auth
        .rotate_refresh_token("not-a-jwt", None, None)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_REFRESH_TOKEN");
}

#[tokio::test]
#[serial]
async fn test_logout_is_idempotent() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let auth = make_auth_service(&config, pool.clone());

    create_test_user(&pool, "alice@example.com", "Secret123")
        .await
        .unwrap();

    let issued = auth
        .login(
            LoginRequest {
                email: "alice@example.com".to_string(),
                password: "Secret123".to_string(),
            },
            None,
            None,
        )
        .await
        .unwrap();

    auth.logout(&issued.refresh_token, None, None, None)
        .await
        .unwrap();

    // 登出后令牌不可再轮换
    let err = auth
        .rotate_refresh_token(&issued.refresh_token, None, None)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_REFRESH_TOKEN");

    // 重复登出成功
    auth.logout(&issued.refresh_token, None, None, None)
        .await
        .unwrap();
}

#[tokio::test]
#[serial]
async fn test_terminate_session_rejects_foreign_session() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let alice = create_test_user(&pool, "alice@example.com", "Secret123")
        .await
        .unwrap();
    let bob = create_test_user(&pool, "bob@example.com", "Secret123")
        .await
        .unwrap();

    let auth = make_auth_service(&config, pool.clone());
    auth.login(
        LoginRequest {
            email: "alice@example.com".to_string(),
            password: "Secret123".to_string(),
        },
        None,
        None,
    )
    .await
    .unwrap();

    let service = SessionService::new(pool);
    let alice_sessions = service.list_active_sessions(alice).await.unwrap();
    let session_id = alice_sessions[0].id;

    // Bob 终止 Alice 的会话：404
    let err = service.terminate_session(bob, session_id).await.unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");

    // Alice 自己可以终止
    service.terminate_session(alice, session_id).await.unwrap();

    // 会话不存在
    let err = service
        .terminate_session(alice, Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");
}

#[tokio::test]
#[serial]
async fn test_terminate_all_other_sessions_without_fingerprint_match() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let user_id = create_test_user(&pool, "alice@example.com", "Secret123")
        .await
        .unwrap();

    let auth = make_auth_service(&config, pool.clone());
    for _ in 0..3 {
        auth.login(
            LoginRequest {
                email: "alice@example.com".to_string(),
                password: "Secret123".to_string(),
            },
            Some("10.0.0.1"),
            Some("Firefox"),
        )
        .await
        .unwrap();
    }

    let service = SessionService::new(pool);

    // 指纹匹配不到时保留最近创建的活跃会话
    let terminated = service
        .terminate_all_other_sessions(user_id, Some("192.168.1.1"), Some("Chrome"))
        .await
        .unwrap();
    assert_eq!(terminated, 2);

    let remaining = service.list_active_sessions(user_id).await.unwrap();
    assert_eq!(remaining.len(), 1);
}

#[tokio::test]
#[serial]
async fn test_cleanup_expired_tokens() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let auth = make_auth_service(&config, pool);

    // 没有过期令牌时清理 0 条
    let deleted = auth.cleanup_expired_tokens().await.unwrap();
    assert_eq!(deleted, 0);
}
