//! JWT 认证与角色授权中间件
//! 令牌来源：accessToken Cookie 或 Authorization Bearer 头

use crate::{
    auth::jwt::JwtService,
    error::AppError,
    models::user::Role,
};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tower_cookies::Cookies;
use uuid::Uuid;

/// 访问令牌 Cookie 名称
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
/// 刷新令牌 Cookie 名称
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// 认证上下文（附加到请求扩展）
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthContext {
    /// 角色授权检查：角色不在允许集合内时返回 403
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), AppError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

// 实现 FromRequestParts 以便在 handler 中直接提取 AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}

/// 从 Cookie 或 Authorization 头提取访问令牌
/// Cookie 优先（浏览器客户端），Bearer 头其次（API 客户端）
pub fn extract_access_token(cookies: &Cookies, headers: &HeaderMap) -> Result<String, AppError> {
    if let Some(cookie) = cookies.get(ACCESS_TOKEN_COOKIE) {
        return Ok(cookie.value().to_string());
    }

    bearer_token(headers).ok_or_else(|| AppError::unauthorized("Authentication required"))
}

/// 从 Authorization 头提取 Bearer 令牌
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
}

/// JWT 认证中间件 - 必须认证
pub async fn jwt_auth_middleware(
    State(jwt_service): State<Arc<JwtService>>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // 从 Cookie 或 Authorization 头提取令牌
    let token = extract_access_token(&cookies, req.headers())?;

    // 验证令牌
    let claims = jwt_service.verify_access(&token)?;

    // 创建认证上下文
    let auth_context = AuthContext {
        user_id: claims.user_id()?,
        email: claims.email,
        role: claims.role,
    };

    // 附加到请求扩展
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

/// 角色授权中间件工厂
/// 必须在 jwt_auth_middleware 之后运行，否则返回 401
///
/// ```ignore
/// .layer(axum::middleware::from_fn(authorize(&[Role::Admin])))
/// ```
pub fn authorize(
    allowed: &'static [Role],
) -> impl Fn(Request, Next) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AppError>> + Send>>
       + Clone {
    move |req: Request, next: Next| {
        Box::pin(async move {
            let context = req
                .extensions()
                .get::<AuthContext>()
                .cloned()
                .ok_or_else(|| AppError::unauthorized("Authentication required"))?;

            context.require_role(allowed)?;

            Ok(next.run(req).await)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_valid() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer test_token_123".parse().unwrap());

        assert_eq!(bearer_token(&headers), Some("test_token_123".to_string()));
    }

    #[test]
    fn test_bearer_token_missing() {
        let headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());
    }

    #[test]
    fn test_bearer_token_invalid_format() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "InvalidFormat".parse().unwrap());

        assert!(bearer_token(&headers).is_none());
    }

    #[tokio::test]
    async fn test_authorize_layer_rejects_wrong_role() {
        use axum::{
            body::Body,
            http::{Request as HttpRequest, StatusCode},
            routing::get,
            Router,
        };
        use tower::ServiceExt;

        async fn inject_user(mut req: Request, next: Next) -> Response {
            req.extensions_mut().insert(AuthContext {
                user_id: Uuid::new_v4(),
                email: "alice@example.com".to_string(),
                role: Role::User,
            });
            next.run(req).await
        }

        let app = Router::new()
            .route("/admin", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn(authorize(&[Role::Admin])))
            .layer(axum::middleware::from_fn(inject_user));

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/admin")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_authorize_layer_requires_auth_context() {
        use axum::{
            body::Body,
            http::{Request as HttpRequest, StatusCode},
            routing::get,
            Router,
        };
        use tower::ServiceExt;

        let app = Router::new()
            .route("/admin", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn(authorize(&[Role::Admin])));

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/admin")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_require_role() {
        let context = AuthContext {
            user_id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            role: Role::User,
        };

        assert!(context.require_role(&[Role::User]).is_ok());
        assert!(context.require_role(&[Role::User, Role::Admin]).is_ok());
        assert!(matches!(
            context.require_role(&[Role::Admin]),
            Err(AppError::Forbidden)
        ));
    }
}
