//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_cookies::CookieManagerLayer;
use tower_http::limit::RequestBodyLimitLayer;

use crate::{handlers, middleware::AppState};

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点（健康检查与指标）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::metrics::metrics_export));

    // 认证路由（无需认证）
    let auth_routes = Router::new()
        .route("/api/auth.register", post(handlers::auth::register))
        .route("/api/auth.login", post(handlers::auth::login))
        .route("/api/auth.refresh", post(handlers::auth::refresh));

    // 需要认证的路由
    let authenticated_routes = Router::new()
        .route("/api/auth.logout", post(handlers::auth::logout))
        .route("/api/auth.me", get(handlers::auth::get_current_user))
        .route("/api/sessions.list", get(handlers::session::list_sessions))
        .route(
            "/api/sessions.terminate",
            post(handlers::session::terminate_session),
        )
        .route(
            "/api/sessions.terminateAll",
            post(handlers::session::terminate_all_sessions),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.jwt_service.clone(),
            crate::auth::middleware::jwt_auth_middleware,
        ));

    // 组合所有路由
    // CookieManagerLayer 必须包住认证中间件，否则 Cookie 提取不可用
    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(authenticated_routes)
        // 认证请求体都很小，1 MiB 足够
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .layer(CookieManagerLayer::new())
        .layer(axum::middleware::from_fn(
            crate::middleware::request_tracking_middleware,
        ))
        .with_state(state)
}
