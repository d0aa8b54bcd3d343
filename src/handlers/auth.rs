//! 认证相关的 HTTP 处理器
//! 令牌通过 httpOnly Cookie 下发，刷新令牌 Cookie 只发给刷新端点

use crate::{
    auth::middleware::{AuthContext, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE},
    error::AppError,
    middleware::{get_client_ip, get_user_agent, AppState, ClientAddr},
    models::{
        auth::RefreshRequest,
        user::{LoginRequest, RegisterRequest},
    },
    repository::UserRepository,
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;
use tower_cookies::{
    cookie::time::Duration,
    Cookie, Cookies,
};
use validator::Validate;

/// 刷新端点路径，刷新令牌 Cookie 的 Path 限定在这里
pub const REFRESH_PATH: &str = "/api/auth.refresh";

/// 注册
/// 创建账户后立即签发令牌（注册 + 签发在 HTTP 层组合）
pub async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Extension(ClientAddr(peer_addr)): Extension<ClientAddr>,
    cookies: Cookies,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let ip_address = get_client_ip(&headers, peer_addr, state.config.security.trust_proxy);
    let user_agent = get_user_agent(&headers);

    let new_user = state.auth_service.register(req).await?;

    let issued = state
        .auth_service
        .issue_tokens_for_user(new_user.id, ip_address.as_deref(), user_agent.as_deref())
        .await?;

    set_token_cookies(&cookies, &state, &issued.access_token, &issued.refresh_token);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "data": { "user": issued.user }
        })),
    ))
}

/// 登录
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Extension(ClientAddr(peer_addr)): Extension<ClientAddr>,
    cookies: Cookies,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let ip_address = get_client_ip(&headers, peer_addr, state.config.security.trust_proxy);
    let user_agent = get_user_agent(&headers);

    let issued = state
        .auth_service
        .login(req, ip_address.as_deref(), user_agent.as_deref())
        .await?;

    set_token_cookies(&cookies, &state, &issued.access_token, &issued.refresh_token);

    Ok(Json(json!({
        "status": "success",
        "data": { "user": issued.user }
    })))
}

/// 刷新令牌
/// 刷新令牌来自 Cookie 或请求体
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Extension(ClientAddr(peer_addr)): Extension<ClientAddr>,
    cookies: Cookies,
    body: Option<Json<RefreshRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let presented = refresh_token_from(&cookies, body.as_deref())
        .ok_or_else(AppError::refresh_token_required)?;

    let ip_address = get_client_ip(&headers, peer_addr, state.config.security.trust_proxy);
    let user_agent = get_user_agent(&headers);

    let issued = state
        .auth_service
        .rotate_refresh_token(&presented, ip_address.as_deref(), user_agent.as_deref())
        .await?;

    set_token_cookies(&cookies, &state, &issued.access_token, &issued.refresh_token);

    Ok(Json(json!({
        "status": "success",
        "data": { "user": issued.user }
    })))
}

/// 登出
/// 使刷新令牌失效并清除 Cookie
/// 已签发的访问令牌不做服务端吊销，到期自然失效
pub async fn logout(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    headers: HeaderMap,
    Extension(ClientAddr(peer_addr)): Extension<ClientAddr>,
    cookies: Cookies,
    body: Option<Json<RefreshRequest>>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(presented) = refresh_token_from(&cookies, body.as_deref()) {
        let ip_address = get_client_ip(&headers, peer_addr, state.config.security.trust_proxy);
        let user_agent = get_user_agent(&headers);

        state
            .auth_service
            .logout(
                &presented,
                Some(auth_context.user_id),
                ip_address.as_deref(),
                user_agent.as_deref(),
            )
            .await?;
    }

    clear_token_cookies(&cookies, &state);

    Ok(Json(json!({
        "status": "success",
        "message": "Logout successful"
    })))
}

/// 获取当前用户信息
/// 每次从数据库读取，保证返回最新资料
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let user = UserRepository::new(state.db.clone())
        .find_by_id(&auth_context.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({
        "status": "success",
        "data": { "user": crate::models::user::UserResponse::from(user) }
    })))
}

/// 从 Cookie 或请求体提取刷新令牌（Cookie 优先）
fn refresh_token_from(cookies: &Cookies, body: Option<&RefreshRequest>) -> Option<String> {
    cookies
        .get(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| body.and_then(|b| b.refresh_token.clone()))
}

/// 下发令牌 Cookie
/// accessToken: httpOnly，全站；refreshToken: httpOnly，Path 限定刷新端点
fn set_token_cookies(cookies: &Cookies, state: &AppState, access_token: &str, refresh_token: &str) {
    let security = &state.config.security;

    let mut access_cookie = Cookie::build((ACCESS_TOKEN_COOKIE, access_token.to_string()))
        .http_only(true)
        .secure(security.cookie_secure)
        .path("/")
        .max_age(Duration::seconds(security.access_token_exp_secs as i64))
        .build();

    let mut refresh_cookie = Cookie::build((REFRESH_TOKEN_COOKIE, refresh_token.to_string()))
        .http_only(true)
        .secure(security.cookie_secure)
        .path(REFRESH_PATH)
        .max_age(Duration::seconds(security.refresh_token_exp_secs as i64))
        .build();

    if let Some(domain) = &security.cookie_domain {
        access_cookie.set_domain(domain.clone());
        refresh_cookie.set_domain(domain.clone());
    }

    cookies.add(access_cookie);
    cookies.add(refresh_cookie);
}

/// 清除令牌 Cookie（Path 必须与下发时一致）
fn clear_token_cookies(cookies: &Cookies, state: &AppState) {
    let security = &state.config.security;

    let mut access_cookie = Cookie::build((ACCESS_TOKEN_COOKIE, ""))
        .path("/")
        .build();
    let mut refresh_cookie = Cookie::build((REFRESH_TOKEN_COOKIE, ""))
        .path(REFRESH_PATH)
        .build();

    if let Some(domain) = &security.cookie_domain {
        access_cookie.set_domain(domain.clone());
        refresh_cookie.set_domain(domain.clone());
    }

    cookies.remove(access_cookie);
    cookies.remove(refresh_cookie);
}
