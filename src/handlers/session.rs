//! 会话管理的 HTTP 处理器

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::{get_client_ip, get_user_agent, AppState, ClientAddr},
    models::session::TerminateSessionRequest,
};
use axum::{extract::State, http::HeaderMap, response::IntoResponse, Extension, Json};
use serde_json::json;
use std::sync::Arc;

/// 列出当前用户的活跃会话
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let sessions = state
        .session_service
        .list_active_sessions(auth_context.user_id)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": { "sessions": sessions }
    })))
}

/// 终止指定会话
pub async fn terminate_session(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Json(req): Json<TerminateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .session_service
        .terminate_session(auth_context.user_id, req.session_id)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Session terminated successfully"
    })))
}

/// 终止当前设备以外的所有会话
pub async fn terminate_all_sessions(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    headers: HeaderMap,
    Extension(ClientAddr(peer_addr)): Extension<ClientAddr>,
) -> Result<impl IntoResponse, AppError> {
    let ip_address = get_client_ip(&headers, peer_addr, state.config.security.trust_proxy);
    let user_agent = get_user_agent(&headers);

    let terminated = state
        .session_service
        .terminate_all_other_sessions(
            auth_context.user_id,
            ip_address.as_deref(),
            user_agent.as_deref(),
        )
        .await?;

    Ok(Json(json!({
        "status": "success",
        "message": "All other sessions terminated successfully",
        "data": { "terminated": terminated }
    })))
}
