//! HTTP 中间件
//! 应用状态、请求追踪、客户端 IP 提取

use axum::{
    extract::{ConnectInfo, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// 应用状态
///
/// AppState 内部使用 Arc 包装服务,这样:
/// 1. 多个请求可以共享服务实例
/// 2. Clone 成本低廉(Arc 是指针拷贝)
#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::AppConfig,
    pub db: sqlx::PgPool,
    pub auth_service: Arc<crate::services::AuthService>,
    pub session_service: Arc<crate::services::SessionService>,
    pub jwt_service: Arc<crate::auth::jwt::JwtService>,
}

impl AppState {
    /// 从配置和连接池构建完整应用状态
    pub fn new(
        config: crate::config::AppConfig,
        db: sqlx::PgPool,
    ) -> Result<Self, crate::error::AppError> {
        let jwt_service = Arc::new(crate::auth::jwt::JwtService::from_config(&config)?);
        let auth_service = Arc::new(crate::services::AuthService::new(
            db.clone(),
            jwt_service.clone(),
            Arc::new(config.clone()),
        ));
        let session_service = Arc::new(crate::services::SessionService::new(db.clone()));

        Ok(Self {
            config,
            db,
            auth_service,
            session_service,
            jwt_service,
        })
    }
}

/// 对端地址，由请求追踪中间件放进扩展
/// 直连时来自 TCP 连接信息，测试里的 oneshot 请求没有连接信息，为 None
#[derive(Debug, Clone, Copy)]
pub struct ClientAddr(pub Option<SocketAddr>);

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(mut req: Request, next: Next) -> Response {
    // 生成或提取 trace_id/request_id
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    // 对端地址放进扩展，处理器提取客户端 IP 时使用
    let peer_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    req.extensions_mut().insert(ClientAddr(peer_addr));

    let method = req.method().to_string();
    let uri = req.uri().to_string();

    // 创建 span
    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    async move {
        let start = Instant::now();

        // 继续处理请求
        let response = next.run(req).await;

        let elapsed = start.elapsed();
        let status = response.status().as_u16();

        // 记录指标 - 使用静态字符串
        let method_name = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            "PATCH" => "PATCH",
            _ => "UNKNOWN",
        };
        let status_code = match status {
            200 => "200",
            201 => "201",
            204 => "204",
            400 => "400",
            401 => "401",
            403 => "403",
            404 => "404",
            409 => "409",
            500 => "500",
            _ => "other",
        };

        metrics::counter!("http_requests_total", "method" => method_name, "status" => status_code)
            .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        // 记录日志
        tracing::info!(
            method = %method,
            uri = %uri,
            status = status,
            elapsed_ms = elapsed.as_millis(),
            "Request completed"
        );

        // 在响应头中添加 trace_id
        let mut response = response;
        if let Ok(value) = trace_id.parse() {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = request_id.parse() {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// 获取客户端 IP 地址
/// 信任代理时依次检查 X-Forwarded-For、X-Real-IP，
/// 没有转发头（或不信任代理）时回退到 TCP 对端地址
pub fn get_client_ip(
    headers: &HeaderMap,
    peer_addr: Option<SocketAddr>,
    trust_proxy: bool,
) -> Option<String> {
    if trust_proxy {
        if let Some(forwarded_for) = headers.get("x-forwarded-for") {
            if let Ok(forwarded_str) = forwarded_for.to_str() {
                // X-Forwarded-For 可能包含多个 IP，取第一个
                if let Some(first_ip) = forwarded_str.split(',').next() {
                    return Some(first_ip.trim().to_string());
                }
            }
        }

        if let Some(real_ip) = headers.get("x-real-ip") {
            if let Ok(ip_str) = real_ip.to_str() {
                return Some(ip_str.to_string());
            }
        }
    }

    peer_addr.map(|addr| addr.ip().to_string())
}

/// 获取 User-Agent 头
pub fn get_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}
