//! 数据模型模块
//! 用户、刷新令牌、会话领域模型与请求/响应 DTO

pub mod auth;
pub mod session;
pub mod user;
