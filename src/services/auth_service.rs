//! 认证服务：注册、登录、令牌轮换、登出

use crate::{
    auth::jwt::JwtService,
    auth::password::PasswordHasher,
    config::AppConfig,
    error::AppError,
    models::{
        auth::{IssuedTokens, RefreshToken},
        user::{LoginRequest, RegisterRequest, User, UserResponse},
    },
    repository::{SessionRepository, TokenRepository, UserRepository},
};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

pub struct AuthService {
    db: PgPool,
    jwt_service: Arc<JwtService>,
    config: Arc<AppConfig>,
}

impl AuthService {
    pub fn new(db: PgPool, jwt_service: Arc<JwtService>, config: Arc<AppConfig>) -> Self {
        Self {
            db,
            jwt_service,
            config,
        }
    }

    /// 用户注册
    /// 只创建账户，不签发令牌（HTTP 层组合注册 + 签发）
    pub async fn register(&self, req: RegisterRequest) -> Result<UserResponse, AppError> {
        let user_repo = UserRepository::new(self.db.clone());

        // 邮箱唯一
        if user_repo.find_by_email(&req.email).await?.is_some() {
            return Err(AppError::Conflict("User already exists".to_string()));
        }

        // 哈希密码
        let hasher = PasswordHasher::new();
        let password_hash = hasher.hash(&req.password)?;

        let user = user_repo
            .create(
                &req.email,
                &password_hash,
                req.first_name.as_deref(),
                req.last_name.as_deref(),
            )
            .await?;

        tracing::info!(user_id = %user.id, "User registered");

        Ok(UserResponse::from(user))
    }

    /// 用户登录
    pub async fn login(
        &self,
        req: LoginRequest,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<IssuedTokens, AppError> {
        let user_repo = UserRepository::new(self.db.clone());

        // 用户不存在和密码错误返回完全相同的错误，防止用户枚举
        let user: User = user_repo
            .find_by_email(&req.email)
            .await?
            .ok_or_else(AppError::invalid_credentials)?;

        let hasher = PasswordHasher::new();
        hasher.verify(&req.password, &user.password_hash)?;

        let tokens = self.issue_tokens(user, ip_address, user_agent).await?;

        tracing::info!("User logged in");

        Ok(tokens)
    }

    /// 根据用户 ID 签发令牌对（注册接口在 HTTP 层组合调用）
    pub async fn issue_tokens_for_user(
        &self,
        user_id: Uuid,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<IssuedTokens, AppError> {
        let user = UserRepository::new(self.db.clone())
            .find_by_id(&user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        self.issue_tokens(user, ip_address, user_agent).await
    }

    /// 共享签发路径：登录、注册、轮换都走这里
    /// 签发访问令牌 + 刷新令牌，持久化刷新令牌记录和会话记录
    async fn issue_tokens(
        &self,
        user: User,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<IssuedTokens, AppError> {
        let access_token = self.jwt_service.issue_access_token(&user)?;

        // 刷新令牌通过 token_id 与其存储记录绑定
        let token_id = Uuid::new_v4();
        let refresh_token = self.jwt_service.issue_refresh_token(&user, token_id)?;

        let record = self.refresh_token_record(token_id, &user, &refresh_token, ip_address, user_agent);
        TokenRepository::new(self.db.clone()).store(&record).await?;

        self.create_session(user.id, ip_address, user_agent).await?;

        Ok(IssuedTokens {
            access_token,
            refresh_token,
            user: UserResponse::from(user),
        })
    }

    /// 刷新令牌轮换
    /// 旧令牌失效和新令牌入库在同一个数据库事务内完成
    pub async fn rotate_refresh_token(
        &self,
        presented: &str,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<IssuedTokens, AppError> {
        // 签名、过期、类型校验
        self.jwt_service
            .verify_refresh(presented)
            .map_err(|_| AppError::invalid_refresh_token())?;

        // 库里必须存在有效且未过期的记录（轮换后的旧令牌在这里被拒绝）
        let token_repo = TokenRepository::new(self.db.clone());
        let digest = TokenRepository::hash_token(presented);
        let record: RefreshToken = token_repo
            .find_valid_by_digest(&digest)
            .await?
            .ok_or_else(AppError::invalid_refresh_token)?;

        let user: User = UserRepository::new(self.db.clone())
            .find_by_id(&record.user_id)
            .await?
            .ok_or_else(AppError::invalid_refresh_token)?;

        // 生成新令牌对
        let access_token = self.jwt_service.issue_access_token(&user)?;
        let new_token_id = Uuid::new_v4();
        let new_refresh_token = self.jwt_service.issue_refresh_token(&user, new_token_id)?;

        let new_record = self.refresh_token_record(
            new_token_id,
            &user,
            &new_refresh_token,
            ip_address,
            user_agent,
        );

        // 事务轮换：不存在旧令牌已失效但新令牌未入库的中间状态
        token_repo.rotate(record.id, &new_record).await?;

        self.create_session(user.id, ip_address, user_agent).await?;

        tracing::info!(user_id = %user.id, "Refresh token rotated");

        Ok(IssuedTokens {
            access_token,
            refresh_token: new_refresh_token,
            user: UserResponse::from(user),
        })
    }

    /// 登出：使匹配的有效刷新令牌全部失效（幂等）
    /// 有设备元数据时同时终止对应会话
    pub async fn logout(
        &self,
        presented: &str,
        user_id: Option<Uuid>,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<(), AppError> {
        let token_repo = TokenRepository::new(self.db.clone());
        let digest = TokenRepository::hash_token(presented);

        // 第二次调用影响 0 行，不报错
        let invalidated = token_repo.invalidate_by_digest(&digest).await?;

        if let Some(user_id) = user_id {
            if ip_address.is_some() || user_agent.is_some() {
                let session_repo = SessionRepository::new(self.db.clone());
                if let Some(session) = session_repo
                    .find_current(user_id, ip_address, user_agent)
                    .await?
                {
                    session_repo.expire(session.id).await?;
                }
            }
        }

        tracing::debug!(invalidated, "Logout processed");

        Ok(())
    }

    /// 清理过期刷新令牌（维护任务）
    pub async fn cleanup_expired_tokens(&self) -> Result<u64, AppError> {
        TokenRepository::new(self.db.clone()).delete_expired().await
    }

    fn refresh_token_record(
        &self,
        token_id: Uuid,
        user: &User,
        signed_token: &str,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> RefreshToken {
        RefreshToken {
            id: token_id,
            user_id: user.id,
            token_digest: TokenRepository::hash_token(signed_token),
            expires_at: chrono::Utc::now()
                + chrono::Duration::seconds(self.config.security.refresh_token_exp_secs as i64),
            is_valid: true,
            ip_address: ip_address.map(|s| s.to_string()),
            user_agent: user_agent.map(|s| s.to_string()),
            created_at: chrono::Utc::now(),
        }
    }

    async fn create_session(
        &self,
        user_id: Uuid,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<(), AppError> {
        let expires_at = chrono::Utc::now()
            + chrono::Duration::seconds(self.config.security.session_exp_secs as i64);

        SessionRepository::new(self.db.clone())
            .create(user_id, ip_address, user_agent, expires_at)
            .await?;

        Ok(())
    }
}
