//! Authentication and authorization module

pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{Claims, JwtService};
pub use middleware::{
    authorize, bearer_token, extract_access_token, jwt_auth_middleware, AuthContext,
    ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};
pub use password::PasswordHasher;
