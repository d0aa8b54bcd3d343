//! Database repository layer

pub mod session_repo;
pub mod token_repo;
pub mod user_repo;

pub use session_repo::*;
pub use token_repo::*;
pub use user_repo::*;
