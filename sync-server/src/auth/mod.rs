//! 认证模块
//!
//! - [`JwtService`] - JWT 令牌服务
//! - [`CurrentUser`] - 当前员工上下文 (员工 id、角色、租户)
//! - [`authenticate_token`] - 令牌校验 (HTTP 提取器与推送 hub 共用)

pub mod extractor;
pub mod jwt;

pub use extractor::{TENANT_HEADER, authenticate_token};
pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
