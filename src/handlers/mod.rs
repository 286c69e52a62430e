pub mod admin;
pub mod auth;
pub mod event;

pub use admin::admin_config;
pub use auth::auth_config;
pub use event::event_config;

use crate::error::AppError;
use crate::middlewares::AuthUser;
use actix_web::{HttpMessage, HttpRequest};

/// 从请求扩展中取出认证中间件写入的用户身份
pub(crate) fn auth_user(req: &HttpRequest) -> Result<AuthUser, AppError> {
    req.extensions()
        .get::<AuthUser>()
        .copied()
        .ok_or_else(|| AppError::AuthError("Not authenticated".to_string()))
}

pub(crate) fn require_admin(req: &HttpRequest) -> Result<AuthUser, AppError> {
    let user = auth_user(req)?;
    if !user.is_admin {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }
    Ok(user)
}
