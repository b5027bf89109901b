use crate::db;
use crate::utils::context::ServiceContext;
use crate::utils::errors::{ErrorCode, WardenError};

///
/// The pre-authentication guard. Callers run this before verifying a password:
/// a locked account is turned away without touching the failure counter, and an
/// expired password must be changed before the login can proceed.
///
pub async fn ensure_login_allowed(ctx: &ServiceContext, user_id: &str) -> Result<(), WardenError> {
    let _ = ctx.active_policy().await?;
    let user = db::user::load(user_id, ctx.db()).await?;
    let now = ctx.now();

    if let Some(until) = user.locked_until() {
        if until > now {
            return Err(ErrorCode::AccountLocked
                .with_msg(&format!("The account is locked until {}", until)))
        }
    }

    if let Some(expires_at) = user.password_expires_at {
        let expires_at: chrono::DateTime<chrono::Utc> = expires_at.into();
        if expires_at <= now {
            return Err(ErrorCode::PasswordExpired
                .with_msg("The password has expired and must be changed"))
        }
    }

    Ok(())
}
