use chrono::{DateTime, Utc};
use crate::db;
use crate::services::PasswordExpiry;
use crate::utils::context::ServiceContext;
use crate::utils::errors::WardenError;

///
/// Report whether an account's password has passed its expiry timestamp. The
/// timestamp was stamped when the password was last set, so policy changes
/// since then don't move it.
///
pub async fn password_expiry(ctx: &ServiceContext, user_id: &str) -> Result<PasswordExpiry, WardenError> {
    let _ = ctx.active_policy().await?;
    let user = db::user::load(user_id, ctx.db()).await?;
    let now = ctx.now();

    let expires_at: Option<DateTime<Utc>> = user.password_expires_at.map(|at| at.into());

    Ok(PasswordExpiry {
        expired: expires_at.map(|at| at <= now).unwrap_or(false),
        expires_at,
    })
}
