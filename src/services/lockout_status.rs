use crate::db;
use crate::services::LockoutStatus;
use crate::utils::context::ServiceContext;
use crate::utils::errors::WardenError;

///
/// Report whether an account is currently locked. A pure read - an expired lock
/// reads as unlocked but the stored fields are left for the next successful
/// login to clear.
///
pub async fn lockout_status(ctx: &ServiceContext, user_id: &str) -> Result<LockoutStatus, WardenError> {
    let _ = ctx.active_policy().await?;
    let user = db::user::load(user_id, ctx.db()).await?;
    let now = ctx.now();

    Ok(LockoutStatus {
        locked: user.is_locked(now),
        locked_until: user.locked_until(),
        failed_attempts: user.failed_login_attempts,
    })
}
