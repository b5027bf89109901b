use futures::future::BoxFuture;
use mongodb::ClientSession;
use tracing::warn;
use crate::db::{self, mongo};
use crate::model::lockout::{self, Transition};
use crate::model::log::{SecurityAction, SecurityLogEntry};
use crate::model::user::SecurityUpdate;
use crate::services::{LockoutStatus, LoginAttempt};
use crate::utils::context::ServiceContext;
use crate::utils::errors::WardenError;

///
/// Record a failed authentication attempt against an account.
///
/// The counter always increments, even while the account is already locked.
/// The lock timestamp is stamped once, when the counter reaches the policy
/// threshold exactly - further failures never extend it. The read-increment-
/// write runs in a transaction, so two simultaneous failures count as two.
///
pub async fn record_failed_login(ctx: &ServiceContext, request: &LoginAttempt)
    -> Result<LockoutStatus, WardenError> {

    mongo::in_transaction(ctx, request, attempt).await
}

fn attempt<'a>(ctx: &'a ServiceContext, request: &'a LoginAttempt, session: &'a mut ClientSession)
    -> BoxFuture<'a, Result<LockoutStatus, WardenError>> {

    Box::pin(async move {
        let policy = ctx.active_policy().await?;
        let user = db::user::load_for_update(&request.user_id, ctx.db(), session).await?;

        let now = ctx.now();
        let transition = lockout::register_failure(&user, &policy, now);

        let update = SecurityUpdate {
            failed_login_attempts: Some(transition.failed_attempts()),
            account_locked_until: match transition {
                Transition::Locked { locked_until, .. } => Some(Some(locked_until)),
                Transition::Counted { .. } => None,
            },
            ..SecurityUpdate::default()
        };

        db::user::apply_security_update(&user.user_id, update, ctx.db(), session).await?;

        let reason = match transition {
            Transition::Locked { failed_attempts, .. } => {
                warn!("User {} locked out after {} failed login attempts", user.user_id, failed_attempts);
                format!("Account locked after {} failed attempts", failed_attempts)
            },
            Transition::Counted { .. } => "Invalid password".to_string(),
        };

        let entry = SecurityLogEntry::failed(
            SecurityAction::FailedLogin,
            &user,
            &reason,
            &request.client,
            now);
        db::log::append(&entry, ctx.db(), session).await?;

        let locked_until = transition.locked_until();
        Ok(LockoutStatus {
            locked: locked_until.map(|until| until > now).unwrap_or(false),
            locked_until,
            failed_attempts: transition.failed_attempts(),
        })
    })
}
