use futures::future::BoxFuture;
use mongodb::ClientSession;
use tracing::warn;
use crate::db::{self, mongo};
use crate::model::history;
use crate::model::log::{SecurityAction, SecurityLogEntry};
use crate::model::user::SecurityUpdate;
use crate::services::{CompleteResetRequest, PasswordChanged};
use crate::utils::context::ServiceContext;
use crate::utils::errors::{ErrorCode, WardenError};

///
/// Redeem a reset token and set a new password.
///
/// Missing, mismatched and expired tokens all fail with the same error so the
/// response doesn't tell an attacker which one they hold. The token fields are
/// cleared in the same transaction as the digest swap, making each token
/// single-use even under concurrent redemption attempts.
///
pub async fn complete_reset(ctx: &ServiceContext, request: &CompleteResetRequest)
    -> Result<PasswordChanged, WardenError> {

    mongo::in_transaction(ctx, request, attempt).await
}

fn attempt<'a>(ctx: &'a ServiceContext, request: &'a CompleteResetRequest, session: &'a mut ClientSession)
    -> BoxFuture<'a, Result<PasswordChanged, WardenError>> {

    Box::pin(async move {
        let policy = ctx.active_policy().await?;

        let user = db::user::find_by_reset_token(&request.token, ctx.db(), session)
            .await?
            .ok_or_else(invalid_token)?;

        let now = ctx.now();
        let still_valid = user.password_reset_expires_at
            .map(|expires_at| {
                let expires_at: chrono::DateTime<chrono::Utc> = expires_at.into();
                expires_at > now
            })
            .unwrap_or(false);

        if !still_valid {
            warn!("Password reset rejected for user {}: token expired", user.user_id);
            return Err(invalid_token())
        }

        policy.validate(&request.new_password)?;

        let new_password = request.new_password.clone();
        let window = user.password_history.clone();
        let hasher = policy.clone();
        let new_phc = tokio::task::spawn_blocking(move || -> Result<String, WardenError> {
            if history::is_reused(&new_password, &window)? {
                return Err(ErrorCode::PasswordUsedBefore
                    .with_msg("The password has been used before, choose another"))
            }
            hasher.hash_into_phc(&new_password)
        }).await??;

        let expires_at = policy.expires_at(now);

        let update = SecurityUpdate {
            password_hash: Some(new_phc),
            password_history: Some(history::push_history(
                user.password_history.clone(),
                user.password_hash.clone(),
                policy.prevent_reuse_count as usize)),
            password_changed_at: Some(now),
            password_expires_at: Some(expires_at),
            password_reset_token: Some(None),
            password_reset_expires_at: Some(None),
            ..SecurityUpdate::default()
        };

        db::user::apply_security_update(&user.user_id, update, ctx.db(), session).await?;

        let entry = SecurityLogEntry::succeeded(
            SecurityAction::ResetCompleted,
            &user,
            None,
            &request.client,
            now);
        db::log::append(&entry, ctx.db(), session).await?;

        Ok(PasswordChanged { expires_at })
    })
}

// The one message for every way a token can be wrong.
fn invalid_token() -> WardenError {
    ErrorCode::InvalidResetToken.with_msg("The password reset token is invalid or has expired")
}
