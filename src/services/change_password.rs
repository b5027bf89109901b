use futures::future::BoxFuture;
use mongodb::ClientSession;
use tracing::warn;
use crate::db::{self, mongo};
use crate::model::{algorithm, history};
use crate::model::log::{SecurityAction, SecurityLogEntry};
use crate::model::user::SecurityUpdate;
use crate::services::{ChangePasswordRequest, PasswordChanged};
use crate::utils::context::ServiceContext;
use crate::utils::errors::{ErrorCode, WardenError};

///
/// Change an account's password after proving knowledge of the current one.
///
/// The digest swap, the reuse-history push and the log entry are applied in a
/// single transaction. Any rejection along the way aborts it, so a rejected
/// request leaves the account exactly as it found it.
///
pub async fn change_password(ctx: &ServiceContext, request: &ChangePasswordRequest)
    -> Result<PasswordChanged, WardenError> {

    mongo::in_transaction(ctx, request, attempt).await
}

fn attempt<'a>(ctx: &'a ServiceContext, request: &'a ChangePasswordRequest, session: &'a mut ClientSession)
    -> BoxFuture<'a, Result<PasswordChanged, WardenError>> {

    Box::pin(async move {
        let policy = ctx.active_policy().await?;
        let user = db::user::load_for_update(&request.user_id, ctx.db(), session).await?;

        // Prove the caller knows the current password before anything else.
        let current_phc = user.password_hash.clone();
        let old_password = request.old_password.clone();
        let matched = tokio::task::spawn_blocking(move || algorithm::verify(&old_password, &current_phc)).await??;

        if !matched {
            warn!("Password change rejected for user {}: old password did not match", user.user_id);
            return Err(ErrorCode::OldPasswordNotMatch
                .with_msg("The old password did not match the existing password"))
        }

        policy.validate(&request.new_password)?;

        // Verifying against each digest in the history is deliberately slow work,
        // as is producing the new digest. Keep it off the async runtime.
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

        let now = ctx.now();
        let expires_at = policy.expires_at(now);

        let update = SecurityUpdate {
            password_hash: Some(new_phc),
            password_history: Some(history::push_history(
                user.password_history.clone(),
                user.password_hash.clone(),
                policy.prevent_reuse_count as usize)),
            password_changed_at: Some(now),
            password_expires_at: Some(expires_at),
            ..SecurityUpdate::default()
        };

        db::user::apply_security_update(&user.user_id, update, ctx.db(), session).await?;

        let entry = SecurityLogEntry::succeeded(
            SecurityAction::Change,
            &user,
            request.actor_user_id.as_deref(),
            &request.client,
            now);
        db::log::append(&entry, ctx.db(), session).await?;

        Ok(PasswordChanged { expires_at })
    })
}
