use futures::future::BoxFuture;
use mongodb::ClientSession;
use crate::db::{self, mongo};
use crate::model::log::{SecurityAction, SecurityLogEntry};
use crate::model::user::SecurityUpdate;
use crate::services::LoginAttempt;
use crate::utils::context::ServiceContext;
use crate::utils::errors::WardenError;

///
/// Record a successful authentication. This is the only operation that resets
/// the failure counter and clears the lock.
///
pub async fn record_successful_login(ctx: &ServiceContext, request: &LoginAttempt)
    -> Result<(), WardenError> {

    mongo::in_transaction(ctx, request, attempt).await
}

fn attempt<'a>(ctx: &'a ServiceContext, request: &'a LoginAttempt, session: &'a mut ClientSession)
    -> BoxFuture<'a, Result<(), WardenError>> {

    Box::pin(async move {
        let _ = ctx.active_policy().await?;
        let user = db::user::load_for_update(&request.user_id, ctx.db(), session).await?;

        let now = ctx.now();

        let update = SecurityUpdate {
            failed_login_attempts: Some(0),
            account_locked_until: Some(None),
            last_login: Some(now),
            ..SecurityUpdate::default()
        };

        db::user::apply_security_update(&user.user_id, update, ctx.db(), session).await?;

        let entry = SecurityLogEntry::succeeded(
            SecurityAction::Login,
            &user,
            None,
            &request.client,
            now);
        db::log::append(&entry, ctx.db(), session).await?;

        Ok(())
    })
}
