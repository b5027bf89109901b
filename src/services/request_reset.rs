use base64::URL_SAFE_NO_PAD;
use chrono::Duration;
use futures::future::BoxFuture;
use mongodb::ClientSession;
use rand::RngCore;
use tracing::info;
use crate::db::{self, mongo};
use crate::model::log::{SecurityAction, SecurityLogEntry};
use crate::model::user::SecurityUpdate;
use crate::services::{IssuedReset, ResetRequest, ResetRequested};
use crate::utils::context::ServiceContext;
use crate::utils::errors::WardenError;

const TOKEN_BYTES: usize = 32;
const TOKEN_TTL_HOURS: i64 = 24;

///
/// Issue a password reset token for the active account behind an email address.
///
/// When no such account exists the request still succeeds with nothing issued -
/// the caller's response must not reveal whether the address is registered.
/// Issuing a new token replaces any outstanding one.
///
pub async fn request_reset(ctx: &ServiceContext, request: &ResetRequest)
    -> Result<ResetRequested, WardenError> {

    mongo::in_transaction(ctx, request, attempt).await
}

fn attempt<'a>(ctx: &'a ServiceContext, request: &'a ResetRequest, session: &'a mut ClientSession)
    -> BoxFuture<'a, Result<ResetRequested, WardenError>> {

    Box::pin(async move {
        // Every operation runs under an active policy, even those that don't consult it.
        let _ = ctx.active_policy().await?;

        let user = match db::user::find_active_by_email(&request.email, ctx.db(), session).await? {
            Some(user) => user,
            None => {
                info!("Password reset requested for an unknown or inactive email");
                return Ok(ResetRequested { issued: None })
            },
        };

        let token = generate_token();
        let expires_at = ctx.now() + Duration::hours(TOKEN_TTL_HOURS);

        let update = SecurityUpdate {
            password_reset_token: Some(Some(token.clone())),
            password_reset_expires_at: Some(Some(expires_at)),
            ..SecurityUpdate::default()
        };

        db::user::apply_security_update(&user.user_id, update, ctx.db(), session).await?;

        let entry = SecurityLogEntry::succeeded(
            SecurityAction::ResetRequested,
            &user,
            None,
            &request.client,
            ctx.now());
        db::log::append(&entry, ctx.db(), session).await?;

        Ok(ResetRequested {
            issued: Some(IssuedReset { user_id: user.user_id, token, expires_at })
        })
    })
}

///
/// 256 bits from the OS-seeded generator, urlsafe-encoded so the token can live
/// in a link without further escaping.
///
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::encode_config(bytes, URL_SAFE_NO_PAD)
}
