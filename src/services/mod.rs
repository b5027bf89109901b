mod change_password;
mod complete_reset;
mod ensure_login_allowed;
mod lockout_status;
mod password_expiry;
mod record_failed_login;
mod record_successful_login;
mod request_reset;

use std::sync::Arc;
use chrono::{DateTime, Utc};
use tracing::instrument;
use crate::model::log::ClientInfo;
use crate::model::policy::Policy;
use crate::utils::context::ServiceContext;
use crate::utils::errors::WardenError;

///
/// Change the password on an account whose current password the caller knows.
/// When an administrator changes someone else's password, actor_user_id
/// identifies the administrator for the log.
///
#[derive(Clone)]
pub struct ChangePasswordRequest {
    pub user_id: String,
    pub old_password: String,
    pub new_password: String,
    pub actor_user_id: Option<String>,
    pub client: ClientInfo,
}

#[derive(Clone, Debug)]
pub struct PasswordChanged {
    /// When the new password will expire, or None if the active policy doesn't expire passwords.
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug)]
pub struct ResetRequest {
    pub email: String,
    pub client: ClientInfo,
}

///
/// The outcome of a reset request. When the email doesn't belong to an active
/// account, issued is None and the caller must respond exactly as if a token
/// had been sent - the field exists so the caller can deliver the token, not
/// so it can branch on account existence.
///
#[derive(Clone)]
pub struct ResetRequested {
    pub issued: Option<IssuedReset>,
}

#[derive(Clone)]
pub struct IssuedReset {
    pub user_id: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct CompleteResetRequest {
    pub token: String,
    pub new_password: String,
    pub client: ClientInfo,
}

#[derive(Clone, Debug)]
pub struct LoginAttempt {
    pub user_id: String,
    pub client: ClientInfo,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LockoutStatus {
    pub locked: bool,
    pub locked_until: Option<DateTime<Utc>>,
    pub failed_attempts: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PasswordExpiry {
    pub expired: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

///
/// The public face of the subsystem. Construct one via crate::init and share it
/// freely - it's cheap to clone and safe to use from many tasks at once.
///
#[derive(Clone)]
pub struct AccountSecurityService {
    ctx: Arc<ServiceContext>,
}

impl AccountSecurityService {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        AccountSecurityService { ctx }
    }

    pub fn context(&self) -> &ServiceContext {
        &self.ctx
    }

    #[instrument(name = "change_password", skip(self, request))]
    pub async fn change_password(&self, request: &ChangePasswordRequest) -> Result<PasswordChanged, WardenError> {
        change_password::change_password(&self.ctx, request).await
    }

    #[instrument(name = "request_reset", skip(self, request))]
    pub async fn request_reset(&self, request: &ResetRequest) -> Result<ResetRequested, WardenError> {
        request_reset::request_reset(&self.ctx, request).await
    }

    #[instrument(name = "complete_reset", skip(self, request))]
    pub async fn complete_reset(&self, request: &CompleteResetRequest) -> Result<PasswordChanged, WardenError> {
        complete_reset::complete_reset(&self.ctx, request).await
    }

    #[instrument(name = "record_failed_login", skip(self, request))]
    pub async fn record_failed_login(&self, request: &LoginAttempt) -> Result<LockoutStatus, WardenError> {
        record_failed_login::record_failed_login(&self.ctx, request).await
    }

    #[instrument(name = "record_successful_login", skip(self, request))]
    pub async fn record_successful_login(&self, request: &LoginAttempt) -> Result<(), WardenError> {
        record_successful_login::record_successful_login(&self.ctx, request).await
    }

    ///
    /// Run before verifying a password: rejects attempts against locked
    /// accounts and expired passwords without touching any state.
    ///
    #[instrument(name = "ensure_login_allowed", skip(self))]
    pub async fn ensure_login_allowed(&self, user_id: &str) -> Result<(), WardenError> {
        ensure_login_allowed::ensure_login_allowed(&self.ctx, user_id).await
    }

    #[instrument(name = "lockout_status", skip(self))]
    pub async fn lockout_status(&self, user_id: &str) -> Result<LockoutStatus, WardenError> {
        lockout_status::lockout_status(&self.ctx, user_id).await
    }

    #[instrument(name = "password_expiry", skip(self))]
    pub async fn password_expiry(&self, user_id: &str) -> Result<PasswordExpiry, WardenError> {
        password_expiry::password_expiry(&self.ctx, user_id).await
    }

    ///
    /// The policy every operation is currently enforcing. Served from the cache,
    /// so briefly stale after an administrative change.
    ///
    pub async fn active_policy(&self) -> Result<Policy, WardenError> {
        self.ctx.active_policy().await
    }
}
