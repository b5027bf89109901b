pub mod log;
pub mod mongo;
pub mod policy;
pub mod user;

pub mod prelude {
    // Collection names.
    pub const POLICIES:     &str = "Policies";
    pub const USERS:        &str = "Users";
    pub const SECURITY_LOG: &str = "SecurityLog";

    // Field names.
    pub const ACTIVE:                    &str = "active";
    pub const POLICY_ID:                 &str = "policy_id";
    pub const USER_ID:                   &str = "user_id";
    pub const EMAIL:                     &str = "email";
    pub const PASSWORD_HASH:             &str = "password_hash";
    pub const PASSWORD_HISTORY:          &str = "password_history";
    pub const PASSWORD_CHANGED_AT:       &str = "password_changed_at";
    pub const PASSWORD_EXPIRES_AT:       &str = "password_expires_at";
    pub const FAILED_LOGIN_ATTEMPTS:     &str = "failed_login_attempts";
    pub const ACCOUNT_LOCKED_UNTIL:      &str = "account_locked_until";
    pub const PASSWORD_RESET_TOKEN:      &str = "password_reset_token";
    pub const PASSWORD_RESET_EXPIRES_AT: &str = "password_reset_expires_at";
    pub const LAST_LOGIN:                &str = "last_login";
    pub const TIMESTAMP:                 &str = "timestamp";
}
