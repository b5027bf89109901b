use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use crate::model::algorithm::{Algorithm, ArgonPolicy, BcryptPolicy};
use crate::utils::errors::{ErrorCode, WardenError};

///
/// The password policy governing every account. Exactly one document in the
/// Policies collection carries active = true at any time - this subsystem only
/// reads policies, the admin surface maintains them.
///
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Policy {
    pub policy_id: String,
    pub created_on: bson::DateTime,
    pub active: bool,
    pub min_length: u32,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_numbers: bool,
    pub require_special_chars: bool,
    pub prevent_reuse_count: u32,     // 0 disables reuse checking.
    pub password_expiry_days: u32,    // 0 means passwords never expire.
    pub max_failed_attempts: u32,
    pub lockout_duration_minutes: u32,
    pub algorithm_type: Algorithm,
    pub argon_policy: Option<ArgonPolicy>,
    pub bcrypt_policy: Option<BcryptPolicy>,
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            policy_id: String::from("DEFAULT"),
            created_on: bson::DateTime::from_chrono(Utc::now()),
            active: true,
            min_length: 8,
            require_uppercase: true,
            require_lowercase: true,
            require_numbers: true,
            require_special_chars: true,
            prevent_reuse_count: 5,
            password_expiry_days: 90,
            max_failed_attempts: 5,
            lockout_duration_minutes: 30,
            algorithm_type: Algorithm::Argon,
            argon_policy: Some(ArgonPolicy::default()),
            bcrypt_policy: None,
        }
    }
}

impl Policy {
    ///
    /// Check the plain text password doesn't violate this policy's format.
    ///
    /// The checks run in a fixed order and the first failure wins, so the caller
    /// always gets the most actionable message. Reuse against the account's
    /// history is checked separately.
    ///
    pub fn validate(&self, plain_text_password: &str) -> Result<(), WardenError> {

        if plain_text_password.chars().count() < self.min_length as usize {
            return Err(ErrorCode::PasswordTooShort
                .with_msg(&format!("passwords must be at least {} characters", self.min_length)))
        }

        if self.require_uppercase && !plain_text_password.chars().any(|c| c.is_uppercase()) {
            return Err(ErrorCode::MissingUppercase
                .with_msg("a password must contain at least one uppercase letter"))
        }

        if self.require_lowercase && !plain_text_password.chars().any(|c| c.is_lowercase()) {
            return Err(ErrorCode::MissingLowercase
                .with_msg("a password must contain at least one lowercase letter"))
        }

        if self.require_numbers && !plain_text_password.chars().any(|c| c.is_numeric()) {
            return Err(ErrorCode::MissingNumbers
                .with_msg("a password must contain at least one number"))
        }

        if self.require_special_chars && !plain_text_password.chars().any(|c| !c.is_alphanumeric()) {
            return Err(ErrorCode::MissingSymbols
                .with_msg("a password must contain at least one symbol"))
        }

        Ok(())
    }

    ///
    /// When a password set now would expire, or None when this policy never expires them.
    ///
    pub fn expires_at(&self, changed_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.password_expiry_days {
            0 => None,
            days => Some(changed_at + Duration::days(days as i64)),
        }
    }

    pub fn lockout_duration(&self) -> Duration {
        Duration::minutes(self.lockout_duration_minutes as i64)
    }

    ///
    /// Use the hashing algorithm to hash the password and build a PHC string.
    ///
    /// ref: https://github.com/P-H-C/phc-string-format/blob/master/phc-sf-spec.md
    ///
    pub fn hash_into_phc(&self, plain_text_password: &str) -> Result<String, WardenError> {
        match self.algorithm_type {
            Algorithm::Argon  => self.argon_policy()?.hash_into_phc(plain_text_password),
            Algorithm::BCrypt => self.bcrypt_policy()?.hash_into_phc(plain_text_password),
        }
    }

    fn argon_policy(&self) -> Result<&ArgonPolicy, WardenError> {
        self.argon_policy.as_ref()
            .ok_or_else(|| ErrorCode::InvalidAlgorithmConfig.with_msg("The policy selects argon but has no argon parameters"))
    }

    fn bcrypt_policy(&self) -> Result<&BcryptPolicy, WardenError> {
        self.bcrypt_policy.as_ref()
            .ok_or_else(|| ErrorCode::InvalidAlgorithmConfig.with_msg("The policy selects bcrypt but has no bcrypt parameters"))
    }
}
