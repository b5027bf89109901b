use chrono::{DateTime, Utc};
use bson::Document;
use serde::{Deserialize, Serialize};
use crate::db::prelude::*;

///
/// The slice of the user document this subsystem owns: the digest, the bounded
/// reuse history, the failed-login/lockout counters and the reset-token fields.
/// Identity fields (username, email, active) are maintained elsewhere and only
/// read here.
///
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub active: bool,
    pub password_hash: String,
    #[serde(default)]
    pub password_history: Vec<String>, // Oldest first, bounded to the policy's prevent_reuse_count.
    pub password_changed_at: bson::DateTime,
    #[serde(default)]
    pub password_expires_at: Option<bson::DateTime>,
    #[serde(default)]
    pub failed_login_attempts: u32,
    #[serde(default)]
    pub account_locked_until: Option<bson::DateTime>,
    #[serde(default)]
    pub password_reset_token: Option<String>,
    #[serde(default)]
    pub password_reset_expires_at: Option<bson::DateTime>,
    #[serde(default)]
    pub last_login: Option<bson::DateTime>,
}

impl User {
    ///
    /// Locked-ness is computed at read time - the lock fields are only cleared
    /// by a successful login, never eagerly on expiry.
    ///
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        match self.account_locked_until {
            Some(until) => {
                let until: DateTime<Utc> = until.into();
                until > now
            },
            None => false,
        }
    }

    pub fn locked_until(&self) -> Option<DateTime<Utc>> {
        self.account_locked_until.map(|until| until.into())
    }
}

///
/// A partial update to the account's security fields. Only the fields that are
/// present are applied; the inner Option distinguishes setting a value from
/// clearing the field altogether.
///
#[derive(Clone, Debug, Default)]
pub struct SecurityUpdate {
    pub password_hash: Option<String>,
    pub password_history: Option<Vec<String>>,
    pub password_changed_at: Option<DateTime<Utc>>,
    pub password_expires_at: Option<Option<DateTime<Utc>>>,
    pub failed_login_attempts: Option<u32>,
    pub account_locked_until: Option<Option<DateTime<Utc>>>,
    pub password_reset_token: Option<Option<String>>,
    pub password_reset_expires_at: Option<Option<DateTime<Utc>>>,
    pub last_login: Option<DateTime<Utc>>,
}

impl SecurityUpdate {
    ///
    /// Build the MongoDB update document. Present fields land in $set, fields
    /// explicitly cleared land in $unset, absent fields are left untouched.
    ///
    pub fn into_document(self) -> Document {
        let mut set = Document::new();
        let mut unset = Document::new();

        if let Some(phc) = self.password_hash {
            set.insert(PASSWORD_HASH, phc);
        }

        if let Some(history) = self.password_history {
            set.insert(PASSWORD_HISTORY, history);
        }

        if let Some(changed_at) = self.password_changed_at {
            set.insert(PASSWORD_CHANGED_AT, bson::DateTime::from_chrono(changed_at));
        }

        if let Some(expires_at) = self.password_expires_at {
            match expires_at {
                Some(expires_at) => { set.insert(PASSWORD_EXPIRES_AT, bson::DateTime::from_chrono(expires_at)); },
                None => { unset.insert(PASSWORD_EXPIRES_AT, ""); },
            }
        }

        if let Some(attempts) = self.failed_login_attempts {
            set.insert(FAILED_LOGIN_ATTEMPTS, attempts as i64);
        }

        if let Some(locked_until) = self.account_locked_until {
            match locked_until {
                Some(locked_until) => { set.insert(ACCOUNT_LOCKED_UNTIL, bson::DateTime::from_chrono(locked_until)); },
                None => { unset.insert(ACCOUNT_LOCKED_UNTIL, ""); },
            }
        }

        if let Some(token) = self.password_reset_token {
            match token {
                Some(token) => { set.insert(PASSWORD_RESET_TOKEN, token); },
                None => { unset.insert(PASSWORD_RESET_TOKEN, ""); },
            }
        }

        if let Some(reset_expires_at) = self.password_reset_expires_at {
            match reset_expires_at {
                Some(reset_expires_at) => { set.insert(PASSWORD_RESET_EXPIRES_AT, bson::DateTime::from_chrono(reset_expires_at)); },
                None => { unset.insert(PASSWORD_RESET_EXPIRES_AT, ""); },
            }
        }

        if let Some(last_login) = self.last_login {
            set.insert(LAST_LOGIN, bson::DateTime::from_chrono(last_login));
        }

        let mut update = Document::new();
        if !set.is_empty() {
            update.insert("$set", set);
        }
        if !unset.is_empty() {
            update.insert("$unset", unset);
        }

        update
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_fields_are_left_untouched() {
        let update = SecurityUpdate {
            failed_login_attempts: Some(2),
            ..SecurityUpdate::default()
        };

        let doc = update.into_document();
        let set = doc.get_document("$set").unwrap();

        assert_eq!(set.get_i64(FAILED_LOGIN_ATTEMPTS).unwrap(), 2);
        assert_eq!(set.len(), 1);
        assert!(doc.get_document("$unset").is_err());
    }

    #[test]
    fn test_clearing_a_field_lands_in_unset() {
        let update = SecurityUpdate {
            failed_login_attempts: Some(0),
            account_locked_until: Some(None),
            last_login: Some(Utc::now()),
            ..SecurityUpdate::default()
        };

        let doc = update.into_document();

        let set = doc.get_document("$set").unwrap();
        assert!(set.contains_key(FAILED_LOGIN_ATTEMPTS));
        assert!(set.contains_key(LAST_LOGIN));

        let unset = doc.get_document("$unset").unwrap();
        assert!(unset.contains_key(ACCOUNT_LOCKED_UNTIL));
    }

    #[test]
    fn test_setting_a_clearable_field_lands_in_set() {
        let update = SecurityUpdate {
            password_reset_token: Some(Some("token".to_string())),
            password_reset_expires_at: Some(Some(Utc::now())),
            ..SecurityUpdate::default()
        };

        let doc = update.into_document();
        let set = doc.get_document("$set").unwrap();

        assert_eq!(set.get_str(PASSWORD_RESET_TOKEN).unwrap(), "token");
        assert!(set.contains_key(PASSWORD_RESET_EXPIRES_AT));
        assert!(doc.get_document("$unset").is_err());
    }

    #[test]
    fn test_lockedness_is_computed_against_the_supplied_clock() {
        let now: DateTime<Utc> = "2026-03-01T12:00:00Z".parse().unwrap();
        let mut user = fixture(now);

        assert!(!user.is_locked(now));

        user.account_locked_until = Some(bson::DateTime::from_chrono(now + chrono::Duration::minutes(15)));
        assert!(user.is_locked(now));

        // The lock is advisory once the window has passed - only a successful
        // login clears the field, but the account no longer reads as locked.
        assert!(!user.is_locked(now + chrono::Duration::minutes(16)));
    }

    fn fixture(now: DateTime<Utc>) -> User {
        User {
            user_id: "u-1".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            active: true,
            password_hash: "$2b$04$abcdefghijklmnopqrstuv".to_string(),
            password_history: vec![],
            password_changed_at: bson::DateTime::from_chrono(now),
            password_expires_at: None,
            failed_login_attempts: 0,
            account_locked_until: None,
            password_reset_token: None,
            password_reset_expires_at: None,
            last_login: None,
        }
    }
}
