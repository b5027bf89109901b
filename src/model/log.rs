use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use crate::model::user::User;
use crate::utils;

///
/// Request metadata recorded against every security event.
///
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Clone, Copy, Debug, Deserialize, Display, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SecurityAction {
    Login,
    FailedLogin,
    Change,
    ResetRequested,
    ResetCompleted,
}

///
/// One row in the append-only security log. Entries are written in the same
/// transaction as the state change they document and are never updated or
/// deleted by this subsystem.
///
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SecurityLogEntry {
    pub log_id: String,
    pub user_id: String,
    pub username: String,
    pub action: SecurityAction,
    pub actor_user_id: Option<String>, // Present when an admin acted on someone else's account.
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub success: bool,
    pub failure_reason: Option<String>,
    pub timestamp: bson::DateTime,
}

impl SecurityLogEntry {
    pub fn succeeded(action: SecurityAction, user: &User, actor_user_id: Option<&str>, client: &ClientInfo, now: DateTime<Utc>) -> Self {
        SecurityLogEntry {
            log_id: utils::generate_id(),
            user_id: user.user_id.clone(),
            username: user.username.clone(),
            action,
            actor_user_id: actor_user_id.map(str::to_string),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
            success: true,
            failure_reason: None,
            timestamp: bson::DateTime::from_chrono(now),
        }
    }

    pub fn failed(action: SecurityAction, user: &User, reason: &str, client: &ClientInfo, now: DateTime<Utc>) -> Self {
        SecurityLogEntry {
            log_id: utils::generate_id(),
            user_id: user.user_id.clone(),
            username: user.username.clone(),
            action,
            actor_user_id: None,
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
            success: false,
            failure_reason: Some(reason.to_string()),
            timestamp: bson::DateTime::from_chrono(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actions_serialise_to_snake_case() {
        // The log collection is read by external reporting - the wire names are a contract.
        assert_eq!(serde_json::to_string(&SecurityAction::FailedLogin).unwrap(), "\"failed_login\"");
        assert_eq!(serde_json::to_string(&SecurityAction::ResetRequested).unwrap(), "\"reset_requested\"");
        assert_eq!(serde_json::to_string(&SecurityAction::ResetCompleted).unwrap(), "\"reset_completed\"");
        assert_eq!(serde_json::to_string(&SecurityAction::Login).unwrap(), "\"login\"");
        assert_eq!(serde_json::to_string(&SecurityAction::Change).unwrap(), "\"change\"");
    }
}
