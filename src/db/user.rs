use mongodb::{ClientSession, Database, bson::doc};
use crate::db::prelude::*;
use crate::model::user::{SecurityUpdate, User};
use crate::utils::errors::{ErrorCode, WardenError};

///
/// Load a user outside any transaction - for read-only status checks.
///
pub async fn load(user_id: &str, db: &Database) -> Result<User, WardenError> {
    db.collection::<User>(USERS)
        .find_one(doc!{ USER_ID: user_id }, None)
        .await?
        .ok_or_else(|| not_found(user_id))
}

///
/// Load a user within the session so the read participates in the caller's
/// transaction and conflicting writers are detected at commit.
///
pub async fn load_for_update(user_id: &str, db: &Database, session: &mut ClientSession)
    -> Result<User, WardenError> {

    db.collection::<User>(USERS)
        .find_one_with_session(doc!{ USER_ID: user_id }, None, session)
        .await?
        .ok_or_else(|| not_found(user_id))
}

///
/// Look up an active account by email address. None is not an error here - the
/// reset flow must not reveal whether an email is registered.
///
pub async fn find_active_by_email(email: &str, db: &Database, session: &mut ClientSession)
    -> Result<Option<User>, WardenError> {

    let user = db.collection::<User>(USERS)
        .find_one_with_session(doc!{ EMAIL: email, ACTIVE: true }, None, session)
        .await?;
    Ok(user)
}

///
/// Look up the account holding this reset token. Expiry is checked by the
/// caller against the service clock, not here.
///
pub async fn find_by_reset_token(token: &str, db: &Database, session: &mut ClientSession)
    -> Result<Option<User>, WardenError> {

    let user = db.collection::<User>(USERS)
        .find_one_with_session(doc!{ PASSWORD_RESET_TOKEN: token }, None, session)
        .await?;
    Ok(user)
}

///
/// Apply a partial update to the user's security fields within the transaction.
///
pub async fn apply_security_update(user_id: &str, update: SecurityUpdate, db: &Database, session: &mut ClientSession)
    -> Result<(), WardenError> {

    let result = db.collection::<User>(USERS)
        .update_one_with_session(doc!{ USER_ID: user_id }, update.into_document(), None, session)
        .await?;

    if result.matched_count == 0 {
        return Err(not_found(user_id))
    }

    Ok(())
}

fn not_found(user_id: &str) -> WardenError {
    ErrorCode::UserNotFound.with_msg(&format!("User {} does not exist", user_id))
}
