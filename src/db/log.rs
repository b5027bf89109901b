use mongodb::{ClientSession, Database};
use crate::db::prelude::*;
use crate::model::log::SecurityLogEntry;
use crate::utils::errors::WardenError;

///
/// Append an entry to the security log within the caller's transaction, so the
/// state change and its audit record commit or roll back together.
///
pub async fn append(entry: &SecurityLogEntry, db: &Database, session: &mut ClientSession)
    -> Result<(), WardenError> {

    db.collection::<SecurityLogEntry>(SECURITY_LOG)
        .insert_one_with_session(entry, None, session)
        .await?;
    Ok(())
}
