use std::fs;
use tracing::{debug, info};
use futures::future::BoxFuture;
use mongodb::error::{ErrorKind, UNKNOWN_TRANSACTION_COMMIT_RESULT};
use mongodb::{Client, ClientSession, Database, bson::doc, options::ClientOptions};
use crate::db::prelude::*;
use crate::model::policy::Policy;
use crate::utils::config::Configuration;
use crate::utils::context::ServiceContext;
use crate::utils::errors::{ErrorCode, WardenError};

///
/// Run any schema-like updates against MongoDB that haven't been run yet.
///
pub async fn update_mongo(db: &Database) -> Result<(), WardenError> {
    create_init_indexes(db).await?;
    create_default_policy(db).await?;
    Ok(())
}

async fn create_init_indexes(db: &Database) -> Result<(), WardenError> {
    // Note: the current driver doesn't yet support creating indexes on collections, so the dbcommand must be used instead.
    // https://docs.mongodb.com/manual/reference/command/createIndexes/#createindexes

    db.run_command(doc! { "createIndexes": USERS, "indexes": [
        { "key": { USER_ID: 1 }, "name": "idx_user_id", "unique": true },
        { "key": { EMAIL: 1 }, "name": "idx_email", "unique": true },
        { "key": { PASSWORD_RESET_TOKEN: 1 }, "name": "idx_reset_token", "unique": false }] }, None).await?;

    db.run_command(doc! { "createIndexes": POLICIES, "indexes": [
        { "key": { POLICY_ID: 1 }, "name": "idx_policy_id", "unique": true },
        { "key": { ACTIVE: 1 }, "name": "idx_active", "unique": false }] }, None).await?;

    db.run_command(doc! { "createIndexes": SECURITY_LOG, "indexes": [
        { "key": { USER_ID: 1, TIMESTAMP: 1 }, "name": "idx_user_timestamp", "unique": false }] }, None).await?;

    Ok(())
}

///
/// Seed an active policy with an id of DEFAULT when the collection is empty, so
/// a fresh install can validate passwords before an admin has configured anything.
///
async fn create_default_policy(db: &Database) -> Result<(), WardenError> {
    let policies = db.collection::<Policy>(POLICIES);

    if policies.count_documents(None, None).await? > 0 {
        return Ok(())
    }

    match policies.insert_one(Policy::default(), None).await {
        Ok(_) => Ok(()),
        Err(err) => {
            // Another instance may bootstrap at the same moment.
            match is_duplicate_err(&err) {
                true  => Ok(()),
                false => Err(WardenError::from(err)),
            }
        },
    }
}

///
/// Indicates if the MongoDB error is from a duplicate key violation.
///
pub fn is_duplicate_err(err: &mongodb::error::Error) -> bool {
    let ec = err.clone();
    match *ec.kind {
        ErrorKind::Write(sub_err) => match sub_err {
            mongodb::error::WriteFailure::WriteError(we) => {
                we.code == 11000 /* Duplicate insert */
            },
            _ => false,
        },
        _ => false
    }
}

pub async fn connect(app_name: &str, config: &Configuration) -> Result<(Client, Database), WardenError> {

    let uri = match &config.mongo_credentials {
        Some(filename) => {
            debug!("Loading MongoDB credentials from secrets file {}", filename);

            // Read username and password from a secrets file.
            let credentials = fs::read_to_string(filename)
                .map_err(|err| ErrorCode::UnableToReadCredentials
                    .with_msg(&format!("Unable to read credentials from {}: {}", filename, err)))?;
            let mut credentials = credentials.lines();
            let uri = config.mongo_uri.replace("$USERNAME", credentials.next().unwrap_or_default());
            uri.replace("$PASSWORD", credentials.next().unwrap_or_default())
        },
        None => config.mongo_uri.clone(),
    };

    // Parse the uri now.
    let mut client_options = ClientOptions::parse(&uri).await?;

    // Manually set an option.
    client_options.app_name = Some(app_name.to_string());

    // Get a handle to the deployment.
    let client = Client::with_options(client_options)?;

    info!("Connecting to MongoDB...");

    let db = client.database(&config.db_name);
    ping(&db).await?;

    info!("Connected to MongoDB");
    Ok((client, db))
}

pub async fn ping(db: &Database) -> Result<(), WardenError> {
    db.run_command(doc! { "ping": 1 }, None).await?;
    Ok(())
}

///
/// Run one operation attempt inside a multi-document transaction.
///
/// The account read, the pure checks, the state write and the log write all
/// happen against the same session, so either everything commits or nothing
/// does. Concurrent transactions touching the same account abort with a
/// transient label and the whole attempt is replayed - this is the row-lock
/// equivalent that keeps read-increment-write sequences from losing updates.
///
pub async fn in_transaction<R, T>(
    ctx: &ServiceContext,
    request: &R,
    task: for<'a> fn(&'a ServiceContext, &'a R, &'a mut ClientSession) -> BoxFuture<'a, Result<T, WardenError>>,
) -> Result<T, WardenError> {

    let mut session = ctx.client().start_session(None).await?;

    loop {
        session.start_transaction(None).await?;

        match task(ctx, request, &mut session).await {
            Ok(value) => {
                match commit_with_retry(&mut session).await {
                    Ok(()) => return Ok(value),
                    Err(err) if err.is_transient() => continue,
                    Err(err) => return Err(err),
                }
            },
            Err(err) => {
                // Business rejections and infrastructure failures alike must
                // leave no partial state behind.
                let _ = session.abort_transaction().await;

                if err.is_transient() {
                    continue
                }

                return Err(err)
            },
        }
    }
}

///
/// A commit whose outcome is unknown (e.g. the connection dropped after the
/// request went out) is safe to re-issue.
///
async fn commit_with_retry(session: &mut ClientSession) -> Result<(), WardenError> {
    loop {
        match session.commit_transaction().await {
            Ok(()) => return Ok(()),
            Err(err) if err.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT) => {
                tracing::warn!("Transaction commit result unknown, retrying the commit");
                continue
            },
            Err(err) => return Err(WardenError::from(err)),
        }
    }
}
