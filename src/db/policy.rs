use mongodb::{Database, bson::doc};
use crate::db::prelude::*;
use crate::model::policy::Policy;
use crate::utils::errors::{ErrorCode, WardenError};

///
/// Load the single active policy. Anything other than exactly one active policy
/// is an operational misconfiguration and the caller's operation must fail.
///
pub async fn load_active(db: &Database) -> Result<Policy, WardenError> {
    let policies = db.collection::<Policy>(POLICIES);
    let filter = doc! { ACTIVE: true };

    match policies.count_documents(filter.clone(), None).await? {
        0 => Err(ErrorCode::NoActivePolicy
            .with_msg("There is no active password policy")),
        1 => {
            policies.find_one(filter, None)
                .await?
                .ok_or_else(|| ErrorCode::NoActivePolicy
                    .with_msg("The active password policy vanished between read attempts"))
        },
        count => Err(ErrorCode::MultipleActivePolicies
            .with_msg(&format!("There are {} active password policies, expected exactly 1", count))),
    }
}
