use std::time::{Duration, Instant};
use chrono::{DateTime, Utc};
use mongodb::{Client, Database};
use parking_lot::RwLock;
use crate::db;
use crate::model::policy::Policy;
use crate::utils::{config::Configuration, errors::WardenError, time_provider::TimeProvider};

///
/// The context is available to every operation and gives it access to the DB,
/// the cached active policy, config and the clock.
///
pub struct ServiceContext {
    client: Client,
    db: Database,
    config: Configuration,
    active_policy: RwLock<Option<CachedPolicy>>,
    time_provider: RwLock<TimeProvider>,
}

struct CachedPolicy {
    policy: Policy,
    loaded_at: Instant,
}

impl ServiceContext {
    pub fn new(config: Configuration, client: Client, db: Database) -> Self {
        ServiceContext {
            client,
            db,
            config,
            active_policy: RwLock::new(None),
            time_provider: RwLock::new(TimeProvider::default()),
        }
    }

    ///
    /// Return the active password policy, re-reading it from the store when the
    /// cached copy is older than the configured TTL.
    ///
    /// Policy changes are rare administrative actions - staleness of a few
    /// seconds is acceptable, a missing or ambiguous active policy is not.
    ///
    pub async fn active_policy(&self) -> Result<Policy, WardenError> {
        let ttl = Duration::from_secs(self.config.policy_cache_seconds);

        {
            let cached = self.active_policy.read();
            if let Some(cached) = cached.as_ref() {
                if cached.loaded_at.elapsed() < ttl {
                    return Ok(cached.policy.clone())
                }
            }
        } // Don't hold the read lock over the db round-trip below.

        let policy = db::policy::load_active(&self.db).await?;
        *self.active_policy.write() = Some(CachedPolicy { policy: policy.clone(), loaded_at: Instant::now() });

        Ok(policy)
    }

    ///
    /// Drop the in-memory policy so the next operation re-reads it.
    ///
    pub fn invalidate_policy_cache(&self) {
        *self.active_policy.write() = None;
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.time_provider.read().now()
    }

    ///
    /// Set or clear the fixed time - used by tests to travel across lockout and
    /// expiry windows.
    ///
    pub fn set_now(&self, now: Option<DateTime<Utc>>) {
        self.time_provider.write().fix(now);
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }
}
