pub mod db;
pub mod model;
pub mod services;
pub mod utils;

use std::sync::Arc;
use dotenv::dotenv;
use db::mongo;
use utils::config;
use utils::context::ServiceContext;
use tracing_subscriber::{prelude::__tracing_subscriber_SubscriberExt, Registry, util::SubscriberInitExt};

pub use model::log::{ClientInfo, SecurityAction, SecurityLogEntry};
pub use model::policy::Policy;
pub use model::user::User;
pub use services::{AccountSecurityService, ChangePasswordRequest, CompleteResetRequest, IssuedReset,
    LockoutStatus, LoginAttempt, PasswordChanged, PasswordExpiry, ResetRequest, ResetRequested};
pub use utils::config::Configuration;
pub use utils::errors::{ErrorCode, ErrorKind, WardenError};

const APP_NAME: &str = "Warden";

///
/// Connect to the store and build the service from environment configuration.
///
/// Loads any local dev settings from a .env file first.
///
pub async fn init() -> Result<AccountSecurityService, WardenError> {
    dotenv().ok();

    let config = Configuration::from_env()?;
    init_with_config(config).await
}

///
/// Connect to the store with the given configuration, bring the collections and
/// indexes up to date, and fail fast if there's no usable active policy.
///
pub async fn init_with_config(config: Configuration) -> Result<AccountSecurityService, WardenError> {

    tracing::info!("Starting {} with config:\n{}", APP_NAME, config.fmt_console()?);

    let (client, db) = mongo::connect(APP_NAME, &config).await?;

    // Ensure the schema is in sync with the code.
    mongo::update_mongo(&db).await?;

    let ctx = Arc::new(ServiceContext::new(config, client, db));

    // Every operation needs exactly one active policy - refuse to start without one.
    let _ = ctx.active_policy().await?;

    Ok(AccountSecurityService::new(ctx))
}

///
/// Initialise console tracing for embedders that haven't installed their own subscriber.
///
pub fn init_tracing() {
    // Default log level to INFO if it's not specified.
    config::default_env("RUST_LOG", "INFO");

    if let Err(err) = Registry::default()
        .with(tracing_subscriber::EnvFilter::from_default_env()) // Set the tracing level to match RUST_LOG env variable.
        .with(tracing_subscriber::fmt::layer().with_test_writer().with_ansi(true))
        .try_init() {
            tracing::info!("Tracing already initialised: {}", err.to_string()); // Allowed error here - tests call this fn repeatedly.
    }
}
