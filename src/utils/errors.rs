use bcrypt::BcryptError;
use config::ConfigError;
use tokio::task::JoinError;
use mongodb::error::TRANSIENT_TRANSACTION_ERROR;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ErrorCode {
    HashThreadingIssue        = 401,
    UnableToReadCredentials   = 500,
    InvalidConfiguration      = 501,
    MongoDBError              = 503,
    InvalidBSON               = 504,
    InvalidJSON               = 505,
    InvalidAlgorithmConfig    = 508,
    HashingError              = 509,
    InvalidPHCFormat          = 510,
    UnknownAlgorithmVariant   = 511,
    TransientConflict         = 512,
    NoActivePolicy            = 1001,
    MultipleActivePolicies    = 1002,
    PasswordTooShort          = 2002,
    MissingUppercase          = 2003,
    MissingLowercase          = 2004,
    MissingNumbers            = 2005,
    MissingSymbols            = 2006,
    PasswordUsedBefore        = 2012,
    UserNotFound              = 2101,
    AccountLocked             = 2102,
    OldPasswordNotMatch       = 2103,
    PasswordExpired           = 2104,
    InvalidResetToken         = 2200,
}

///
/// The coarse classification callers use to map a failure onto their own surface
/// (the HTTP layer talks 4xx/5xx) without inspecting the message text.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ErrorKind {
    /// The request was rejected by the active policy - recoverable by the end user.
    Validation,
    /// The caller could not prove what it needed to (wrong password, bad token, locked account).
    Authorization,
    /// An id passed by the caller doesn't exist - an invariant violation, not a user condition.
    NotFound,
    /// The store holds no usable policy - an operational misconfiguration, fatal to the operation.
    Configuration,
    /// Infrastructure trouble - the operation rolled back and may be retried.
    Internal,
}

impl ErrorCode {
    pub fn with_msg(&self, message: &str) -> WardenError {
        WardenError::new(*self, message)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WardenError {
    error_code: ErrorCode,
    message: String,
}

impl WardenError {
    pub fn new(error_code: ErrorCode, message: &str) -> Self {
        WardenError { error_code, message: message.to_string() }
    }

    pub fn error_code(&self) -> ErrorCode {
        self.error_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    ///
    /// Classify this error so the caller can distinguish 'rejected for a known
    /// business reason' from 'failed due to infrastructure'.
    ///
    pub fn kind(&self) -> ErrorKind {
        use ErrorCode::*;

        match &self.error_code {
            HashThreadingIssue      |
            UnableToReadCredentials |
            InvalidConfiguration    |
            MongoDBError            |
            InvalidBSON             |
            InvalidJSON             |
            InvalidAlgorithmConfig  |
            HashingError            |
            InvalidPHCFormat        |
            UnknownAlgorithmVariant |
            TransientConflict => ErrorKind::Internal,

            NoActivePolicy         |
            MultipleActivePolicies => ErrorKind::Configuration,

            PasswordTooShort  |
            MissingUppercase  |
            MissingLowercase  |
            MissingNumbers    |
            MissingSymbols    |
            PasswordUsedBefore => ErrorKind::Validation,

            AccountLocked       |
            OldPasswordNotMatch |
            PasswordExpired     |
            InvalidResetToken => ErrorKind::Authorization,

            UserNotFound => ErrorKind::NotFound,
        }
    }

    ///
    /// Transient write conflicts are retried by the transaction driver rather
    /// than surfaced to the caller.
    ///
    pub fn is_transient(&self) -> bool {
        self.error_code == ErrorCode::TransientConflict
    }
}

impl std::fmt::Display for WardenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.error_code, self.message)
    }
}

impl std::error::Error for WardenError {}

impl From<mongodb::error::Error> for WardenError {
    fn from(error: mongodb::error::Error) -> Self {
        // Concurrent transactions on the same account abort with this label.
        if error.contains_label(TRANSIENT_TRANSACTION_ERROR) {
            return ErrorCode::TransientConflict.with_msg(&format!("Transaction write conflict: {}", error))
        }

        ErrorCode::MongoDBError.with_msg(&format!("MongoDB error: {}", error))
    }
}

impl From<ConfigError> for WardenError {
    fn from(error: ConfigError) -> Self {
        ErrorCode::InvalidConfiguration.with_msg(&format!("The service configuration is not correct: {}", error))
    }
}

impl From<argon2::Error> for WardenError {
    fn from(error: argon2::Error) -> Self {
        ErrorCode::InvalidAlgorithmConfig.with_msg(&format!("Invalid configuration for algorithm: {}", error))
    }
}

impl From<password_hash::Error> for WardenError {
    fn from(error: password_hash::Error) -> Self {
        ErrorCode::HashingError.with_msg(&format!("Unable to hash password: {}", error))
    }
}

impl From<serde_json::Error> for WardenError {
    fn from(error: serde_json::Error) -> Self {
        ErrorCode::InvalidJSON.with_msg(&format!("Unable to convert to json: {}", error))
    }
}

impl From<bson::ser::Error> for WardenError {
    fn from(error: bson::ser::Error) -> Self {
        ErrorCode::InvalidBSON.with_msg(&format!("Unable to serialise BSON: {}", error))
    }
}

impl From<JoinError> for WardenError {
    fn from(error: JoinError) -> Self {
        ErrorCode::HashThreadingIssue.with_msg(&format!("Unable to hash: {}", error))
    }
}

impl From<BcryptError> for WardenError {
    fn from(error: BcryptError) -> Self {
        ErrorCode::InvalidAlgorithmConfig.with_msg(&format!("Unable to verify: {}", error))
    }
}
