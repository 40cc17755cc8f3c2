use postbox_db::StoreError;
use thiserror::Error;

/// Typed failures crossing the core boundary. The API layer maps each
/// variant to a transport status code; no framework types leak through here.
#[derive(Debug, Error)]
pub enum Error {
    /// No account matches the given email.
    #[error("no account for that email")]
    NotFound,

    /// The caller holds no delivery record for the target message.
    #[error("no delivery record for this message")]
    RecordNotFound,

    /// Every recipient failed to resolve (or none were given). The transient
    /// message has already been cleaned up when this is returned.
    #[error("no valid recipients")]
    NoValidRecipients { failed: Vec<String> },

    #[error("email already registered")]
    DuplicateEmail,

    #[error("username already taken")]
    DuplicateUsername,

    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// Transient storage failure; callers retry with backoff, this layer
    /// never does.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Error::StoreUnavailable(err.to_string())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::StoreUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
