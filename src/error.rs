use jsonwebtoken::errors::ErrorKind;
use warp::reject::Reject;

pub type DatabaseError = Box<dyn std::error::Error + Send + Sync>;

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("an account with that username already exists")]
    AlreadyExists,
    #[error("user not found")]
    NotFound,
    #[error("username or password incorrect")]
    InvalidCredentials,
    #[error("missing {0}")]
    MissingInput(&'static str),
    #[error("invalid token")]
    Unauthenticated,
    #[error("token expired or invalid")]
    InvalidToken,
    #[error("error during database operation")]
    DatabaseError {
        #[from]
        source: DatabaseError,
    },
    #[error("error while hashing password")]
    HashingError {
        #[from]
        source: argon2::Error,
    },
    #[error("error while signing token")]
    SigningError {
        #[from]
        source: jsonwebtoken::errors::Error,
    },
    #[error("background task failed")]
    TaskError {
        #[from]
        source: tokio::task::JoinError,
    },
}

impl AuthError {
    /// True for failures the caller cannot fix by changing its request.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::DatabaseError { .. }
                | AuthError::HashingError { .. }
                | AuthError::SigningError { .. }
                | AuthError::TaskError { .. }
        )
    }
}

impl Reject for AuthError {}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature does not match")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token could not be decoded")]
    Malformed,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}
