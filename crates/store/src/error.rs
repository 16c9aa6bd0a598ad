use {
    aula_common::{FromMessage, UserId},
    chrono::NaiveDate,
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("user {user} is not registered")]
    NotRegistered { user: UserId },

    #[error("{what} is already registered")]
    AlreadyRegistered { what: String },

    #[error("activity for {activity} was already submitted")]
    AlreadySubmitted { activity: NaiveDate },

    #[error("{what} already exists")]
    AlreadyExists { what: String },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_registered(user: &UserId) -> Self {
        Self::NotRegistered { user: user.clone() }
    }

    #[must_use]
    pub fn already_registered(what: impl Into<String>) -> Self {
        Self::AlreadyRegistered { what: what.into() }
    }

    #[must_use]
    pub fn already_exists(what: impl Into<String>) -> Self {
        Self::AlreadyExists { what: what.into() }
    }

    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

aula_common::impl_context!();
