//! Defines the app level error type and its conversion to JSON error responses.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{envelope::Envelope, validation::ValidationErrors};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// One or more request fields failed validation.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// The request body or query string could not be parsed at all.
    ///
    /// The string is the parser's explanation and is safe to show to clients.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A bulk delete request did not include any IDs.
    #[error("no expense IDs were given")]
    MissingExpenseIds,

    /// The email and password combination does not match a registered user.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The password given to confirm an account change was wrong.
    #[error("incorrect password")]
    IncorrectPassword,

    /// The request did not carry a bearer token.
    #[error("missing bearer token")]
    MissingToken,

    /// The bearer token was malformed, expired, badly signed or belongs to a
    /// user that no longer exists.
    #[error("invalid bearer token")]
    InvalidToken,

    /// Tried to register with an email that is already in use.
    #[error("the email is already registered")]
    DuplicateEmail,

    /// The expense does not exist or belongs to someone else.
    ///
    /// The two cases are indistinguishable to the client.
    #[error("the expense could not be found")]
    ExpenseNotFound,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// A bearer token could not be created.
    #[error("could not create token: {0}")]
    TokenCreation(String),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::InvalidRequest(rejection.body_text())
    }
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_)
            | Error::InvalidRequest(_)
            | Error::MissingExpenseIds
            | Error::DuplicateEmail => StatusCode::BAD_REQUEST,
            Error::InvalidCredentials
            | Error::IncorrectPassword
            | Error::MissingToken
            | Error::InvalidToken => StatusCode::UNAUTHORIZED,
            Error::ExpenseNotFound | Error::NotFound => StatusCode::NOT_FOUND,
            Error::HashingError(_)
            | Error::TokenCreation(_)
            | Error::InvalidTimezoneError(_)
            | Error::JSONSerializationError(_)
            | Error::SqlError(_)
            | Error::DatabaseLockError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        let envelope = match self {
            Error::Validation(errors) => Envelope::validation_failure(errors.errors()),
            Error::InvalidRequest(reason) => Envelope::failure(reason),
            Error::MissingExpenseIds => Envelope::failure("Please provide expense IDs to delete"),
            Error::InvalidCredentials => Envelope::failure("Invalid credentials"),
            Error::IncorrectPassword => Envelope::failure("Current password is incorrect"),
            Error::MissingToken => Envelope::failure("Not authorized, no token"),
            Error::InvalidToken => Envelope::failure("Not authorized, token failed"),
            Error::DuplicateEmail => Envelope::failure("User already exists with this email"),
            Error::ExpenseNotFound => Envelope::failure("Expense not found"),
            Error::NotFound => Envelope::failure("Resource not found"),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                Envelope::failure("Server error. Try again later or check the server logs.")
            }
        };

        (status_code, envelope).into_response()
    }
}
