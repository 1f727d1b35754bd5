//! Defines the app level error type and its conversion to JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The username used to log in does not belong to a registered user.
    #[error("no user with the given username exists")]
    UserNotFound,

    /// The password supplied at log in does not match the stored hash.
    #[error("wrong password")]
    InvalidCredentials,

    /// An empty string was used to register a user.
    #[error("username cannot be empty")]
    EmptyUsername,

    /// The username used to register a user already exists in the database.
    ///
    /// Usernames are unique, the client should try again with a different
    /// username.
    #[error("the username already exists in the database")]
    DuplicateUsername,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// An access token could not be signed.
    ///
    /// The cause should only be logged for debugging on the server.
    #[error("could not create an access token")]
    TokenCreation,

    /// An invalid calendar date was given, e.g. a month outside 1-12.
    #[error("{0}")]
    InvalidDate(String),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to update an entry that does not exist
    #[error("tried to update an entry that is not in the database")]
    UpdateMissingEntry,

    /// Tried to delete an entry that does not exist
    #[error("tried to delete an entry that is not in the database")]
    DeleteMissingEntry,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("user.username") =>
            {
                Error::DuplicateUsername
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status_code, message) = match self {
            Error::UserNotFound => (StatusCode::NOT_FOUND, "User not found".to_owned()),
            Error::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Wrong password".to_owned()),
            Error::EmptyUsername => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Username cannot be empty".to_owned(),
            ),
            Error::DuplicateUsername => {
                (StatusCode::CONFLICT, "Username is already taken".to_owned())
            }
            Error::InvalidDate(description) => (StatusCode::BAD_REQUEST, description),
            Error::NotFound | Error::UpdateMissingEntry | Error::DeleteMissingEntry => {
                (StatusCode::NOT_FOUND, "Entry not found".to_owned())
            }
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_owned(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status_code, body).into_response()
    }
}
