//! This file defines the route handler for logging in a user.
//! The auth module handles the lower level token creation and verification.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    auth::create_token,
    user::{UserID, get_user_by_username},
};

/// The request body for log-in requests.
#[derive(Debug, Deserialize)]
pub struct LogInData {
    /// The username entered at log in.
    pub username: String,
    /// The password entered at log in.
    pub password: String,
}

/// The response body for a successful log in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogInResponse {
    /// A signed access token for the logged in user.
    pub token: String,
    /// The ID of the logged in user.
    pub user_id: UserID,
}

/// Handler for log-in requests via the POST method.
///
/// On success the response holds a signed access token and the user's ID.
///
/// # Errors
///
/// This function will return an error in a few situations.
/// - The username does not belong to a registered user (404).
/// - The password is not correct (401).
/// - An internal error occurred when verifying the password or signing the
///   token.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn post_log_in(
    State(state): State<AppState>,
    Json(user_data): Json<LogInData>,
) -> Result<Json<LogInResponse>, Error> {
    let user = {
        let connection = state.db_connection().lock().unwrap();

        match get_user_by_username(&user_data.username, &connection) {
            Ok(user) => user,
            Err(Error::NotFound) => return Err(Error::UserNotFound),
            Err(error) => {
                tracing::error!("Unhandled error while looking up user: {}", error);
                return Err(error);
            }
        }
    };

    let is_password_valid = user.password_hash.verify(&user_data.password).map_err(|error| {
        tracing::error!("Error verifying password: {}", error);
        Error::HashingError(error.to_string())
    })?;

    if !is_password_valid {
        return Err(Error::InvalidCredentials);
    }

    let token = create_token(user.id, &user.username, state.encoding_key())?;

    Ok(Json(LogInResponse {
        token,
        user_id: user.id,
    }))
}
