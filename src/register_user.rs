//! This file defines the route handler for registering a new user.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    AppState, Error,
    password::{HASH_COST, PasswordHash},
    user::create_user,
};

/// The request body for registering a new user.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    /// The name the new user will log in with.
    pub username: String,
    /// The new user's raw password.
    pub password: String,
}

/// A route handler for registering a new user.
///
/// The password is stored only as a salted hash. Nothing sensitive is echoed
/// back on success.
///
/// # Errors
///
/// This function will return an error in a few situations.
/// - The username is empty.
/// - The username is already registered.
/// - An internal error occurred when hashing the password or inserting the
///   user.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn post_register_user(
    State(state): State<AppState>,
    Json(form): Json<RegisterForm>,
) -> Result<Json<Value>, Error> {
    if form.username.trim().is_empty() {
        return Err(Error::EmptyUsername);
    }

    let password_hash = PasswordHash::from_raw_password(&form.password, HASH_COST).map_err(
        |error| {
            tracing::error!("Error hashing password: {}", error);
            error
        },
    )?;

    let connection = state.db_connection().lock().unwrap();
    create_user(&form.username, password_hash, &connection)?;

    Ok(Json(json!({
        "message": "Registration successful",
    })))
}

#[cfg(test)]
mod register_user_tests {
    use axum::{Router, http::StatusCode, routing::post};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{AppState, endpoints, user::get_user_by_username};

    use super::post_register_user;

    fn get_test_state() -> AppState {
        let db_connection =
            Connection::open_in_memory().expect("Could not open database in memory.");

        AppState::new(db_connection, "foobar").expect("Could not create app state.")
    }

    fn get_test_server(state: AppState) -> TestServer {
        let app = Router::new()
            .route(endpoints::SIGN_UP, post(post_register_user))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn register_user_stores_a_hashed_password() {
        let state = get_test_state();
        let server = get_test_server(state.clone());

        server
            .post(endpoints::SIGN_UP)
            .json(&json!({
                "username": "alice",
                "password": "averysafeandsecurepassword",
            }))
            .await
            .assert_status_ok();

        let user = get_user_by_username("alice", &state.db_connection().lock().unwrap()).unwrap();

        assert_ne!(user.password_hash.as_ref(), "averysafeandsecurepassword");
        assert!(user.password_hash.verify("averysafeandsecurepassword").unwrap());
    }

    #[tokio::test]
    async fn register_user_rejects_an_empty_username() {
        let server = get_test_server(get_test_state());

        server
            .post(endpoints::SIGN_UP)
            .json(&json!({
                "username": "",
                "password": "averysafeandsecurepassword",
            }))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn register_user_rejects_a_duplicate_username_as_conflict() {
        let server = get_test_server(get_test_state());

        let body = json!({
            "username": "alice",
            "password": "averysafeandsecurepassword",
        });

        server.post(endpoints::SIGN_UP).json(&body).await.assert_status_ok();
        server
            .post(endpoints::SIGN_UP)
            .json(&body)
            .await
            .assert_status(StatusCode::CONFLICT);
    }
}
