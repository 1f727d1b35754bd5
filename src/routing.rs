//! Application router configuration with protected and unprotected route definitions.
//!
//! Protected handlers take a [crate::auth::Claims] argument, so token
//! verification runs as an extractor before each handler body executes.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use crate::{
    AppState,
    auth::{get_authenticate, post_log_out},
    dashboard::{get_dashboard_data, get_recent_entries_endpoint},
    endpoints,
    entry::{
        create_entry_endpoint, delete_entry_endpoint, get_entries_by_month_endpoint,
        get_entries_endpoint, get_entry_endpoint, update_entry_endpoint,
    },
    log_in::post_log_in,
    register_user::post_register_user,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::ROOT, get(get_welcome))
        .route(endpoints::SIGN_UP, post(post_register_user))
        .route(endpoints::LOG_IN, post(post_log_in));

    let protected_routes = Router::new()
        .route(endpoints::AUTHENTICATE, get(get_authenticate))
        .route(endpoints::LOG_OUT, post(post_log_out))
        .route(endpoints::DASHBOARD_DATA, get(get_dashboard_data))
        .route(
            endpoints::DASHBOARD_RECENT_ENTRIES,
            get(get_recent_entries_endpoint),
        )
        .route(
            endpoints::ENTRIES,
            get(get_entries_endpoint).post(create_entry_endpoint),
        )
        .route(
            endpoints::ENTRY,
            get(get_entry_endpoint)
                .put(update_entry_endpoint)
                .delete(delete_entry_endpoint),
        )
        .route(endpoints::ENTRIES_BY_MONTH, get(get_entries_by_month_endpoint));

    unprotected_routes
        .merge(protected_routes)
        // The web client is served from a different origin.
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// A plaintext welcome for the root route.
async fn get_welcome() -> &'static str {
    "Welcome to the Spendlog expense tracker API"
}


#[cfg(test)]
mod entry_route_tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use chrono::{DateTime, Utc};
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{AppState, endpoints, entry::Entry, log_in::LogInResponse};

    use super::build_router;

    fn get_test_server() -> TestServer {
        let db_connection =
            Connection::open_in_memory().expect("Could not open database in memory.");
        let state = AppState::new(db_connection, "42").expect("Could not create app state.");

        TestServer::try_new(build_router(state)).expect("Could not create test server.")
    }

    async fn create_user_and_log_in(server: &TestServer, username: &str) -> LogInResponse {
        let credentials = json!({
            "username": username,
            "password": "averysafeandsecurepassword",
        });

        server
            .post(endpoints::SIGN_UP)
            .json(&credentials)
            .await
            .assert_status_ok();

        let response = server.post(endpoints::LOG_IN).json(&credentials).await;
        response.assert_status_ok();

        response.json::<LogInResponse>()
    }

    async fn create_test_entry(server: &TestServer, token: &str, amount: f64, date: &str) -> Entry {
        let category = if amount < 0.0 { "expense" } else { "income" };

        let response = server
            .post(endpoints::ENTRIES)
            .authorization(token)
            .json(&json!({
                "amount": amount,
                "description": "A thingymajig",
                "date": date,
                "category": category,
            }))
            .await;

        response.assert_status(StatusCode::CREATED);

        response.json::<Entry>()
    }

    fn entry_endpoint(entry: &Entry) -> String {
        format!("/entries/{}", entry.id)
    }

    #[tokio::test]
    async fn create_entry_responds_with_the_created_entry() {
        let server = get_test_server();
        let log_in = create_user_and_log_in(&server, "alice").await;

        let entry = create_test_entry(&server, &log_in.token, 1250.0, "2024-03-05T10:00:00Z").await;

        assert!(entry.id > 0);
        assert_eq!(entry.amount, 1250.0);
        assert_eq!(entry.description, "A thingymajig");
        assert_eq!(entry.user_id, log_in.user_id);
    }

    #[tokio::test]
    async fn create_entry_coerces_string_amount_and_bare_date() {
        let server = get_test_server();
        let log_in = create_user_and_log_in(&server, "alice").await;

        let response = server
            .post(endpoints::ENTRIES)
            .authorization(&log_in.token)
            .json(&json!({
                "amount": "42.50",
                "description": "Groceries",
                "date": "2024-03-05",
                "category": "expense",
            }))
            .await;

        response.assert_status(StatusCode::CREATED);

        let entry = response.json::<Entry>();
        let want_date: DateTime<Utc> = "2024-03-05T00:00:00Z".parse().unwrap();
        assert_eq!(entry.amount, 42.50);
        assert_eq!(entry.date, want_date);
    }

    #[tokio::test]
    async fn create_entry_rejects_a_malformed_amount() {
        let server = get_test_server();
        let log_in = create_user_and_log_in(&server, "alice").await;

        server
            .post(endpoints::ENTRIES)
            .authorization(&log_in.token)
            .json(&json!({
                "amount": "lots",
                "description": "Groceries",
                "date": "2024-03-05",
                "category": "expense",
            }))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn create_entry_rejects_a_missing_token() {
        let server = get_test_server();

        server
            .post(endpoints::ENTRIES)
            .json(&json!({
                "amount": 1.0,
                "description": "Groceries",
                "date": "2024-03-05",
                "category": "expense",
            }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn get_entries_lists_only_the_callers_entries() {
        let server = get_test_server();
        let alice = create_user_and_log_in(&server, "alice").await;
        let bob = create_user_and_log_in(&server, "bob").await;

        let alices_entry =
            create_test_entry(&server, &alice.token, 100.0, "2024-03-05T10:00:00Z").await;
        create_test_entry(&server, &bob.token, -40.0, "2024-03-06T10:00:00Z").await;

        let response = server
            .get(endpoints::ENTRIES)
            .authorization(&alice.token)
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<Vec<Entry>>(), vec![alices_entry]);
    }

    #[tokio::test]
    async fn get_entry_responds_with_the_requested_entry() {
        let server = get_test_server();
        let log_in = create_user_and_log_in(&server, "alice").await;
        let entry = create_test_entry(&server, &log_in.token, 100.0, "2024-03-05T10:00:00Z").await;

        let response = server
            .get(&entry_endpoint(&entry))
            .authorization(&log_in.token)
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<Entry>(), entry);
    }

    #[tokio::test]
    async fn get_entry_fails_on_another_users_entry() {
        let server = get_test_server();
        let alice = create_user_and_log_in(&server, "alice").await;
        let bob = create_user_and_log_in(&server, "bob").await;
        let entry = create_test_entry(&server, &alice.token, 100.0, "2024-03-05T10:00:00Z").await;

        server
            .get(&entry_endpoint(&entry))
            .authorization(&bob.token)
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn update_entry_replaces_the_named_fields() {
        let server = get_test_server();
        let log_in = create_user_and_log_in(&server, "alice").await;
        let entry = create_test_entry(&server, &log_in.token, 100.0, "2024-03-05T10:00:00Z").await;

        let response = server
            .put(&entry_endpoint(&entry))
            .authorization(&log_in.token)
            .json(&json!({
                "amount": -55.0,
                "description": "Corrected",
                "date": "2024-03-06T09:00:00Z",
                "category": "expense",
            }))
            .await;

        response.assert_status_ok();

        let updated = response.json::<Entry>();
        assert_eq!(updated.id, entry.id);
        assert_eq!(updated.amount, -55.0);
        assert_eq!(updated.description, "Corrected");
    }

    #[tokio::test]
    async fn update_entry_fails_on_another_users_entry() {
        let server = get_test_server();
        let alice = create_user_and_log_in(&server, "alice").await;
        let bob = create_user_and_log_in(&server, "bob").await;
        let entry = create_test_entry(&server, &alice.token, 100.0, "2024-03-05T10:00:00Z").await;

        server
            .put(&entry_endpoint(&entry))
            .authorization(&bob.token)
            .json(&json!({
                "amount": 0.0,
                "description": "Hijacked",
                "date": "2024-03-06T09:00:00Z",
                "category": "expense",
            }))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn delete_entry_responds_with_no_content_then_entry_is_gone() {
        let server = get_test_server();
        let log_in = create_user_and_log_in(&server, "alice").await;
        let entry = create_test_entry(&server, &log_in.token, 100.0, "2024-03-05T10:00:00Z").await;

        let response = server
            .delete(&entry_endpoint(&entry))
            .authorization(&log_in.token)
            .await;

        response.assert_status(StatusCode::NO_CONTENT);
        assert!(response.text().is_empty());

        server
            .get(&entry_endpoint(&entry))
            .authorization(&log_in.token)
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn delete_entry_fails_on_another_users_entry() {
        let server = get_test_server();
        let alice = create_user_and_log_in(&server, "alice").await;
        let bob = create_user_and_log_in(&server, "bob").await;
        let entry = create_test_entry(&server, &alice.token, 100.0, "2024-03-05T10:00:00Z").await;

        server
            .delete(&entry_endpoint(&entry))
            .authorization(&bob.token)
            .await
            .assert_status_not_found();

        // The entry must still be there for its owner.
        server
            .get(&entry_endpoint(&entry))
            .authorization(&alice.token)
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn entries_by_month_returns_only_entries_in_the_range() {
        let server = get_test_server();
        let log_in = create_user_and_log_in(&server, "alice").await;

        create_test_entry(&server, &log_in.token, 1.0, "2024-02-29T23:59:59Z").await;
        let first = create_test_entry(&server, &log_in.token, 2.0, "2024-03-01T00:00:00Z").await;
        let last = create_test_entry(&server, &log_in.token, 3.0, "2024-03-31T23:59:59Z").await;
        create_test_entry(&server, &log_in.token, 4.0, "2024-04-01T00:00:00Z").await;

        let response = server
            .get("/entries/2024/3")
            .authorization(&log_in.token)
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<Vec<Entry>>(), vec![first, last]);
    }

    #[tokio::test]
    async fn entries_by_month_rejects_an_invalid_month() {
        let server = get_test_server();
        let log_in = create_user_and_log_in(&server, "alice").await;

        server
            .get("/entries/2024/13")
            .authorization(&log_in.token)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
