//! The API endpoint URIs.

/// The root route, responds with a plaintext welcome.
pub const ROOT: &str = "/";
/// The route for registering a new user.
pub const SIGN_UP: &str = "/signup";
/// The route for logging in a user.
pub const LOG_IN: &str = "/login";
/// The route for checking whether the caller's token is valid.
pub const AUTHENTICATE: &str = "/authenticate";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/logout";
/// The route for the current month dashboard summary.
pub const DASHBOARD_DATA: &str = "/dashboard/data";
/// The route for the caller's most recently dated entries.
pub const DASHBOARD_RECENT_ENTRIES: &str = "/dashboard/recent-entries";
/// The route to create and list entries.
pub const ENTRIES: &str = "/entries";
/// The route to access a single entry.
pub const ENTRY: &str = "/entries/{entry_id}";
/// The route to list entries within a calendar month.
pub const ENTRIES_BY_MONTH: &str = "/entries/{year}/{month}";

// These tests are here so that we know the routes will parse as URIs.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::ROOT);
        assert_endpoint_is_valid_uri(endpoints::SIGN_UP);
        assert_endpoint_is_valid_uri(endpoints::LOG_IN);
        assert_endpoint_is_valid_uri(endpoints::AUTHENTICATE);
        assert_endpoint_is_valid_uri(endpoints::LOG_OUT);
        assert_endpoint_is_valid_uri(endpoints::DASHBOARD_DATA);
        assert_endpoint_is_valid_uri(endpoints::DASHBOARD_RECENT_ENTRIES);
        assert_endpoint_is_valid_uri(endpoints::ENTRIES);
        assert_endpoint_is_valid_uri(endpoints::ENTRY);
        assert_endpoint_is_valid_uri(endpoints::ENTRIES_BY_MONTH);
    }
}
