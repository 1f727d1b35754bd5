//! Access token creation and verification.
//!
//! Tokens are JSON Web Tokens signed with the server's secret. Protected
//! route handlers take a [Claims] argument, which makes axum run token
//! verification as an extractor before the handler body executes.

use axum::{
    Json,
    body::Body,
    extract::{FromRef, FromRequestParts},
    http::{Response, StatusCode, header::AUTHORIZATION, request::Parts},
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{AppState, Error, user::UserID};

/// How long an access token stays valid after it is issued.
const TOKEN_LIFETIME_HOURS: i64 = 10;

/// The contents of an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// The expiry time of the token as a unix timestamp.
    pub exp: usize,
    /// The time the token was issued as a unix timestamp.
    pub iat: usize,
    /// The ID of the user the token was issued to.
    pub user_id: UserID,
    /// The username of the user the token was issued to.
    pub username: String,
}

/// The errors that may occur while verifying a token on a protected route.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    /// The request did not carry a readable `Authorization` header.
    MissingToken,
    /// The token's signature is invalid or the token has expired.
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response<Body> {
        let (status, error_message) = match self {
            AuthError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "Authentication failed: token missing",
            ),
            AuthError::InvalidToken => (StatusCode::FORBIDDEN, "Forbidden: token invalid"),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl<S> FromRequestParts<S> for Claims
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?;
        let token = header_value
            .to_str()
            .map_err(|_| AuthError::MissingToken)?;

        // The web client sends the raw token, but tolerate clients that use
        // the conventional bearer scheme.
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();

        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let state = AppState::from_ref(state);
        let token_data = decode_token(token, state.decoding_key())?;

        Ok(token_data.claims)
    }
}

/// Create a signed access token for the user with `user_id` and `username`.
///
/// The token expires [TOKEN_LIFETIME_HOURS] hours after this call.
///
/// # Errors
///
/// Returns an [Error::TokenCreation] if the claims could not be signed.
pub fn create_token(
    user_id: UserID,
    username: &str,
    encoding_key: &EncodingKey,
) -> Result<String, Error> {
    let now = Utc::now();
    let claims = Claims {
        exp: (now + Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp() as usize,
        iat: now.timestamp() as usize,
        user_id,
        username: username.to_owned(),
    };

    encode(&Header::default(), &claims, encoding_key).map_err(|error| {
        tracing::error!("Error signing access token: {}", error);
        Error::TokenCreation
    })
}

fn decode_token(token: &str, decoding_key: &DecodingKey) -> Result<TokenData<Claims>, AuthError> {
    decode(token, decoding_key, &Validation::default()).map_err(|_| AuthError::InvalidToken)
}

/// A route handler that confirms the caller holds a valid token and echoes
/// the decoded claims.
pub async fn get_authenticate(claims: Claims) -> Json<Value> {
    Json(json!({
        "message": "Authenticated",
        "user": claims,
    }))
}

/// A route handler for logging out.
///
/// The API is stateless: this is a no-op that merely confirms the caller
/// holds a valid token. Tokens remain valid until their natural expiry.
pub async fn post_log_out(_claims: Claims) -> Json<Value> {
    Json(json!({
        "message": "Logout successful",
    }))
}
