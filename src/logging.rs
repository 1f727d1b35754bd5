//! Middleware for logging requests and responses.

use axum::{extract::Request, http::header::CONTENT_TYPE, middleware::Next, response::Response};

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is
/// truncated and the full body is logged at the `debug` level.
/// Password fields in JSON bodies are redacted before logging.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (headers, body_text) = extract_header_and_body_text_from_request(request).await;

    if headers.headers.get(CONTENT_TYPE) == Some(&"application/json".parse().unwrap()) {
        let display_text = redact_json_string_field(&body_text, "password");
        log_request(&headers, &display_text);
    } else {
        log_request(&headers, &body_text);
    }

    let request = Request::from_parts(headers, body_text.into());
    let response = next.run(request).await;

    let (headers, body_text) = extract_header_and_body_text_from_response(response).await;
    log_response(&headers, &body_text);

    Response::from_parts(headers, body_text.into())
}

/// Replace the string value of every `"field_name": "..."` pair in
/// `json_text` with asterisks.
///
/// Works on the raw text rather than a parsed document so that malformed
/// bodies are still logged (and still redacted on a best-effort basis).
fn redact_json_string_field(json_text: &str, field_name: &str) -> String {
    let needle = format!("\"{}\"", field_name);
    let mut redacted = String::with_capacity(json_text.len());
    let mut rest = json_text;

    while let Some(key_start) = rest.find(&needle) {
        let after_key = key_start + needle.len();
        redacted.push_str(&rest[..after_key]);
        rest = &rest[after_key..];

        let Some(value_start) = find_string_value_start(rest) else {
            continue;
        };
        let value_end = match find_string_value_end(&rest[value_start..]) {
            Some(end) => value_start + end,
            None => rest.len(),
        };

        redacted.push_str(&rest[..value_start]);
        redacted.push_str("********");
        rest = &rest[value_end..];
    }

    redacted.push_str(rest);
    redacted
}

/// Find the index just past the opening quote of a JSON string value, given
/// text starting immediately after the field's key.
fn find_string_value_start(text: &str) -> Option<usize> {
    let mut chars = text.char_indices();

    // Skip whitespace, then expect a colon.
    let colon = chars.find(|(_, c)| !c.is_whitespace())?;
    if colon.1 != ':' {
        return None;
    }

    let quote = chars.find(|(_, c)| !c.is_whitespace())?;
    if quote.1 != '"' {
        return None;
    }

    Some(quote.0 + 1)
}

/// Find the index of the closing quote of a JSON string, accounting for
/// escaped quotes.
fn find_string_value_end(text: &str) -> Option<usize> {
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return Some(i),
            _ => escaped = false,
        }
    }

    None
}

async fn extract_header_and_body_text_from_request(
    request: Request,
) -> (axum::http::request::Parts, String) {
    let (headers, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();

    (headers, String::from_utf8_lossy(&body_bytes).to_string())
}

async fn extract_header_and_body_text_from_response(
    response: Response,
) -> (axum::http::response::Parts, String) {
    let (headers, body) = response.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();

    (headers, String::from_utf8_lossy(&body_bytes).to_string())
}

/// How many bytes of a body are logged at the `info` level.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

fn log_request(headers: &axum::http::request::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Received request: {headers:#?}\nbody: {:}...",
            &body[..LOG_BODY_LENGTH_LIMIT]
        );
        tracing::debug!("Full request body: {body:?}");
    } else {
        tracing::info!("Received request: {headers:#?}\nbody: {body:?}");
    }
}

fn log_response(headers: &axum::http::response::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Sending response: {headers:#?}\nbody: {:}...",
            &body[..LOG_BODY_LENGTH_LIMIT]
        );
        tracing::debug!("Full response body: {body:?}");
    } else {
        tracing::info!("Sending response: {headers:#?}\nbody: {body:?}");
    }
}
