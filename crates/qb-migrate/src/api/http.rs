//! HTTP plumbing shared by the REST and legacy API calls.

use reqwest::{Client, Response};
use std::time::Duration;

use crate::error::{Error, Result};

/// Creates an HTTP client with the given request timeout.
#[must_use]
pub fn create_http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Validates a base URL before requests are built on top of it.
pub fn validate_url(url: &str) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(Error::Config(format!(
            "Invalid URL scheme in '{}'. Allowed: http, https",
            url
        )));
    }

    if url.len() < 10 {
        return Err(Error::Config(format!("Invalid URL format: {}", url)));
    }

    Ok(())
}

/// Maps an HTTP error status to the matching error.
pub fn handle_http_error(status_code: u16, body: &str, operation: &str) -> Error {
    match status_code {
        429 => Error::RateLimit(60),
        401 | 403 => Error::Authentication(format!("{} rejected: {}", operation, body)),
        _ => Error::Request {
            status: status_code,
            message: format!("{}: {}", operation, body),
        },
    }
}

/// Passes successful responses through and turns the rest into errors.
pub async fn check_status(response: Response, operation: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(handle_http_error(status.as_u16(), &body, operation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_http_error_rate_limit() {
        let err = handle_http_error(429, "too many requests", "get tables");
        assert!(matches!(err, Error::RateLimit(60)));
    }

    #[test]
    fn test_handle_http_error_auth() {
        let err = handle_http_error(401, "bad token", "get app");
        assert!(matches!(err, Error::Authentication(_)));
        let err = handle_http_error(403, "forbidden", "get app");
        assert!(matches!(err, Error::Authentication(_)));
    }

    #[test]
    fn test_handle_http_error_other() {
        let err = handle_http_error(500, "internal error", "get fields");
        assert!(matches!(err, Error::Request { status: 500, .. }));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://api.quickbase.com/v1").is_ok());
        assert!(validate_url("http://127.0.0.1:8080").is_ok());
        assert!(validate_url("ftp://files.example.com").is_err());
        assert!(validate_url("acme.quickbase.com").is_err());
    }

    #[test]
    fn test_create_http_client() {
        let client = create_http_client(Duration::from_secs(5));
        assert!(client.get("http://example.com").build().is_ok());
    }
}
