//! Admin secret check for the decision endpoints.
//!
//! The secret is a single shared credential, accepted from the
//! `x-admin-secret` header, the `secret` query parameter, or a `secret`
//! body field. When no secret is configured the check is skipped
//! (development mode).

use axum::http::HeaderMap;

use crate::domain::DomainError;

pub const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

pub fn authorize_admin(
    configured: Option<&str>,
    headers: &HeaderMap,
    query_secret: Option<&str>,
    body_secret: Option<&str>,
) -> Result<(), DomainError> {
    let Some(expected) = configured else {
        return Ok(());
    };

    let header_secret = headers
        .get(ADMIN_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());

    let presented = header_secret.or(query_secret).or(body_secret);

    match presented {
        Some(s) if s == expected => Ok(()),
        _ => Err(DomainError::Unauthorized),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_configured_secret_is_open() {
        let headers = HeaderMap::new();
        assert!(authorize_admin(None, &headers, None, None).is_ok());
    }

    #[test]
    fn test_header_secret_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert(ADMIN_SECRET_HEADER, "s3cret".parse().unwrap());
        assert!(authorize_admin(Some("s3cret"), &headers, None, None).is_ok());
    }

    #[test]
    fn test_query_and_body_fallbacks() {
        let headers = HeaderMap::new();
        assert!(authorize_admin(Some("s3cret"), &headers, Some("s3cret"), None).is_ok());
        assert!(authorize_admin(Some("s3cret"), &headers, None, Some("s3cret")).is_ok());
    }

    #[test]
    fn test_missing_or_wrong_secret_rejected() {
        let headers = HeaderMap::new();
        assert!(matches!(
            authorize_admin(Some("s3cret"), &headers, None, None),
            Err(DomainError::Unauthorized)
        ));

        let mut headers = HeaderMap::new();
        headers.insert(ADMIN_SECRET_HEADER, "wrong".parse().unwrap());
        assert!(matches!(
            authorize_admin(Some("s3cret"), &headers, None, Some("also-wrong")),
            Err(DomainError::Unauthorized)
        ));
    }
}
