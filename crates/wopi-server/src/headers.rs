//! WOPI header names and request-header helpers.

use axum::http::header::{HeaderName, AUTHORIZATION};
use axum::http::{HeaderMap, HeaderValue};

use crate::error::{ServerError, ServerResult};

pub const X_WOPI_OVERRIDE: HeaderName = HeaderName::from_static("x-wopi-override");
pub const X_WOPI_LOCK: HeaderName = HeaderName::from_static("x-wopi-lock");
pub const X_WOPI_OLD_LOCK: HeaderName = HeaderName::from_static("x-wopi-oldlock");
pub const X_WOPI_ITEM_VERSION: HeaderName = HeaderName::from_static("x-wopi-itemversion");
pub const X_WOPI_LOCK_FAILURE_REASON: HeaderName =
    HeaderName::from_static("x-wopi-lockfailurereason");
pub const X_WOPI_MACHINE_NAME: HeaderName = HeaderName::from_static("x-wopi-machinename");
pub const X_WOPI_SESSION_ID: HeaderName = HeaderName::from_static("x-wopi-sessionid");
pub const X_REQUESTED_WITH: HeaderName = HeaderName::from_static("x-requested-with");
pub const PREFER: HeaderName = HeaderName::from_static("prefer");

/// A header's value as UTF-8 text, or `None` when absent.
pub fn header_text<'a>(headers: &'a HeaderMap, name: &HeaderName) -> ServerResult<Option<&'a str>> {
    headers
        .get(name)
        .map(|value| {
            std::str::from_utf8(value.as_bytes())
                .map_err(|_| ServerError::Validation(format!("{name} is not valid UTF-8")))
        })
        .transpose()
}

/// The bearer credential from an `Authorization` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Encode text as a response header value.
pub fn header_value(text: &str) -> ServerResult<HeaderValue> {
    HeaderValue::from_bytes(text.as_bytes())
        .map_err(|e| ServerError::Internal(format!("unencodable header value: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_present_and_absent_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(X_WOPI_LOCK, HeaderValue::from_static("T1"));
        assert_eq!(header_text(&headers, &X_WOPI_LOCK).unwrap(), Some("T1"));
        assert_eq!(header_text(&headers, &X_WOPI_OLD_LOCK).unwrap(), None);
    }

    #[test]
    fn accepts_utf8_lock_values() {
        let mut headers = HeaderMap::new();
        headers.insert(
            X_WOPI_LOCK,
            HeaderValue::from_bytes("{\"S\":\"é\"}".as_bytes()).unwrap(),
        );
        assert_eq!(
            header_text(&headers, &X_WOPI_LOCK).unwrap(),
            Some("{\"S\":\"é\"}")
        );
    }

    #[test]
    fn rejects_invalid_utf8() {
        let mut headers = HeaderMap::new();
        headers.insert(X_WOPI_LOCK, HeaderValue::from_bytes(&[0xff, 0xfe]).unwrap());
        assert!(matches!(
            header_text(&headers, &X_WOPI_LOCK),
            Err(ServerError::Validation(_))
        ));
    }

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }
}
