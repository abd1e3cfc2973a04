//! TokenValidator trait: allow/deny decision for an inbound request.

use async_trait::async_trait;

/// Decides whether an inbound request may proceed, given its raw
/// `Authorization` header value.
///
/// Implementations fail closed: any fetch, parse, or verification error is
/// logged and reported as `false`, never surfaced to the caller.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, auth_header: Option<&str>) -> bool;
}

/// Extract the token from an `Authorization: Bearer <token>` value.
///
/// Returns `None` for an absent, blank, or non-bearer header.
pub fn bearer_token(auth_header: Option<&str>) -> Option<&str> {
    let value = auth_header?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// True when the header is absent or contains only whitespace.
pub fn is_blank_header(auth_header: Option<&str>) -> bool {
    auth_header.is_none_or(|h| h.trim().is_empty())
}
