const SCHEME: &str = "bearer";

/// Pull the token out of an `Authorization: Bearer <token>` header value.
/// The scheme is matched ignoring ASCII case. Returns `None` for a missing
/// header, another scheme, or an empty token.
pub(crate) fn bearer_token(header: Option<&str>) -> Option<&str> {
    let (scheme, token) = header?.trim().split_once(' ')?;

    if !scheme.eq_ignore_ascii_case(SCHEME) {
        return None;
    }

    Some(token.trim()).filter(|token| !token.is_empty())
}
