//! Query string access
//!
//! Percent-decodes with `url::form_urlencoded`; the first occurrence of a key wins.

use std::borrow::Cow;

/// Value of `key` in `query`, or `None` when absent or empty
pub fn param<'a>(query: Option<&'a str>, key: &str) -> Option<Cow<'a, str>> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
}

/// Value of `key`, falling back to `default` when absent or empty
pub fn param_or<'a>(query: Option<&'a str>, key: &str, default: &'a str) -> Cow<'a, str> {
    param(query, key).unwrap_or(Cow::Borrowed(default))
}
