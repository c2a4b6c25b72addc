// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! URL helpers

use url::form_urlencoded;
use url::Url;

use crate::error::Result;

/// Form-encode key/value pairs (`application/x-www-form-urlencoded`).
/// Repeated keys are kept in order.
pub fn url_encode<I, K, V>(pairs: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (k, v) in pairs {
        serializer.append_pair(k.as_ref(), v.as_ref());
    }
    serializer.finish()
}

/// Append form-encoded pairs to the query of `url`.
///
/// An existing query is kept and the new pairs follow it after `&`; the
/// fragment stays last. With no pairs the URL is returned unchanged.
pub fn add_query_data<I, K, V>(url: &str, pairs: I) -> Result<String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let payload = url_encode(pairs);
    if payload.is_empty() {
        return Ok(url.to_string());
    }

    let mut parsed = Url::parse(url)?;
    let query = match parsed.query() {
        Some(existing) if !existing.is_empty() => format!("{}&{}", existing, payload),
        _ => payload,
    };
    parsed.set_query(Some(&query));
    Ok(parsed.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_are_added_before_fragment() {
        let url = add_query_data("http://example.com/path#fragment", [("a", "b")]).unwrap();
        assert_eq!(url, "http://example.com/path?a=b#fragment");

        let url =
            add_query_data("http://example.com/path?key=value#fragment", [("a", "b")]).unwrap();
        assert_eq!(url, "http://example.com/path?key=value&a=b#fragment");

        let url = add_query_data("http://example.com/path?k=long%20value#f", [("a", "b")]).unwrap();
        assert_eq!(url, "http://example.com/path?k=long%20value&a=b#f");
    }

    #[test]
    fn test_empty_params_leave_url_untouched() {
        let none: [(&str, &str); 0] = [];
        assert_eq!(add_query_data("not a url", none).unwrap(), "not a url");
    }

    #[test]
    fn test_url_encode() {
        let encoded = url_encode([("q", "a b&c"), ("tag", "x"), ("tag", "y")]);
        assert_eq!(encoded, "q=a+b%26c&tag=x&tag=y");
    }

    #[test]
    fn test_bad_url_is_an_error() {
        assert!(add_query_data("::nope", [("a", "b")]).is_err());
    }
}
