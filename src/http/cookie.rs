// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Quote-aware `Set-Cookie` tokenizer
//!
//! A header may carry several cookies separated by commas, and attribute
//! values may be quoted strings that themselves contain `,` or `;`. The
//! scanners below walk the input once, tracking whether they are inside a
//! quoted string, and only split on delimiters found outside quotes.

/// Reserved key resolving to the cookie's own name
pub const COOKIE_NAME: &str = "cookie-name";
/// Reserved key resolving to the cookie's own value
pub const COOKIE_VALUE: &str = "cookie-value";

/// Value of one cookie attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieAttr {
    /// `name=value`
    Value(String),
    /// Bare flag such as `Secure`
    Flag,
}

impl CookieAttr {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CookieAttr::Value(v) => Some(v),
            CookieAttr::Flag => None,
        }
    }

    pub fn is_flag(&self) -> bool {
        matches!(self, CookieAttr::Flag)
    }
}

/// One cookie parsed from a `Set-Cookie` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieElement {
    pub name: String,
    pub value: String,
    /// Attributes in first-seen order
    pub attributes: Vec<(String, CookieAttr)>,
}

impl CookieElement {
    /// Look up an attribute, or the reserved name/value keys
    pub fn get(&self, key: &str) -> Option<CookieAttr> {
        match key {
            COOKIE_NAME => Some(CookieAttr::Value(self.name.clone())),
            COOKIE_VALUE => Some(CookieAttr::Value(self.value.clone())),
            _ => self.attribute(key).cloned(),
        }
    }

    /// Attribute by exact name
    pub fn attribute(&self, name: &str) -> Option<&CookieAttr> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Attribute by name, ignoring ASCII case
    pub fn attribute_ignore_case(&self, name: &str) -> Option<&CookieAttr> {
        self.attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Whether a flag or attribute is present (ASCII case-insensitive)
    pub fn has(&self, name: &str) -> bool {
        self.attribute_ignore_case(name).is_some()
    }

    fn set(&mut self, name: String, attr: CookieAttr) {
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = attr,
            None => self.attributes.push((name, attr)),
        }
    }
}

/// Split a `Set-Cookie` style header into cookie elements.
///
/// Segments without a `name=value` pair are dropped.
pub fn parse_cookie_header(header: &str) -> Vec<CookieElement> {
    split_unquoted(header, b',')
        .into_iter()
        .filter_map(parse_cookie_element)
        .collect()
}

/// Parse one `name=value; attr=val; flag` segment
pub fn parse_cookie_element(segment: &str) -> Option<CookieElement> {
    let mut pair: Option<(String, String)> = None;
    let mut pending: Vec<(String, CookieAttr)> = Vec::new();

    for chunk in split_unquoted(segment, b';') {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            continue;
        }
        match chunk.split_once('=') {
            None => pending.push((chunk.to_string(), CookieAttr::Flag)),
            Some((name, value)) => {
                let name = name.trim().to_string();
                let value = value.trim().trim_matches('"').to_string();
                if pair.is_none() {
                    pair = Some((name, value));
                } else {
                    pending.push((name, CookieAttr::Value(value)));
                }
            }
        }
    }

    let (name, value) = pair?;
    let mut element = CookieElement {
        name,
        value,
        attributes: Vec::with_capacity(pending.len()),
    };
    for (name, attr) in pending {
        element.set(name, attr);
    }
    Some(element)
}

/// Split on `delim` wherever it occurs outside a double-quoted run.
/// A quote preceded by a backslash does not open or close a run.
fn split_unquoted(input: &str, delim: u8) -> Vec<&str> {
    let bytes = input.as_bytes();
    let mut parts = Vec::new();
    let mut quoted = false;
    let mut from = 0;

    for (i, &b) in bytes.iter().enumerate() {
        if b == b'"' && (i == 0 || bytes[i - 1] != b'\\') {
            quoted = !quoted;
        } else if b == delim && !quoted {
            // delimiters are ASCII, so `from..i` stays on char boundaries
            parts.push(&input[from..i]);
            from = i + 1;
        }
    }
    if from < bytes.len() {
        parts.push(&input[from..]);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_cookie_with_attributes() {
        let cookies = parse_cookie_header("name=value; Path=/; Secure");
        assert_eq!(cookies.len(), 1);

        let c = &cookies[0];
        assert_eq!(c.get(COOKIE_NAME), Some(CookieAttr::Value("name".into())));
        assert_eq!(c.get(COOKIE_VALUE), Some(CookieAttr::Value("value".into())));
        assert_eq!(c.get("Path"), Some(CookieAttr::Value("/".into())));
        assert_eq!(c.get("Secure"), Some(CookieAttr::Flag));
    }

    #[test]
    fn test_quoted_comma_does_not_split() {
        let cookies = parse_cookie_header(r#"a="x,y"; Path=/, b=c"#);
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].name, "a");
        assert_eq!(cookies[0].value, "x,y");
        assert_eq!(cookies[0].attribute("Path"), Some(&CookieAttr::Value("/".into())));
        assert_eq!(cookies[1].name, "b");
        assert_eq!(cookies[1].value, "c");
    }

    #[test]
    fn test_quoted_semicolon_does_not_split() {
        let cookies = parse_cookie_header(r#"pref="a;b"; HttpOnly"#);
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].value, "a;b");
        assert!(cookies[0].has("httponly"));
    }

    #[test]
    fn test_escaped_quote_keeps_run_open() {
        let cookies = parse_cookie_header(r#"q="a\"b,c"; Path=/"#);
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name, "q");
        assert_eq!(cookies[0].value, r#"a\"b,c"#);
        assert!(cookies[0].attribute("Path").is_some());
    }

    #[test]
    fn test_later_duplicates_overwrite() {
        let cookies = parse_cookie_header("id=1; Path=/a; Path=/b");
        assert_eq!(cookies[0].attributes.len(), 1);
        assert_eq!(cookies[0].attribute("Path"), Some(&CookieAttr::Value("/b".into())));
    }

    #[test]
    fn test_elements_without_pair_are_discarded() {
        let cookies = parse_cookie_header("Secure, HttpOnly, ok=1");
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name, "ok");
    }

    #[test]
    fn test_empty_and_trailing_delimiters() {
        assert!(parse_cookie_header("").is_empty());
        let cookies = parse_cookie_header("a=1;;, ");
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].attributes.is_empty());
    }

    #[test]
    fn test_value_may_contain_equals() {
        let cookies = parse_cookie_header("token=abc==; Max-Age=60");
        assert_eq!(cookies[0].value, "abc==");
        assert_eq!(cookies[0].attribute("Max-Age").and_then(|a| a.as_str()), Some("60"));
    }
}
