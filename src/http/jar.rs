// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Cookie jar file support for the `cookie_jar` transfer option
//!
//! The file uses the Netscape cookie format (one tab separated cookie per
//! line) so it stays interchangeable with other HTTP tools. Cookies are
//! loaded before a transfer, updated from every hop's `Set-Cookie` headers,
//! and merged back into the file afterwards.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use dashmap::DashMap;
use lazy_static::lazy_static;
use tokio::sync::Mutex;
use url::Url;

use super::cookie::{parse_cookie_element, CookieAttr, CookieElement};
use crate::error::Result;

const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

lazy_static! {
    /// One lock per jar path so concurrent transfers do not clobber each other
    static ref JAR_LOCKS: DashMap<PathBuf, Arc<Mutex<()>>> = DashMap::new();
}

/// A single stored cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    /// Domain the cookie belongs to, without leading dot
    pub domain: String,
    /// Also sent to subdomains of `domain`
    pub include_subdomains: bool,
    pub path: String,
    /// Expiration time (None = session cookie)
    pub expires: Option<DateTime<Utc>>,
    /// HTTPS only
    pub secure: bool,
    pub http_only: bool,
}

impl Cookie {
    /// Build a stored cookie from a parsed element received from `url`
    pub fn from_element(element: &CookieElement, url: &Url) -> Self {
        let host = url.host_str().unwrap_or("").to_string();
        let mut cookie = Cookie {
            name: element.name.clone(),
            value: element.value.clone(),
            domain: host,
            include_subdomains: false,
            path: default_path(url),
            expires: None,
            secure: false,
            http_only: false,
        };

        let mut max_age = None;
        for (attr, value) in &element.attributes {
            match (attr.to_ascii_lowercase().as_str(), value) {
                ("domain", CookieAttr::Value(v)) if !v.is_empty() => {
                    cookie.domain = v.trim_start_matches('.').to_ascii_lowercase();
                    cookie.include_subdomains = true;
                }
                ("path", CookieAttr::Value(v)) if v.starts_with('/') => cookie.path = v.clone(),
                ("expires", CookieAttr::Value(v)) => {
                    if let Ok(dt) = DateTime::parse_from_rfc2822(v) {
                        cookie.expires = Some(dt.with_timezone(&Utc));
                    }
                }
                ("max-age", CookieAttr::Value(v)) => max_age = v.parse::<i64>().ok(),
                ("secure", _) => cookie.secure = true,
                ("httponly", _) => cookie.http_only = true,
                _ => {}
            }
        }
        // Max-Age wins over Expires
        if let Some(secs) = max_age {
            cookie.expires = Some(expiry_after(secs));
        }
        cookie
    }

    /// Check if the cookie is expired
    pub fn is_expired(&self) -> bool {
        self.expires.map_or(false, |exp| exp <= Utc::now())
    }

    /// Check if the cookie should be sent to `url`
    pub fn matches(&self, url: &Url) -> bool {
        let host = url.host_str().unwrap_or("");
        if !self.domain_matches(host) {
            return false;
        }
        if !path_matches(url.path(), &self.path) {
            return false;
        }
        if self.secure && url.scheme() != "https" {
            return false;
        }
        !self.is_expired()
    }

    fn domain_matches(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        if host == self.domain {
            return true;
        }
        self.include_subdomains && host.ends_with(&format!(".{}", self.domain))
    }

    fn to_line(&self) -> String {
        let domain = if self.include_subdomains {
            format!(".{}", self.domain)
        } else {
            self.domain.clone()
        };
        format!(
            "{}{}\t{}\t{}\t{}\t{}\t{}\t{}",
            if self.http_only { HTTP_ONLY_PREFIX } else { "" },
            domain,
            flag(self.include_subdomains),
            self.path,
            flag(self.secure),
            self.expires.map(|e| e.timestamp()).unwrap_or(0),
            self.name,
            self.value
        )
    }

    fn from_line(line: &str) -> Option<Self> {
        let (http_only, line) = match line.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => (true, rest),
            None if line.starts_with('#') => return None,
            None => (false, line),
        };
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 7 {
            return None;
        }
        let expires = match fields[4].parse::<i64>().ok()? {
            0 => None,
            ts => Utc.timestamp_opt(ts, 0).single(),
        };
        Some(Cookie {
            name: fields[5].to_string(),
            value: fields[6].to_string(),
            domain: fields[0].trim_start_matches('.').to_ascii_lowercase(),
            include_subdomains: fields[1] == "TRUE",
            path: fields[2].to_string(),
            expires,
            secure: fields[3] == "TRUE",
            http_only,
        })
    }
}

/// In-memory view of a cookie file
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a jar file. A missing file is an empty jar.
    pub async fn load(path: &Path) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(Self::parse(&text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Parse Netscape cookie file contents, skipping malformed lines
    pub fn parse(text: &str) -> Self {
        let cookies = text
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.is_empty())
            .filter_map(Cookie::from_line)
            .collect();
        Self { cookies }
    }

    /// Replace any cookie with the same name, domain and path
    pub fn add(&mut self, cookie: Cookie) {
        self.cookies.retain(|c| {
            c.name != cookie.name || c.domain != cookie.domain || c.path != cookie.path
        });
        self.cookies.push(cookie);
    }

    /// Store the cookie of one `Set-Cookie` header line received from `url`.
    ///
    /// A header line carries exactly one cookie, so commas (as in an
    /// `Expires` date) stay part of the attribute value.
    pub fn add_from_header(&mut self, header: &str, url: &Url) -> bool {
        match parse_cookie_element(header) {
            Some(element) => {
                self.add(Cookie::from_element(&element, url));
                true
            }
            None => false,
        }
    }

    /// `Cookie` request header value for `url`
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .filter(|c| c.matches(url))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Render as Netscape cookie file contents, dropping expired cookies
    pub fn render(&self) -> String {
        let mut out = String::from("# Netscape HTTP Cookie File\n");
        for cookie in self.cookies.iter().filter(|c| !c.is_expired()) {
            out.push_str(&cookie.to_line());
            out.push('\n');
        }
        out
    }

    /// Merge `updates` into the file at `path`, re-reading it under the
    /// jar's lock so concurrent transfers keep each other's cookies.
    pub async fn merge_into(path: &Path, updates: &CookieJar) -> Result<()> {
        let lock = JAR_LOCKS
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let mut current = Self::load(path).await?;
        for cookie in &updates.cookies {
            current.add(cookie.clone());
        }
        tokio::fs::write(path, current.render()).await?;
        Ok(())
    }
}

fn flag(b: bool) -> &'static str {
    if b {
        "TRUE"
    } else {
        "FALSE"
    }
}

/// Expiry for a `Max-Age` of `secs`, clamped to chrono's range.
/// Zero or negative means already expired (RFC 6265 section 5.2.2).
fn expiry_after(secs: i64) -> DateTime<Utc> {
    if secs <= 0 {
        return DateTime::<Utc>::MIN_UTC;
    }
    Duration::try_seconds(secs)
        .and_then(|delta| Utc::now().checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// RFC 6265 section 5.1.4 path-match
fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    match request_path.strip_prefix(cookie_path) {
        Some(rest) => cookie_path.ends_with('/') || rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Directory of the request path, per RFC 6265 section 5.1.4
fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}
