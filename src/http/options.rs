// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Transfer options
//!
//! Every field is optional so that option sets can be layered: engine
//! defaults, engine configuration, then per-request options. A set field in
//! a later layer replaces the earlier value, except `headers`, which
//! accumulate.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_MAX_REDIRECTS: u32 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 3000;
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Engine-wide defaults. Immutable: plans start from a copy.
pub const DEFAULT_OPTIONS: TransferOptions = TransferOptions {
    verify_peer: Some(false),
    verify_host: Some(false),
    follow_location: Some(true),
    max_redirects: Some(DEFAULT_MAX_REDIRECTS),
    http_version: Some(HttpVersion::Http11),
    compression: Some(true),
    connect_timeout_ms: Some(DEFAULT_CONNECT_TIMEOUT_MS),
    timeout_ms: Some(DEFAULT_TIMEOUT_MS),
    client_cert: None,
    cookie_jar: None,
    headers: Vec::new(),
    credentials: None,
    referer: None,
    user_agent: None,
    proxy: None,
    include_headers: None,
    fail_on_error: None,
};

/// HTTP protocol version preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HttpVersion {
    /// HTTP/1.1 only
    Http11,
    /// Let the transport negotiate (ALPN)
    Negotiate,
}

/// Authentication scheme for [`Credentials`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthScheme {
    /// `Authorization: Basic base64(user:password)`
    #[default]
    Basic,
    /// `Authorization: Bearer <password>`; the user name is ignored
    Bearer,
}

/// Credential pair sent with the request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub user: String,
    pub password: String,
    #[serde(default)]
    pub scheme: AuthScheme,
}

/// Encoding of client certificate files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertEncoding {
    #[default]
    Pem,
    Der,
}

/// x509 client identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientCert {
    pub cert: PathBuf,
    /// Unencrypted private key
    pub key: PathBuf,
    #[serde(default)]
    pub encoding: CertEncoding,
}

/// Options for one transfer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransferOptions {
    /// Verify the peer certificate chain
    pub verify_peer: Option<bool>,
    /// Verify the certificate matches the host name
    pub verify_host: Option<bool>,
    /// Follow `Location` on 3xx responses
    pub follow_location: Option<bool>,
    /// Redirect hop cap
    pub max_redirects: Option<u32>,
    pub http_version: Option<HttpVersion>,
    /// Negotiate content encodings (gzip, brotli)
    pub compression: Option<bool>,
    pub connect_timeout_ms: Option<u64>,
    /// Deadline for the whole transfer, redirects included
    pub timeout_ms: Option<u64>,
    pub client_cert: Option<ClientCert>,
    /// Cookie file read before and written after the transfer
    pub cookie_jar: Option<PathBuf>,
    /// Raw `Name: value` header lines
    pub headers: Vec<String>,
    pub credentials: Option<Credentials>,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub proxy: Option<String>,
    /// Keep header blocks in front of the body in the raw response
    pub include_headers: Option<bool>,
    /// Let the transport fail statuses >= 400 itself
    pub fail_on_error: Option<bool>,
}

impl TransferOptions {
    /// Create an empty option set
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay `additional` on `self`. Set fields in `additional` win;
    /// header lines are appended after the ones already present.
    pub fn merge(&self, additional: &TransferOptions) -> TransferOptions {
        let mut headers = self.headers.clone();
        headers.extend(additional.headers.iter().cloned());

        TransferOptions {
            verify_peer: additional.verify_peer.or(self.verify_peer),
            verify_host: additional.verify_host.or(self.verify_host),
            follow_location: additional.follow_location.or(self.follow_location),
            max_redirects: additional.max_redirects.or(self.max_redirects),
            http_version: additional.http_version.or(self.http_version),
            compression: additional.compression.or(self.compression),
            connect_timeout_ms: additional.connect_timeout_ms.or(self.connect_timeout_ms),
            timeout_ms: additional.timeout_ms.or(self.timeout_ms),
            client_cert: additional
                .client_cert
                .clone()
                .or_else(|| self.client_cert.clone()),
            cookie_jar: additional
                .cookie_jar
                .clone()
                .or_else(|| self.cookie_jar.clone()),
            headers,
            credentials: additional
                .credentials
                .clone()
                .or_else(|| self.credentials.clone()),
            referer: additional.referer.clone().or_else(|| self.referer.clone()),
            user_agent: additional
                .user_agent
                .clone()
                .or_else(|| self.user_agent.clone()),
            proxy: additional.proxy.clone().or_else(|| self.proxy.clone()),
            include_headers: additional.include_headers.or(self.include_headers),
            fail_on_error: additional.fail_on_error.or(self.fail_on_error),
        }
    }

    /// Apply a string-keyed option, as read from the command line or the
    /// environment. Unknown names are rejected.
    pub fn set(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        match name {
            "verify_peer" => self.verify_peer = Some(parse_flag(name, value)?),
            "verify_host" => self.verify_host = Some(parse_flag(name, value)?),
            "verify_tls" => {
                let flag = parse_flag(name, value)?;
                self.verify_peer = Some(flag);
                self.verify_host = Some(flag);
            }
            "follow_location" => self.follow_location = Some(parse_flag(name, value)?),
            "max_redirects" => self.max_redirects = Some(parse_number(name, value)?),
            "http_version" => {
                self.http_version = Some(match value {
                    "1.1" | "http11" => HttpVersion::Http11,
                    "any" | "negotiate" => HttpVersion::Negotiate,
                    _ => return Err(invalid(name, value)),
                })
            }
            "compression" => self.compression = Some(parse_flag(name, value)?),
            "connect_timeout_ms" => self.connect_timeout_ms = Some(parse_number(name, value)?),
            "timeout_ms" => self.timeout_ms = Some(parse_number(name, value)?),
            "cookie_jar" => self.cookie_jar = Some(PathBuf::from(value)),
            "header" => self.headers.push(value.to_string()),
            "userpwd" => {
                let (user, password) = value.split_once(':').ok_or_else(|| invalid(name, value))?;
                self.credentials = Some(Credentials {
                    user: user.to_string(),
                    password: password.to_string(),
                    scheme: AuthScheme::Basic,
                });
            }
            "bearer" => {
                self.credentials = Some(Credentials {
                    user: String::new(),
                    password: value.to_string(),
                    scheme: AuthScheme::Bearer,
                })
            }
            "referer" => self.referer = Some(value.to_string()),
            "user_agent" => self.user_agent = Some(value.to_string()),
            "proxy" => self.proxy = Some(value.to_string()),
            _ => return Err(Error::config(format!("Invalid transfer option [{}]", name))),
        }
        Ok(self)
    }

    /// Enable or disable TLS peer and host verification together
    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.verify_peer = Some(verify);
        self.verify_host = Some(verify);
        self
    }

    /// Add a raw header line
    pub fn header(mut self, line: impl Into<String>) -> Self {
        self.headers.push(line.into());
        self
    }

    pub fn should_verify_peer(&self) -> bool {
        self.verify_peer.unwrap_or(false)
    }

    pub fn should_verify_host(&self) -> bool {
        self.verify_host.unwrap_or(false)
    }

    pub fn should_follow(&self) -> bool {
        self.follow_location.unwrap_or(true)
    }

    pub fn redirect_limit(&self) -> u32 {
        self.max_redirects.unwrap_or(DEFAULT_MAX_REDIRECTS)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms.unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS))
    }

    pub fn wants_headers(&self) -> bool {
        self.include_headers.unwrap_or(true)
    }

    pub fn fails_on_error(&self) -> bool {
        self.fail_on_error.unwrap_or(false)
    }

    /// Whether any header line already names `name` (case-insensitive)
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|line| {
            line.split_once(':')
                .map(|(n, _)| n.trim().eq_ignore_ascii_case(name))
                .unwrap_or(false)
        })
    }
}

/// Round a millisecond timeout up to a whole number of `granularity` units,
/// never below one unit.
pub fn round_timeout(ms: u64, granularity: Duration) -> u64 {
    let unit = (granularity.as_millis() as u64).max(1);
    let units = ms.div_ceil(unit).max(1);
    units.saturating_mul(unit)
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(name, value)),
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| invalid(name, value))
}

fn invalid(name: &str, value: &str) -> Error {
    Error::config(format!("Invalid value [{}] for transfer option [{}]", value, name))
}
