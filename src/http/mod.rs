// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP engine layer
//!
//! Request configuration, option layering, response parsing, cookie
//! handling, and the single and parallel executors.

mod client;
mod config;
mod cookie;
mod jar;
mod options;
mod request;
mod response;
mod util;

pub use client::HttpClient;
pub use config::{EngineConfig, DEFAULT_WAIT_INTERVAL_MS};
pub use cookie::{
    parse_cookie_element, parse_cookie_header, CookieAttr, CookieElement, COOKIE_NAME,
    COOKIE_VALUE,
};
pub use jar::{Cookie, CookieJar};
pub use options::{
    round_timeout, AuthScheme, CertEncoding, ClientCert, Credentials, HttpVersion,
    TransferOptions, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_MAX_REDIRECTS, DEFAULT_OPTIONS,
    DEFAULT_TIMEOUT_MS,
};
pub use request::{PostBody, Request};
pub use response::{parse as parse_response, HeaderField, ParsedResponse, ResponseHeaders};
pub use util::{add_query_data, url_encode};

/// Default user agent string
pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; volley/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Header names the engine sets itself
pub mod headers {
    pub const CONTENT_LENGTH: &str = "Content-Length";
    pub const CONTENT_TYPE: &str = "Content-Type";
    pub const SET_COOKIE: &str = "set-cookie";

    pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
    pub const TEXT_XML: &str = "text/xml";
}
