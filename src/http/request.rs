// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP request entity
//!
//! A [`Request`] holds the caller's configuration for one exchange and,
//! once submitted, the response state. It is single-use: the response state
//! is written exactly once and cannot be read before that.

use std::path::PathBuf;

use bytes::Bytes;
use reqwest::Method;
use serde::de::DeserializeOwned;

use super::cookie::{parse_cookie_header, CookieElement};
use super::options::{CertEncoding, ClientCert, Credentials, AuthScheme, TransferOptions};
use super::response::{self, HeaderField, ResponseHeaders};
use super::util;
use super::{headers, DEFAULT_USER_AGENT};
use crate::error::{Error, RequestRef, Result, TransferError};
use crate::transport::{code, RawTransfer, TransferInfo};

/// Request payload
#[derive(Debug, Clone, PartialEq)]
pub enum PostBody {
    /// Literal payload, sent as is
    Raw(Bytes),
    /// Pairs sent as `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
    /// Pairs sent as `multipart/form-data`
    Multipart(Vec<(String, String)>),
}

/// Response state of a completed request
#[derive(Debug, Clone)]
struct Completion {
    status: u16,
    status_line: Option<String>,
    headers: ResponseHeaders,
    body: Bytes,
    info: TransferInfo,
    transport_code: u32,
    transport_message: String,
    failure: Option<TransferError>,
}

/// One HTTP exchange
#[derive(Debug, Clone)]
pub struct Request {
    url: String,
    method: Method,
    headers: Vec<String>,
    body: Option<PostBody>,
    user_agent: String,
    options: TransferOptions,
    fail_if_not_2xx: bool,
    completion: Option<Completion>,
}

impl Request {
    /// Create a GET request
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            headers: Vec::new(),
            body: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            options: TransferOptions::default(),
            fail_if_not_2xx: true,
            completion: None,
        }
    }

    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url)
    }

    /// Create a POST request
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(url).method(Method::POST)
    }

    /// Create a request with an arbitrary method
    pub fn with_method(method: Method, url: impl Into<String>) -> Self {
        Self::new(url).method(method)
    }

    /// Set the URL
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the method
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Append a raw `Name: value` header line. Duplicates are kept.
    pub fn header(mut self, line: impl Into<String>) -> Self {
        self.headers.push(line.into());
        self
    }

    /// Replace all header lines
    pub fn headers<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers = lines.into_iter().map(Into::into).collect();
        self
    }

    /// Set a literal body
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(PostBody::Raw(body.into()));
        self
    }

    /// Set a form-encoded body
    pub fn form<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.body = Some(PostBody::Form(collect_pairs(pairs)));
        self
    }

    /// Set a `multipart/form-data` body
    pub fn multipart<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.body = Some(PostBody::Multipart(collect_pairs(pairs)));
        self
    }

    /// Set the body from an already built payload
    pub fn post_body(mut self, body: PostBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Append query parameters to the URL
    pub fn query<I, K, V>(mut self, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.url = util::add_query_data(&self.url, pairs)?;
        Ok(self)
    }

    /// Set the User-Agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the Referer
    pub fn referer(mut self, referer: impl Into<String>) -> Self {
        self.options.referer = Some(referer.into());
        self
    }

    /// Replace the transfer options
    pub fn options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    /// Overlay extra transfer options on the current ones
    pub fn option(mut self, options: &TransferOptions) -> Self {
        self.options = self.options.merge(options);
        self
    }

    /// Connect timeout in milliseconds
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.options.connect_timeout_ms = Some(ms);
        self
    }

    /// Whole-transfer timeout in milliseconds
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.options.timeout_ms = Some(ms);
        self
    }

    /// Authenticate with a user/password pair
    pub fn credentials(
        mut self,
        user: impl Into<String>,
        password: impl Into<String>,
        scheme: AuthScheme,
    ) -> Self {
        self.options.credentials = Some(Credentials {
            user: user.into(),
            password: password.into(),
            scheme,
        });
        self
    }

    /// Authenticate with an x509 client certificate
    pub fn client_certificate(
        mut self,
        cert: impl Into<PathBuf>,
        key: impl Into<PathBuf>,
        encoding: CertEncoding,
    ) -> Self {
        self.options.client_cert = Some(ClientCert {
            cert: cert.into(),
            key: key.into(),
            encoding,
        });
        self
    }

    /// Read cookies from and store cookies in `path`
    pub fn cookie_jar(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.cookie_jar = Some(path.into());
        self
    }

    /// Default strictness: fail on statuses outside [200, 299]
    pub fn fail_if_not_2xx(mut self, fail: bool) -> Self {
        self.fail_if_not_2xx = fail;
        self
    }

    pub fn get_url(&self) -> &str {
        &self.url
    }

    pub fn get_method(&self) -> &Method {
        &self.method
    }

    pub fn get_headers(&self) -> &[String] {
        &self.headers
    }

    pub fn get_body(&self) -> Option<&PostBody> {
        self.body.as_ref()
    }

    pub fn get_user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Transfer options. After submission these are the merged options
    /// actually used.
    pub fn get_options(&self) -> &TransferOptions {
        &self.options
    }

    pub fn default_fail_if_not_2xx(&self) -> bool {
        self.fail_if_not_2xx
    }

    /// Snapshot used in error reports
    pub fn reference(&self) -> RequestRef {
        RequestRef::new(self.method.clone(), self.url.clone())
    }

    pub fn was_submitted(&self) -> bool {
        self.completion.is_some()
    }

    fn completion(&self) -> Result<&Completion> {
        self.completion.as_ref().ok_or(Error::NotSubmitted)
    }

    /// HTTP status of the final response (0 if none arrived)
    pub fn status(&self) -> Result<u16> {
        Ok(self.completion()?.status)
    }

    /// Status line of the final response
    pub fn status_line(&self) -> Result<Option<&str>> {
        Ok(self.completion()?.status_line.as_deref())
    }

    pub fn response_headers(&self) -> Result<&ResponseHeaders> {
        Ok(&self.completion()?.headers)
    }

    /// One response header; `None` if it was not sent
    pub fn response_header(&self, name: &str) -> Result<Option<&HeaderField>> {
        Ok(self.completion()?.headers.get(name))
    }

    pub fn response_body(&self) -> Result<&Bytes> {
        Ok(&self.completion()?.body)
    }

    /// Body as text, lossy conversion
    pub fn text(&self) -> Result<String> {
        Ok(String::from_utf8_lossy(self.response_body()?).into_owned())
    }

    /// Parse body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(self.response_body()?).map_err(Error::from)
    }

    /// Transport diagnostics
    pub fn info(&self) -> Result<&TransferInfo> {
        Ok(&self.completion()?.info)
    }

    /// Transport diagnostics as a JSON object
    pub fn info_map(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        match serde_json::to_value(self.info()?)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Ok(serde_json::Map::new()),
        }
    }

    /// Transport status code, 0 on success
    pub fn transport_code(&self) -> Result<u32> {
        Ok(self.completion()?.transport_code)
    }

    pub fn transport_message(&self) -> Result<&str> {
        Ok(&self.completion()?.transport_message)
    }

    /// Failure recorded when the request completed, if any
    pub fn failure(&self) -> Result<Option<&TransferError>> {
        Ok(self.completion()?.failure.as_ref())
    }

    /// Cookies set by the final response
    pub fn set_cookies(&self) -> Result<Vec<CookieElement>> {
        Ok(self
            .response_headers()?
            .values(headers::SET_COOKIE)
            .into_iter()
            .flat_map(parse_cookie_header)
            .collect())
    }

    /// Re-check the outcome. `strict` overrides the request default for
    /// status checking.
    pub fn validate(&self, strict: Option<bool>) -> Result<()> {
        let completion = self.completion()?;
        match self.evaluate(completion, strict) {
            Some(failure) => Err(failure.into()),
            None => Ok(()),
        }
    }

    fn evaluate(&self, completion: &Completion, strict: Option<bool>) -> Option<TransferError> {
        if completion.transport_code != code::OK {
            return Some(TransferError::from_transport(
                completion.transport_code,
                completion.transport_message.clone(),
                self.reference(),
            ));
        }
        let strict = strict.unwrap_or(self.fail_if_not_2xx);
        if strict && !(200..=299).contains(&completion.status) {
            return Some(TransferError::status(completion.status, self.reference()));
        }
        None
    }

    /// Record the used options before execution
    pub(crate) fn set_effective_options(&mut self, options: TransferOptions) {
        self.options = options;
    }

    /// Store the transfer outcome. Fails if the request already completed.
    pub(crate) fn complete(
        &mut self,
        transfer: RawTransfer,
        strict: Option<bool>,
    ) -> Result<Option<TransferError>> {
        if self.was_submitted() {
            return Err(Error::AlreadySubmitted(self.reference()));
        }

        let parsed = response::parse(&transfer.raw, &transfer.info);
        let mut completion = Completion {
            status: parsed.status,
            status_line: parsed.status_line,
            headers: parsed.headers,
            body: parsed.body,
            info: transfer.info,
            transport_code: transfer.code,
            transport_message: transfer.message,
            failure: None,
        };
        completion.failure = self.evaluate(&completion, strict);
        let failure = completion.failure.clone();
        self.completion = Some(completion);
        Ok(failure)
    }
}

fn collect_pairs<I, K, V>(pairs: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}
