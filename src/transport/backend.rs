// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! reqwest-backed transport

use std::error::Error as StdError;
use std::io::ErrorKind as IoErrorKind;
use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::header::{
    HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, LOCATION, REFERER, SET_COOKIE,
    USER_AGENT,
};
use reqwest::redirect::Policy;
use reqwest::{Client, Method, StatusCode};
use tracing::{debug, warn};
use url::Url;

use super::{code, PlanBody, RawTransfer, TransferInfo, TransferPlan, Transport};
use crate::http::{AuthScheme, CertEncoding, ClientCert, CookieJar, HttpVersion, TransferOptions};

/// Failure inside a transfer, already mapped to a transport code
#[derive(Debug)]
struct Failure {
    code: u32,
    message: String,
}

impl Failure {
    fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for Failure {
    fn from(err: reqwest::Error) -> Self {
        Self::new(classify_error(&err), describe(&err))
    }
}

/// Settings that require a distinct client
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    accept_invalid_certs: bool,
    http1_only: bool,
    compression: bool,
    connect_timeout_ms: u64,
    proxy: Option<String>,
    client_cert: Option<ClientCert>,
}

impl ClientKey {
    fn from_options(options: &TransferOptions) -> Self {
        Self {
            accept_invalid_certs: !(options.should_verify_peer() && options.should_verify_host()),
            http1_only: options.http_version != Some(HttpVersion::Negotiate),
            compression: options.compression.unwrap_or(true),
            connect_timeout_ms: options.connect_timeout().as_millis() as u64,
            proxy: options.proxy.clone(),
            client_cert: options.client_cert.clone(),
        }
    }
}

/// Production transport
///
/// Clients are cached per distinct TLS/proxy/protocol setting so transfers
/// sharing settings share connection pools. Redirects are followed here, not
/// by reqwest, so that every hop's header block reaches the raw response.
#[derive(Debug, Default)]
pub struct ReqwestTransport {
    clients: DashMap<ClientKey, Client>,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    async fn client(&self, options: &TransferOptions) -> Result<Client, Failure> {
        let key = ClientKey::from_options(options);
        let cached = self.clients.get(&key).map(|c| c.value().clone());
        if let Some(client) = cached {
            return Ok(client);
        }

        let mut builder = Client::builder()
            .redirect(Policy::none())
            .connect_timeout(options.connect_timeout())
            .danger_accept_invalid_certs(key.accept_invalid_certs)
            .gzip(key.compression)
            .brotli(key.compression);

        if key.http1_only {
            builder = builder.http1_only();
        }

        if let Some(ref proxy_url) = key.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url).map_err(|e| {
                Failure::new(
                    code::COULDNT_RESOLVE_PROXY,
                    format!("Invalid proxy [{}]: {}", proxy_url, e),
                )
            })?);
        }

        if let Some(ref cert) = key.client_cert {
            builder = builder.identity(load_identity(cert).await?);
        }

        let client = builder
            .build()
            .map_err(|e| Failure::new(code::FAILED_INIT, describe(&e)))?;
        self.clients.insert(key, client.clone());
        Ok(client)
    }

    async fn run(&self, plan: &TransferPlan, info: &mut TransferInfo) -> Result<Vec<u8>, Failure> {
        let options = &plan.options;
        let mut url = Url::parse(&plan.url).map_err(|e| {
            Failure::new(
                code::URL_MALFORMAT,
                format!("URL using bad/illegal format or missing URL: {}", e),
            )
        })?;
        check_scheme(&url)?;

        let client = self.client(options).await?;

        let mut jar = match options.cookie_jar {
            Some(ref path) => match CookieJar::load(path).await {
                Ok(jar) => jar,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cookie jar unreadable, starting empty");
                    CookieJar::new()
                }
            },
            None => CookieJar::new(),
        };
        let mut received = CookieJar::new();

        let mut method = plan.method.clone();
        let mut body = plan.body.as_ref();
        let mut raw = Vec::new();

        loop {
            let request = build_request(&client, &method, &url, body, options, &jar)?;
            info.request_header = Some(render_request_head(&request));
            debug!(method = %method, url = %url, "Sending request");

            let response = client.execute(request).await?;
            let status = response.status();

            for value in response.headers().get_all(SET_COOKIE) {
                if let Ok(header) = value.to_str() {
                    jar.add_from_header(header, &url);
                    received.add_from_header(header, &url);
                }
            }

            info.effective_url = url.to_string();
            info.http_code = status.as_u16();
            info.content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(String::from);

            if options.wants_headers() {
                let head = render_response_head(&response);
                info.header_size += head.len();
                raw.extend_from_slice(head.as_bytes());
            }

            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(String::from);

            match location {
                Some(location) if status.is_redirection() && options.should_follow() => {
                    let limit = options.redirect_limit();
                    if info.redirect_count >= limit {
                        return Err(Failure::new(
                            code::TOO_MANY_REDIRECTS,
                            format!("Maximum ({}) redirects followed", limit),
                        ));
                    }
                    let next = url.join(&location).map_err(|e| {
                        Failure::new(
                            code::URL_MALFORMAT,
                            format!("Bad redirect target [{}]: {}", location, e),
                        )
                    })?;
                    check_scheme(&next)?;

                    // hop bodies are discarded
                    let _ = response.bytes().await;

                    if switches_to_get(status, &method) {
                        method = Method::GET;
                        body = None;
                    }
                    info.redirect_count += 1;
                    debug!(status = status.as_u16(), from = %url, to = %next, "Following redirect");
                    url = next;
                }
                _ => {
                    if options.fails_on_error() && status.as_u16() >= 400 {
                        return Err(Failure::new(
                            code::HTTP_RETURNED_ERROR,
                            format!("The requested URL returned error: {}", status.as_u16()),
                        ));
                    }
                    let bytes = response.bytes().await?;
                    info.size_download = bytes.len() as u64;
                    raw.extend_from_slice(&bytes);
                    break;
                }
            }
        }

        if let Some(ref path) = options.cookie_jar {
            if let Err(e) = CookieJar::merge_into(path, &received).await {
                warn!(path = %path.display(), error = %e, "Failed to write cookie jar");
            }
        }

        Ok(raw)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, plan: &TransferPlan) -> RawTransfer {
        let started = Instant::now();
        let budget = plan.options.timeout();
        let mut info = TransferInfo::for_url(&plan.url);

        let outcome = tokio::time::timeout(budget, self.run(plan, &mut info)).await;
        info.total_time_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(raw)) => RawTransfer::ok(raw, info),
            Ok(Err(failure)) => {
                debug!(url = %plan.url, code = failure.code, message = %failure.message, "Transfer failed");
                RawTransfer::failed(failure.code, failure.message, info)
            }
            Err(_) => RawTransfer::failed(
                code::OPERATION_TIMEDOUT,
                format!(
                    "Operation timed out after {} milliseconds",
                    budget.as_millis()
                ),
                info,
            ),
        }
    }
}

fn check_scheme(url: &Url) -> Result<(), Failure> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Failure::new(
            code::UNSUPPORTED_PROTOCOL,
            format!("Protocol \"{}\" not supported", other),
        )),
    }
}

/// 303 always, and 301/302 after POST, continue as a bodiless GET
fn switches_to_get(status: StatusCode, method: &Method) -> bool {
    status == StatusCode::SEE_OTHER
        || (*method == Method::POST
            && (status == StatusCode::MOVED_PERMANENTLY || status == StatusCode::FOUND))
}

fn build_request(
    client: &Client,
    method: &Method,
    url: &Url,
    body: Option<&PlanBody>,
    options: &TransferOptions,
    jar: &CookieJar,
) -> Result<reqwest::Request, Failure> {
    let mut builder = client.request(method.clone(), url.clone());

    for line in &options.headers {
        let Some((name, value)) = parse_header_line(line) else {
            debug!(line = %line, "Skipping malformed header line");
            continue;
        };
        // a dropped body takes its framing headers with it
        if body.is_none() && (name == CONTENT_LENGTH || name == CONTENT_TYPE) {
            continue;
        }
        builder = builder.header(name, value);
    }

    if let Some(ref agent) = options.user_agent {
        if !options.has_header(USER_AGENT.as_str()) {
            builder = builder.header(USER_AGENT, agent.as_str());
        }
    }
    if let Some(ref referer) = options.referer {
        if !options.has_header(REFERER.as_str()) {
            builder = builder.header(REFERER, referer.as_str());
        }
    }
    if let Some(cookies) = jar.cookie_header(url) {
        builder = builder.header(COOKIE, cookies);
    }
    if let Some(ref creds) = options.credentials {
        builder = match creds.scheme {
            AuthScheme::Basic => builder.basic_auth(&creds.user, Some(&creds.password)),
            AuthScheme::Bearer => builder.bearer_auth(&creds.password),
        };
    }

    builder = match body {
        Some(PlanBody::Bytes(bytes)) => builder.body(bytes.clone()),
        Some(PlanBody::Multipart(fields)) => {
            let form = fields
                .iter()
                .fold(reqwest::multipart::Form::new(), |form, (k, v)| {
                    form.text(k.clone(), v.clone())
                });
            builder.multipart(form)
        }
        None => builder,
    };

    builder.build().map_err(Failure::from)
}

fn parse_header_line(line: &str) -> Option<(HeaderName, HeaderValue)> {
    let (name, value) = line.split_once(':')?;
    let name = HeaderName::from_bytes(name.trim().as_bytes()).ok()?;
    let value = HeaderValue::from_str(value.trim()).ok()?;
    Some((name, value))
}

async fn load_identity(cert: &ClientCert) -> Result<reqwest::Identity, Failure> {
    if cert.encoding == CertEncoding::Der {
        return Err(Failure::new(
            code::SSL_CERTPROBLEM,
            "DER client certificates are not supported, convert to PEM",
        ));
    }

    let read = |path: &std::path::Path, e: std::io::Error| {
        Failure::new(
            code::SSL_CERTPROBLEM,
            format!("could not load client certificate [{}]: {}", path.display(), e),
        )
    };
    let cert_pem = tokio::fs::read(&cert.cert).await.map_err(|e| read(cert.cert.as_path(), e))?;
    let key_pem = tokio::fs::read(&cert.key).await.map_err(|e| read(cert.key.as_path(), e))?;

    if String::from_utf8_lossy(&key_pem).contains("ENCRYPTED") {
        return Err(Failure::new(
            code::SSL_CERTPROBLEM,
            "encrypted private keys are not supported, decrypt the key first",
        ));
    }

    let mut pem = key_pem;
    pem.push(b'\n');
    pem.extend_from_slice(&cert_pem);
    reqwest::Identity::from_pem(&pem).map_err(|e| {
        Failure::new(
            code::SSL_CERTPROBLEM,
            format!("unable to use client certificate: {}", e),
        )
    })
}

fn render_response_head(response: &reqwest::Response) -> String {
    let status = response.status();
    let mut head = format!(
        "{:?} {} {}\r\n",
        response.version(),
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    );
    for (name, value) in response.headers() {
        head.push_str(name.as_str());
        head.push_str(": ");
        head.push_str(&String::from_utf8_lossy(value.as_bytes()));
        head.push_str("\r\n");
    }
    head.push_str("\r\n");
    head
}

fn render_request_head(request: &reqwest::Request) -> String {
    let url = request.url();
    let target = match url.query() {
        Some(q) => format!("{}?{}", url.path(), q),
        None => url.path().to_string(),
    };
    let mut head = format!("{} {} HTTP/1.1\r\n", request.method(), target);
    if let Some(host) = url.host_str() {
        match url.port() {
            Some(port) => head.push_str(&format!("Host: {}:{}\r\n", host, port)),
            None => head.push_str(&format!("Host: {}\r\n", host)),
        }
    }
    for (name, value) in request.headers() {
        head.push_str(name.as_str());
        head.push_str(": ");
        head.push_str(&String::from_utf8_lossy(value.as_bytes()));
        head.push_str("\r\n");
    }
    head.push_str("\r\n");
    head
}

/// Map a reqwest error to a transport code
pub(crate) fn classify_error(err: &reqwest::Error) -> u32 {
    if err.is_timeout() {
        return code::OPERATION_TIMEDOUT;
    }
    if err.is_redirect() {
        return code::TOO_MANY_REDIRECTS;
    }
    if err.is_builder() {
        return code::URL_MALFORMAT;
    }

    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            match io.kind() {
                IoErrorKind::ConnectionRefused
                | IoErrorKind::ConnectionReset
                | IoErrorKind::ConnectionAborted
                | IoErrorKind::AddrNotAvailable => return code::COULDNT_CONNECT,
                IoErrorKind::TimedOut => return code::OPERATION_TIMEDOUT,
                _ => {}
            }
        }
        if let Some(code) = classify_message(&cause.to_string()) {
            return code;
        }
        source = cause.source();
    }

    if err.is_connect() {
        code::COULDNT_CONNECT
    } else if err.is_body() || err.is_decode() {
        code::RECV_ERROR
    } else {
        code::SEND_ERROR
    }
}

fn classify_message(message: &str) -> Option<u32> {
    let text = message.to_ascii_lowercase();
    if text.contains("dns error")
        || text.contains("failed to lookup address")
        || text.contains("name or service not known")
    {
        Some(code::COULDNT_RESOLVE_HOST)
    } else if text.contains("certificate") {
        Some(code::SSL_CACERT)
    } else if text.contains("tls") || text.contains("handshake") || text.contains("ssl") {
        Some(code::SSL_CONNECT_ERROR)
    } else {
        None
    }
}

/// Error text with its cause chain
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
