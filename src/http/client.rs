// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP client: single and parallel request execution

use std::time::Instant;

use bytes::Bytes;
use tracing::{debug, info, warn};

use super::config::EngineConfig;
use super::headers;
use super::options::{round_timeout, TransferOptions};
use super::request::{PostBody, Request};
use super::util;
use super::DEFAULT_USER_AGENT;
use crate::error::{Error, Result, TransferError};
use crate::transport::{
    MultiStatus, Multiplexer, PlanBody, ReqwestTransport, TransferPlan, Transport,
};

/// Lifecycle of one `submit_all` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchPhase {
    NotStarted,
    Running,
    Draining,
    Done,
}

/// HTTP client driving requests over a [`Transport`]
pub struct HttpClient<T: Transport = ReqwestTransport> {
    transport: T,
    config: EngineConfig,
}

impl HttpClient<ReqwestTransport> {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_transport(ReqwestTransport::new(), config)
    }
}

impl Default for HttpClient<ReqwestTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> HttpClient<T> {
    /// Create a client over a custom transport
    pub fn with_transport(transport: T, config: EngineConfig) -> Self {
        Self { transport, config }
    }

    /// Get client configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Submit one request, checking the status with the request's default
    /// strictness. The outcome is stored on the request; a failure is also
    /// returned.
    pub async fn submit<'r>(&self, request: &'r mut Request) -> Result<&'r mut Request> {
        self.execute(request, None).await
    }

    /// Submit one request with explicit status strictness
    pub async fn submit_with_status_check<'r>(
        &self,
        request: &'r mut Request,
        strict: bool,
    ) -> Result<&'r mut Request> {
        self.execute(request, Some(strict)).await
    }

    async fn execute<'r>(
        &self,
        request: &'r mut Request,
        strict: Option<bool>,
    ) -> Result<&'r mut Request> {
        if request.was_submitted() {
            return Err(Error::AlreadySubmitted(request.reference()));
        }

        let plan = self.prepare(request);
        info!(method = %plan.method, url = %plan.url, "Submitting request");

        let start = Instant::now();
        let transfer = self.transport.execute(&plan).await;
        debug!(
            url = %plan.url,
            status = transfer.info.http_code,
            code = transfer.code,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Transfer finished"
        );

        match request.complete(transfer, strict)? {
            Some(failure) => {
                warn!(url = %plan.url, error = %failure, "Request failed");
                Err(failure.into())
            }
            None => Ok(request),
        }
    }

    /// Submit a batch concurrently over one multiplexer.
    ///
    /// Each request's outcome, failures included, is stored on that request
    /// using its default strictness. Only a fatal multiplexer status fails
    /// the batch.
    pub async fn submit_all(&self, requests: &mut [Request]) -> Result<()> {
        let mut phase = BatchPhase::NotStarted;
        if let Some(done) = requests.iter().find(|r| r.was_submitted()) {
            return Err(Error::AlreadySubmitted(done.reference()));
        }

        let mut multi = Multiplexer::new(self.config.batch_deadline_duration());
        for (handle, request) in requests.iter_mut().enumerate() {
            let plan = self.prepare(request);
            multi
                .register(handle, &self.transport, plan)
                .map_err(fatal)?;
        }
        phase = advance(phase, BatchPhase::Running, requests.len());

        let wait = self.config.wait_interval_duration();
        loop {
            let running = multi.perform().map_err(fatal)?;
            collect(&mut multi, requests)?;
            if running == 0 {
                break;
            }
            multi.wait(wait).await.map_err(fatal)?;
        }

        phase = advance(phase, BatchPhase::Draining, multi.registered());
        collect(&mut multi, requests)?;
        multi.close();
        advance(phase, BatchPhase::Done, requests.len());
        Ok(())
    }

    /// Submit an owned batch and hand the requests back
    pub async fn submit_batch(&self, mut requests: Vec<Request>) -> Result<Vec<Request>> {
        self.submit_all(&mut requests).await?;
        Ok(requests)
    }

    /// GET `url` with `params` merged into its query
    pub async fn get(
        &self,
        url: &str,
        params: &[(&str, &str)],
        options: Option<&TransferOptions>,
    ) -> Result<Request> {
        let request = with_options(Request::get(url).query(params.iter().copied())?, options);
        self.send(request).await
    }

    /// POST `params` as a form-encoded body
    pub async fn post_form(
        &self,
        url: &str,
        params: &[(&str, &str)],
        options: Option<&TransferOptions>,
    ) -> Result<Request> {
        let request = with_options(Request::post(url).form(params.iter().copied()), options);
        self.send(request).await
    }

    /// POST a literal body with the given content type
    pub async fn post_content(
        &self,
        url: &str,
        content: impl Into<Bytes>,
        content_type: &str,
        options: Option<&TransferOptions>,
    ) -> Result<Request> {
        let request = Request::post(url)
            .header(format!("{}: {}", headers::CONTENT_TYPE, content_type))
            .body(content);
        self.send(with_options(request, options)).await
    }

    /// POST a `text/xml` body
    pub async fn post_xml(
        &self,
        url: &str,
        content: impl Into<Bytes>,
        options: Option<&TransferOptions>,
    ) -> Result<Request> {
        self.post_content(url, content, headers::TEXT_XML, options)
            .await
    }

    /// POST `params` as `multipart/form-data`
    pub async fn post_multipart(
        &self,
        url: &str,
        params: &[(&str, &str)],
        options: Option<&TransferOptions>,
    ) -> Result<Request> {
        let request = with_options(Request::post(url).multipart(params.iter().copied()), options);
        self.send(request).await
    }

    async fn send(&self, mut request: Request) -> Result<Request> {
        self.submit(&mut request).await?;
        Ok(request)
    }

    /// Build the transfer plan for `request` and record the merged options
    /// on it.
    fn prepare(&self, request: &mut Request) -> TransferPlan {
        let mut options = self.config.transfer_defaults().merge(request.get_options());
        options
            .headers
            .extend(request.get_headers().iter().cloned());

        options.include_headers = Some(true);
        options.fail_on_error = Some(false);

        // an explicit request agent beats one from options
        if options.user_agent.is_none() || request.get_user_agent() != DEFAULT_USER_AGENT {
            options.user_agent = Some(request.get_user_agent().to_string());
        }

        let granularity = self.transport.timeout_granularity();
        options.connect_timeout_ms = options
            .connect_timeout_ms
            .map(|ms| round_timeout(ms, granularity));
        options.timeout_ms = options.timeout_ms.map(|ms| round_timeout(ms, granularity));

        let body = match request.get_body() {
            None => None,
            Some(PostBody::Raw(bytes)) => {
                set_content_length(&mut options, bytes.len());
                Some(PlanBody::Bytes(bytes.clone()))
            }
            Some(PostBody::Form(pairs)) => {
                let encoded = util::url_encode(pairs.iter().map(|(k, v)| (k, v)));
                if !options.has_header(headers::CONTENT_TYPE) {
                    options.headers.push(format!(
                        "{}: {}",
                        headers::CONTENT_TYPE,
                        headers::FORM_URLENCODED
                    ));
                }
                set_content_length(&mut options, encoded.len());
                Some(PlanBody::Bytes(Bytes::from(encoded)))
            }
            Some(PostBody::Multipart(pairs)) => Some(PlanBody::Multipart(pairs.clone())),
        };

        let plan = TransferPlan {
            url: request.get_url().to_string(),
            method: request.get_method().clone(),
            body,
            options: options.clone(),
        };
        request.set_effective_options(options);
        plan
    }
}

fn with_options(request: Request, options: Option<&TransferOptions>) -> Request {
    match options {
        Some(options) => request.option(options),
        None => request,
    }
}

fn set_content_length(options: &mut TransferOptions, len: usize) {
    if !options.has_header(headers::CONTENT_LENGTH) {
        options
            .headers
            .push(format!("{}: {}", headers::CONTENT_LENGTH, len));
    }
}

/// Store every ready completion on its request
fn collect(multi: &mut Multiplexer<'_>, requests: &mut [Request]) -> Result<usize> {
    let mut stored = 0;
    while let Some(done) = multi.info_read().map_err(fatal)? {
        let request = requests
            .get_mut(done.handle)
            .ok_or_else(|| fatal(MultiStatus::BadHandle))?;

        let status = done.transfer.info.http_code;
        match request.complete(done.transfer, None)? {
            Some(failure) => {
                debug!(handle = done.handle, url = %request.get_url(), error = %failure, "Batch request failed")
            }
            None => debug!(handle = done.handle, url = %request.get_url(), status, "Batch request done"),
        }

        multi.remove(done.handle).map_err(fatal)?;
        stored += 1;
    }
    Ok(stored)
}

fn advance(from: BatchPhase, to: BatchPhase, requests: usize) -> BatchPhase {
    debug!(from = ?from, to = ?to, requests, "Batch phase");
    to
}

fn fatal(status: MultiStatus) -> Error {
    TransferError::generic(status.code(), format!("Multiplexer failure: {}", status)).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::error::ErrorKind;
    use crate::http::DEFAULT_OPTIONS;
    use crate::transport::code;
    use crate::transport::testing::ScriptedTransport;

    fn client(transport: ScriptedTransport) -> HttpClient<ScriptedTransport> {
        HttpClient::with_transport(transport, EngineConfig::default())
    }

    #[tokio::test]
    async fn test_submit_parses_response() {
        let client = client(ScriptedTransport::new().reply(
            "http://api.test/items",
            200,
            &["Content-Type: application/json", "X-Page: 1", "X-Page: 2"],
            "[1,2]",
        ));
        let mut req = Request::get("http://api.test/items");
        client.submit(&mut req).await.unwrap();

        assert_eq!(req.status().unwrap(), 200);
        assert_eq!(req.response_headers().unwrap().values("x-page"), vec!["1", "2"]);
        assert_eq!(req.json::<Vec<u32>>().unwrap(), vec![1, 2]);

        // merged options are recorded on the request
        let used = req.get_options();
        assert_eq!(used.include_headers, Some(true));
        assert_eq!(used.fail_on_error, Some(false));
        assert_eq!(used.user_agent.as_deref(), Some(DEFAULT_USER_AGENT));
        assert_eq!(used.timeout_ms, DEFAULT_OPTIONS.timeout_ms);
    }

    #[tokio::test]
    async fn test_resubmit_fails_without_touching_state() {
        let client = client(ScriptedTransport::new().reply("http://a.test/", 200, &[], "one"));
        let mut req = Request::get("http://a.test/");
        client.submit(&mut req).await.unwrap();

        let err = client.submit(&mut req).await.unwrap_err();
        assert!(matches!(err, Error::AlreadySubmitted(_)));
        assert!(err.is_usage());
        assert_eq!(req.text().unwrap(), "one");
        assert_eq!(client.transport().plans().len(), 1);
    }

    #[tokio::test]
    async fn test_header_lists_concatenate() {
        let config = EngineConfig::new().options(TransferOptions::new().header("X-Engine: 1"));
        let transport = ScriptedTransport::new().reply("http://h.test/", 200, &[], "");
        let client = HttpClient::with_transport(transport, config);

        let mut req = Request::get("http://h.test/")
            .option(&TransferOptions::new().header("X-Option: 2"))
            .header("X-Line: 3");
        client.submit(&mut req).await.unwrap();

        let plan = &client.transport().plans()[0];
        assert_eq!(plan.options.headers, vec!["X-Engine: 1", "X-Option: 2", "X-Line: 3"]);
    }

    #[tokio::test]
    async fn test_form_body_gets_framing_headers() {
        let client = client(ScriptedTransport::new().reply("http://f.test/", 200, &[], ""));
        let mut req = Request::post("http://f.test/").form([("q", "a b"), ("n", "1")]);
        client.submit(&mut req).await.unwrap();

        let plan = &client.transport().plans()[0];
        assert_eq!(plan.body, Some(PlanBody::Bytes(Bytes::from("q=a+b&n=1"))));
        assert!(plan
            .options
            .headers
            .contains(&"Content-Type: application/x-www-form-urlencoded".to_string()));
        assert!(plan.options.headers.contains(&"Content-Length: 9".to_string()));
    }

    #[tokio::test]
    async fn test_explicit_content_type_is_kept() {
        let client = client(ScriptedTransport::new().reply("http://x.test/", 200, &[], ""));
        client
            .post_xml("http://x.test/", "<a/>", None)
            .await
            .unwrap();

        let plan = &client.transport().plans()[0];
        let content_types: Vec<&String> = plan
            .options
            .headers
            .iter()
            .filter(|h| h.to_ascii_lowercase().starts_with("content-type"))
            .collect();
        assert_eq!(content_types, vec!["Content-Type: text/xml"]);
        assert!(plan.options.headers.contains(&"Content-Length: 4".to_string()));
    }

    #[tokio::test]
    async fn test_timeouts_round_to_granularity() {
        let mut transport = ScriptedTransport::new().reply("http://t.test/", 200, &[], "");
        transport.granularity = Some(Duration::from_secs(1));
        let client = client(transport);

        let mut req = Request::get("http://t.test/").timeout_ms(1500).connect_timeout_ms(0);
        client.submit(&mut req).await.unwrap();

        assert_eq!(req.get_options().timeout_ms, Some(2000));
        assert_eq!(req.get_options().connect_timeout_ms, Some(1000));
    }

    #[tokio::test]
    async fn test_strict_status_check() {
        let client = client(ScriptedTransport::new().reply("http://s.test/gone", 404, &[], "nope"));

        let mut strict = Request::get("http://s.test/gone");
        let err = client.submit(&mut strict).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::StatusCode));
        assert_eq!(
            err.to_string(),
            "status code [22]: HTTP Error: (404) from http://s.test/gone"
        );
        // the failure is also stored
        assert!(strict.failure().unwrap().is_some());
        assert_eq!(strict.text().unwrap(), "nope");

        let mut lenient = Request::get("http://s.test/gone");
        client
            .submit_with_status_check(&mut lenient, false)
            .await
            .unwrap();
        assert_eq!(lenient.status().unwrap(), 404);
    }

    #[tokio::test]
    async fn test_redirect_keeps_final_headers() {
        let hops = concat!(
            "HTTP/1.1 302 Found\r\nLocation: /next\r\nX-Hop: 1\r\n\r\n",
            "HTTP/1.1 200 OK\r\nX-Final: 1\r\n\r\n",
        );
        let client = client(ScriptedTransport::new().reply_raw("http://r.test/", 200, hops, "end", 1));
        let mut req = Request::get("http://r.test/");
        client.submit(&mut req).await.unwrap();

        let headers = req.response_headers().unwrap();
        assert!(headers.contains("X-Final"));
        assert!(!headers.contains("X-Hop"));
        assert_eq!(req.status_line().unwrap(), Some("HTTP/1.1 200 OK"));
        assert_eq!(req.text().unwrap(), "end");
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let transport = ScriptedTransport::new()
            .reply("http://one.test/", 200, &[], "1")
            .reply("http://two.test/", 500, &[], "2")
            .fail("http://three.test/", code::OPERATION_TIMEDOUT, "Operation timed out")
            .reply("http://four.test/", 200, &[], "4")
            .delay("http://four.test/", Duration::from_millis(20));
        let client = client(transport);

        let mut batch = vec![
            Request::get("http://one.test/"),
            Request::get("http://two.test/"),
            Request::get("http://three.test/"),
            Request::get("http://four.test/"),
            Request::get("http://two.test/").fail_if_not_2xx(false),
        ];
        client.submit_all(&mut batch).await.unwrap();

        assert!(batch.iter().all(Request::was_submitted));
        assert!(batch[0].failure().unwrap().is_none());
        assert_eq!(
            batch[1].failure().unwrap().map(|f| f.kind),
            Some(ErrorKind::StatusCode)
        );
        assert_eq!(
            batch[2].failure().unwrap().map(|f| f.kind),
            Some(ErrorKind::Timeout)
        );
        assert_eq!(batch[3].text().unwrap(), "4");
        assert!(batch[4].failure().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_batch_rejects_submitted_request() {
        let client = client(ScriptedTransport::new().reply("http://a.test/", 200, &[], ""));
        let mut done = Request::get("http://a.test/");
        client.submit(&mut done).await.unwrap();

        let mut batch = vec![Request::get("http://a.test/"), done];
        let err = client.submit_all(&mut batch).await.unwrap_err();
        assert!(matches!(err, Error::AlreadySubmitted(_)));
        assert!(!batch[0].was_submitted());
        assert_eq!(client.transport().plans().len(), 1);
    }

    #[tokio::test]
    async fn test_batch_deadline_is_fatal() {
        let transport = ScriptedTransport::new()
            .reply("http://slow.test/", 200, &[], "")
            .delay("http://slow.test/", Duration::from_secs(5));
        let config = EngineConfig::new()
            .batch_deadline(Duration::from_millis(30))
            .wait_interval(Duration::from_millis(10));
        let client = HttpClient::with_transport(transport, config);

        let mut batch = vec![Request::get("http://slow.test/")];
        let err = client.submit_all(&mut batch).await.unwrap_err();
        let failure = err.as_transfer().unwrap();
        assert_eq!(failure.kind, ErrorKind::Generic);
        assert_eq!(failure.code, MultiStatus::DeadlineExceeded.code());
        assert!(failure.request.is_none());
        assert!(!batch[0].was_submitted());
    }

    #[tokio::test]
    async fn test_convenience_get_adds_params() {
        let client = client(ScriptedTransport::new().reply("http://g.test/s?q=rust&page=2", 200, &[], "ok"));
        let req = client
            .get("http://g.test/s", &[("q", "rust"), ("page", "2")], None)
            .await
            .unwrap();
        assert_eq!(req.get_url(), "http://g.test/s?q=rust&page=2");
        assert_eq!(req.text().unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_submit_batch_returns_requests() {
        let client = client(ScriptedTransport::new().reply("http://a.test/", 200, &[], "a"));
        let done = client
            .submit_batch(vec![Request::get("http://a.test/"), Request::get("http://b.test/")])
            .await
            .unwrap();
        assert_eq!(done[0].text().unwrap(), "a");
        assert_eq!(
            done[1].failure().unwrap().map(|f| f.kind),
            Some(ErrorKind::ConnectFailure)
        );
    }
}
