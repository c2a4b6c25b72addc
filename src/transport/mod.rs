// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Transport layer
//!
//! A [`Transport`] executes one fully merged [`TransferPlan`] and reports the
//! header-inclusive raw response, diagnostics and a numeric status code. It
//! never fails with a Rust error: every failure is encoded in the returned
//! [`RawTransfer`] so the engine can classify it.

mod backend;
mod multi;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::http::TransferOptions;

pub use backend::ReqwestTransport;
pub use multi::{Completion, MultiStatus, Multiplexer};

/// Transport status codes. The numbering follows libcurl's so codes stay
/// comparable with other tooling.
pub mod code {
    pub const OK: u32 = 0;
    pub const UNSUPPORTED_PROTOCOL: u32 = 1;
    pub const FAILED_INIT: u32 = 2;
    pub const URL_MALFORMAT: u32 = 3;
    pub const COULDNT_RESOLVE_PROXY: u32 = 5;
    pub const COULDNT_RESOLVE_HOST: u32 = 6;
    pub const COULDNT_CONNECT: u32 = 7;
    pub const HTTP_RETURNED_ERROR: u32 = 22;
    pub const READ_ERROR: u32 = 26;
    pub const OPERATION_TIMEDOUT: u32 = 28;
    pub const SSL_CONNECT_ERROR: u32 = 35;
    pub const TOO_MANY_REDIRECTS: u32 = 47;
    pub const PEER_FAILED_VERIFICATION: u32 = 51;
    pub const GOT_NOTHING: u32 = 52;
    pub const SSL_ENGINE_NOTFOUND: u32 = 53;
    pub const SSL_ENGINE_SETFAILED: u32 = 54;
    pub const SEND_ERROR: u32 = 55;
    pub const RECV_ERROR: u32 = 56;
    pub const SSL_CERTPROBLEM: u32 = 58;
    pub const SSL_CIPHER: u32 = 59;
    pub const SSL_CACERT: u32 = 60;
    pub const BAD_CONTENT_ENCODING: u32 = 61;
    pub const USE_SSL_FAILED: u32 = 64;
    pub const SSL_ENGINE_INITFAILED: u32 = 66;
    pub const SSL_CACERT_BADFILE: u32 = 77;
    pub const SSL_SHUTDOWN_FAILED: u32 = 80;
    pub const SSL_CRL_BADFILE: u32 = 82;
    pub const SSL_ISSUER_ERROR: u32 = 83;
}

/// Transfer diagnostics reported by the transport
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferInfo {
    /// Last URL requested (after redirects)
    pub effective_url: String,
    /// Final HTTP status, 0 if no response arrived
    pub http_code: u16,
    /// Byte length of all header blocks at the start of the raw response
    pub header_size: usize,
    /// Number of redirects followed
    pub redirect_count: u32,
    /// Content-Type of the final response
    pub content_type: Option<String>,
    /// Body bytes received
    pub size_download: u64,
    /// Wall time of the whole transfer (milliseconds)
    pub total_time_ms: u64,
    /// Request header block sent on the final hop
    pub request_header: Option<String>,
}

impl TransferInfo {
    /// Info for a transfer that never produced a response
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            effective_url: url.into(),
            ..Default::default()
        }
    }
}

/// Outcome of one transfer as reported by a transport
#[derive(Debug, Clone)]
pub struct RawTransfer {
    /// Header blocks of every hop followed by the final body
    pub raw: Bytes,
    pub info: TransferInfo,
    /// Transport status, [`code::OK`] on success
    pub code: u32,
    /// Transport message, empty on success
    pub message: String,
}

impl RawTransfer {
    /// Successful transfer
    pub fn ok(raw: impl Into<Bytes>, info: TransferInfo) -> Self {
        Self {
            raw: raw.into(),
            info,
            code: code::OK,
            message: String::new(),
        }
    }

    /// Failed transfer
    pub fn failed(code: u32, message: impl Into<String>, info: TransferInfo) -> Self {
        Self {
            raw: Bytes::new(),
            info,
            code,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == code::OK
    }
}

/// Request payload as handed to the transport
#[derive(Debug, Clone, PartialEq)]
pub enum PlanBody {
    /// Pre-encoded bytes
    Bytes(Bytes),
    /// `multipart/form-data` fields
    Multipart(Vec<(String, String)>),
}

/// Everything a transport needs to execute one transfer
#[derive(Debug, Clone)]
pub struct TransferPlan {
    pub url: String,
    pub method: Method,
    pub body: Option<PlanBody>,
    /// Fully merged options, headers included
    pub options: TransferOptions,
}

/// An HTTP(S) client primitive
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a plan to completion
    async fn execute(&self, plan: &TransferPlan) -> RawTransfer;

    /// Smallest timeout unit this transport honours
    fn timeout_granularity(&self) -> Duration {
        Duration::from_millis(1)
    }
}
