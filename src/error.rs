// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Error types for volley
//!
//! Transfer failures form a closed taxonomy ([`ErrorKind`]). Each failure
//! carries the transport code and message plus a snapshot of the request
//! that triggered it, so callers can match on the kind without parsing
//! message strings.

use std::fmt;

use reqwest::Method;
use thiserror::Error;

use crate::transport::code;

/// Result type alias for volley operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for volley
#[derive(Error, Debug)]
pub enum Error {
    /// Transfer failed (transport failure or strict status check)
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Response state was read before the request completed
    #[error("Request not submitted.")]
    NotSubmitted,

    /// Request was handed to an executor a second time
    #[error("Request to {0} cannot be reused")]
    AlreadySubmitted(RequestRef),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Closed set of transfer failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// URL malformed or scheme unsupported
    BadUrl,
    /// Host name could not be resolved
    DnsFailure,
    /// No connection to a resolved host
    ConnectFailure,
    /// Connect, TLS or transfer deadline exceeded
    Timeout,
    /// Certificate, handshake or cipher failure
    Ssl,
    /// HTTP status outside [200, 299] under strict checking
    StatusCode,
    /// Any other transfer failure, including fatal multiplexer statuses
    Generic,
}

impl ErrorKind {
    /// Classify a transport code. Unknown codes are `Generic`.
    pub fn from_code(transport_code: u32) -> Self {
        match transport_code {
            code::UNSUPPORTED_PROTOCOL | code::URL_MALFORMAT => ErrorKind::BadUrl,
            code::COULDNT_RESOLVE_HOST => ErrorKind::DnsFailure,
            code::COULDNT_CONNECT => ErrorKind::ConnectFailure,
            code::HTTP_RETURNED_ERROR => ErrorKind::StatusCode,
            code::OPERATION_TIMEDOUT => ErrorKind::Timeout,
            code::PEER_FAILED_VERIFICATION
            | code::SSL_CACERT
            | code::SSL_CACERT_BADFILE
            | code::SSL_CERTPROBLEM
            | code::SSL_CIPHER
            | code::SSL_CONNECT_ERROR
            | code::SSL_CRL_BADFILE
            | code::SSL_ENGINE_INITFAILED
            | code::SSL_ENGINE_NOTFOUND
            | code::SSL_ENGINE_SETFAILED
            | code::SSL_ISSUER_ERROR
            | code::SSL_SHUTDOWN_FAILED
            | code::USE_SSL_FAILED => ErrorKind::Ssl,
            _ => ErrorKind::Generic,
        }
    }

    /// Short stable name
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BadUrl => "bad url",
            ErrorKind::DnsFailure => "dns failure",
            ErrorKind::ConnectFailure => "connect failure",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Ssl => "ssl",
            ErrorKind::StatusCode => "status code",
            ErrorKind::Generic => "transfer failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies the request behind a failure
///
/// A snapshot, not a handle: the request stays owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRef {
    pub method: Method,
    pub url: String,
}

impl RequestRef {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
        }
    }
}

impl fmt::Display for RequestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A classified transfer failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} [{code}]: {message}")]
pub struct TransferError {
    /// Taxonomy kind
    pub kind: ErrorKind,
    /// Transport code (or multiplexer status for batch aborts)
    pub code: u32,
    /// Transport or engine message
    pub message: String,
    /// Originating request, absent for batch-level failures
    pub request: Option<RequestRef>,
}

impl TransferError {
    /// Classify a transport code into a failure
    pub fn from_transport(code: u32, message: impl Into<String>, request: RequestRef) -> Self {
        Self {
            kind: ErrorKind::from_code(code),
            code,
            message: message.into(),
            request: Some(request),
        }
    }

    /// Strict status check failure
    pub fn status(status: u16, request: RequestRef) -> Self {
        Self {
            kind: ErrorKind::StatusCode,
            code: code::HTTP_RETURNED_ERROR,
            message: format!("HTTP Error: ({}) from {}", status, request.url),
            request: Some(request),
        }
    }

    /// Batch-level failure not tied to one request
    pub fn generic(code: u32, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Generic,
            code,
            message: message.into(),
            request: None,
        }
    }

    /// URL of the originating request, if any
    pub fn url(&self) -> Option<&str> {
        self.request.as_ref().map(|r| r.url.as_str())
    }
}

impl Error {
    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Taxonomy kind, for transfer failures
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Transfer(err) => Some(err.kind),
            _ => None,
        }
    }

    /// The transfer failure, if this is one
    pub fn as_transfer(&self) -> Option<&TransferError> {
        match self {
            Error::Transfer(err) => Some(err),
            _ => None,
        }
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        self.kind() == Some(ErrorKind::Timeout)
    }

    /// Check if this is a strict status failure
    pub fn is_status(&self) -> bool {
        self.kind() == Some(ErrorKind::StatusCode)
    }

    /// Check if this is a caller programming error rather than a transfer failure
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::NotSubmitted | Error::AlreadySubmitted(_))
    }

    /// Get URL if available
    pub fn url(&self) -> Option<&str> {
        match self {
            Error::Transfer(err) => err.url(),
            Error::AlreadySubmitted(req) => Some(&req.url),
            _ => None,
        }
    }
}
