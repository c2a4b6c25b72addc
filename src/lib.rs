// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! # Volley - HTTP Client Engine
//!
//! Issues single HTTP requests or whole batches driven concurrently over one
//! multiplexed loop, captures status, headers and body, and classifies
//! failures into a closed taxonomy.
//!
//! ## Features
//!
//! - Single-use requests: response state is written once, read many times
//! - Parallel batches: one task, one multiplexer, per-request failures
//! - Typed failures: DNS, connect, timeout, TLS, status and bad-URL kinds
//! - Layered options: engine defaults, engine config, per-request overrides
//! - Cookie jars: quote-aware `Set-Cookie` tokenizer and Netscape jar files
//! - Pluggable transports: reqwest (rustls) by default
//!
//! ## Example
//!
//! ```rust,no_run
//! use volley::{HttpClient, Request};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpClient::new();
//!
//!     let mut req = Request::get("https://example.com/").timeout_ms(2000);
//!     client.submit(&mut req).await?;
//!     println!("{} {}", req.status()?, req.text()?);
//!
//!     let mut batch = vec![
//!         Request::get("https://example.com/a"),
//!         Request::get("https://example.com/b").fail_if_not_2xx(false),
//!     ];
//!     client.submit_all(&mut batch).await?;
//!     for req in &batch {
//!         match req.failure()? {
//!             Some(failure) => println!("{} failed: {}", req.get_url(), failure),
//!             None => println!("{} -> {}", req.get_url(), req.status()?),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod http;
pub mod transport;

// Re-exports for convenience

// Engine
pub use http::{EngineConfig, HttpClient};

// Requests and responses
pub use http::{HeaderField, PostBody, Request, ResponseHeaders};

// Options
pub use http::{AuthScheme, CertEncoding, HttpVersion, TransferOptions, DEFAULT_OPTIONS};

// Cookies
pub use http::{parse_cookie_header, CookieAttr, CookieElement, CookieJar};

// Transport
pub use transport::{ReqwestTransport, TransferInfo, Transport};

// Errors
pub use error::{Error, ErrorKind, Result, TransferError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
