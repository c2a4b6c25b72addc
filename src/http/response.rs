// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Response parsing
//!
//! Transports hand back the header blocks of every hop followed by the final
//! body. Only the final hop's headers are kept.

use bytes::Bytes;

use crate::transport::TransferInfo;

const HEADER_BLOCK_END: &str = "\r\n\r\n";

/// Value(s) of one response header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderField {
    /// Header appeared once
    Single(String),
    /// Header repeated; values in occurrence order
    Multiple(Vec<String>),
}

impl HeaderField {
    /// First value
    pub fn first(&self) -> &str {
        match self {
            HeaderField::Single(v) => v,
            HeaderField::Multiple(vs) => vs.first().map(String::as_str).unwrap_or(""),
        }
    }

    /// All values
    pub fn values(&self) -> Vec<&str> {
        match self {
            HeaderField::Single(v) => vec![v.as_str()],
            HeaderField::Multiple(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            HeaderField::Single(_) => 1,
            HeaderField::Multiple(vs) => vs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, value: String) {
        match self {
            HeaderField::Single(existing) => {
                let first = std::mem::take(existing);
                *self = HeaderField::Multiple(vec![first, value]);
            }
            HeaderField::Multiple(vs) => vs.push(value),
        }
    }
}

/// Response headers keyed by name, in first-seen order.
///
/// Names compare ASCII case-insensitively; the first spelling seen is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    entries: Vec<(String, HeaderField)>,
}

impl ResponseHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, folding repeats into [`HeaderField::Multiple`]
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some((_, field)) => field.push(value),
            None => self.entries.push((name, HeaderField::Single(value))),
        }
    }

    pub fn get(&self, name: &str) -> Option<&HeaderField> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, f)| f)
    }

    /// First value of a header
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name).map(HeaderField::first)
    }

    /// All values of a header, empty if absent
    pub fn values(&self, name: &str) -> Vec<&str> {
        self.get(name).map(HeaderField::values).unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderField)> {
        self.entries.iter().map(|(n, f)| (n.as_str(), f))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Structured view of a raw transport response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResponse {
    pub status: u16,
    /// Status line of the final hop, e.g. `HTTP/1.1 200 OK`
    pub status_line: Option<String>,
    pub headers: ResponseHeaders,
    pub body: Bytes,
}

/// Split a header-inclusive raw response into status, headers and body.
pub fn parse(raw: &[u8], info: &TransferInfo) -> ParsedResponse {
    let split = info.header_size.min(raw.len());
    let header_section = String::from_utf8_lossy(&raw[..split]);
    let body = Bytes::copy_from_slice(&raw[split..]);

    let block = final_block(&header_section, info.redirect_count as usize);

    let mut status_line = None;
    let mut headers = ResponseHeaders::new();
    for line in block.split("\r\n").filter(|l| !l.is_empty()) {
        if status_line.is_none() && headers.is_empty() && line.starts_with("HTTP/") {
            status_line = Some(line.to_string());
            continue;
        }
        match line.split_once(": ") {
            Some((name, value)) => headers.append(name, value),
            None => headers.append(line, ""),
        }
    }

    ParsedResponse {
        status: info.http_code,
        status_line,
        headers,
        body,
    }
}

/// Header block of the final hop. With redirects the section holds one block
/// per hop; earlier hops are discarded.
fn final_block(section: &str, redirect_count: usize) -> &str {
    if redirect_count == 0 {
        return section;
    }
    let blocks: Vec<&str> = section.split(HEADER_BLOCK_END).collect();
    match blocks.get(redirect_count) {
        Some(block) => *block,
        None => blocks
            .iter()
            .rev()
            .find(|b| !b.is_empty())
            .copied()
            .unwrap_or(""),
    }
}
