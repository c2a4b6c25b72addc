// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Multiplexer driving many transfers from one task
//!
//! All registered transfers live in a single `FuturesUnordered` polled by
//! the caller's task; nothing is spawned. `perform` makes whatever progress
//! is possible without blocking, `wait` blocks until a transfer completes or
//! the wait bound elapses, and `info_read` hands out completed transfers.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};

use super::{RawTransfer, Transport, TransferPlan};

/// Fatal multiplexer status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiStatus {
    /// Unknown or duplicate handle
    BadHandle,
    /// The batch ran past its deadline
    DeadlineExceeded,
}

impl MultiStatus {
    /// Numeric status, reported as the code of batch failures
    pub fn code(&self) -> u32 {
        match self {
            MultiStatus::BadHandle => 1,
            MultiStatus::DeadlineExceeded => 100,
        }
    }
}

impl fmt::Display for MultiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MultiStatus::BadHandle => write!(f, "bad handle"),
            MultiStatus::DeadlineExceeded => write!(f, "batch deadline exceeded"),
        }
    }
}

/// A finished transfer and the handle it was registered under
#[derive(Debug)]
pub struct Completion {
    pub handle: usize,
    pub transfer: RawTransfer,
}

/// Drives registered transfers concurrently
pub struct Multiplexer<'a> {
    in_flight: FuturesUnordered<BoxFuture<'a, Completion>>,
    handles: HashSet<usize>,
    ready: VecDeque<Completion>,
    deadline: Option<Instant>,
}

impl<'a> Multiplexer<'a> {
    /// Create a multiplexer; `deadline` bounds the whole batch
    pub fn new(deadline: Option<Duration>) -> Self {
        Self {
            in_flight: FuturesUnordered::new(),
            handles: HashSet::new(),
            ready: VecDeque::new(),
            deadline: deadline.map(|d| Instant::now() + d),
        }
    }

    /// Register a transfer under `handle`. It starts on the next `perform`.
    pub fn register<T>(
        &mut self,
        handle: usize,
        transport: &'a T,
        plan: TransferPlan,
    ) -> Result<(), MultiStatus>
    where
        T: Transport + ?Sized,
    {
        if !self.handles.insert(handle) {
            return Err(MultiStatus::BadHandle);
        }
        self.in_flight.push(
            async move {
                let transfer = transport.execute(&plan).await;
                Completion { handle, transfer }
            }
            .boxed(),
        );
        Ok(())
    }

    /// Advance every transfer as far as possible without blocking.
    /// Returns the number still running.
    pub fn perform(&mut self) -> Result<usize, MultiStatus> {
        while let Some(Some(done)) = self.in_flight.next().now_or_never() {
            self.ready.push_back(done);
        }
        self.check_deadline()?;
        Ok(self.in_flight.len())
    }

    /// Block until at least one transfer completes or `timeout` elapses.
    /// Returns the number of completions ready to read.
    pub async fn wait(&mut self, timeout: Duration) -> Result<usize, MultiStatus> {
        if self.ready.is_empty() && !self.in_flight.is_empty() {
            let budget = match self.deadline {
                Some(deadline) => timeout.min(deadline.saturating_duration_since(Instant::now())),
                None => timeout,
            };
            if let Ok(Some(done)) = tokio::time::timeout(budget, self.in_flight.next()).await {
                self.ready.push_back(done);
            }
        }
        self.check_deadline()?;
        Ok(self.ready.len())
    }

    /// Next completed transfer, if any
    pub fn info_read(&mut self) -> Result<Option<Completion>, MultiStatus> {
        match self.ready.pop_front() {
            Some(done) if !self.handles.contains(&done.handle) => Err(MultiStatus::BadHandle),
            other => Ok(other),
        }
    }

    /// Deregister a handle whose completion has been processed
    pub fn remove(&mut self, handle: usize) -> Result<(), MultiStatus> {
        if self.handles.remove(&handle) {
            Ok(())
        } else {
            Err(MultiStatus::BadHandle)
        }
    }

    /// Transfers not yet completed
    pub fn running(&self) -> usize {
        self.in_flight.len()
    }

    /// Handles still registered
    pub fn registered(&self) -> usize {
        self.handles.len()
    }

    /// Drop any unfinished transfers
    pub fn close(self) {
        drop(self);
    }

    fn check_deadline(&self) -> Result<(), MultiStatus> {
        match self.deadline {
            Some(deadline) if !self.in_flight.is_empty() && Instant::now() >= deadline => {
                Err(MultiStatus::DeadlineExceeded)
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::TransferOptions;
    use crate::transport::testing::ScriptedTransport;
    use crate::transport::code;
    use reqwest::Method;

    fn plan(url: &str) -> TransferPlan {
        TransferPlan {
            url: url.to_string(),
            method: Method::GET,
            body: None,
            options: TransferOptions::default(),
        }
    }

    async fn drain(multi: &mut Multiplexer<'_>) -> Vec<Completion> {
        let mut done = Vec::new();
        loop {
            let running = multi.perform().unwrap();
            while let Some(c) = multi.info_read().unwrap() {
                multi.remove(c.handle).unwrap();
                done.push(c);
            }
            if running == 0 {
                break;
            }
            multi.wait(Duration::from_millis(50)).await.unwrap();
        }
        done
    }

    #[tokio::test]
    async fn test_completes_all_handles() {
        let transport = ScriptedTransport::new()
            .reply("http://a.test/", 200, &[], "a")
            .reply("http://b.test/", 200, &[], "b")
            .delay("http://b.test/", Duration::from_millis(30));

        let mut multi = Multiplexer::new(None);
        multi.register(0, &transport, plan("http://a.test/")).unwrap();
        multi.register(1, &transport, plan("http://b.test/")).unwrap();
        multi.register(2, &transport, plan("http://missing.test/")).unwrap();

        let done = drain(&mut multi).await;
        assert_eq!(done.len(), 3);
        assert_eq!(multi.registered(), 0);

        let missing = done.iter().find(|c| c.handle == 2).unwrap();
        assert_eq!(missing.transfer.code, code::COULDNT_CONNECT);
        // the delayed transfer finishes last
        assert_eq!(done.last().unwrap().handle, 1);
        multi.close();
    }

    #[test]
    fn test_duplicate_handle_is_rejected() {
        let transport = ScriptedTransport::new();
        let mut multi = Multiplexer::new(None);
        multi.register(7, &transport, plan("http://a.test/")).unwrap();
        assert_eq!(
            multi.register(7, &transport, plan("http://a.test/")).unwrap_err(),
            MultiStatus::BadHandle
        );
        assert_eq!(multi.remove(8).unwrap_err(), MultiStatus::BadHandle);
    }

    #[tokio::test]
    async fn test_deadline_is_fatal() {
        let transport = ScriptedTransport::new()
            .reply("http://slow.test/", 200, &[], "")
            .delay("http://slow.test/", Duration::from_secs(5));

        let mut multi = Multiplexer::new(Some(Duration::from_millis(20)));
        multi.register(0, &transport, plan("http://slow.test/")).unwrap();
        assert_eq!(multi.perform().unwrap(), 1);

        let status = multi.wait(Duration::from_secs(1)).await;
        assert_eq!(status.unwrap_err(), MultiStatus::DeadlineExceeded);
    }

    #[test]
    fn test_wait_on_empty_returns_immediately() {
        let mut multi = Multiplexer::new(None);
        let ready = tokio_test::block_on(multi.wait(Duration::from_secs(10))).unwrap();
        assert_eq!(ready, 0);
        assert_eq!(multi.running(), 0);
    }
}
