#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use storyvault_api::{FetchError, FetchFormat, Fetcher, Payload};
use storyvault_core::proxy::{ChildContext, ChildLink, ChildMessage, ParentMessage, ProxyError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

type FetchFn = dyn Fn(&str) -> Result<Payload, FetchError> + Send + Sync;
type ProbeFn = dyn Fn(&str) -> Result<(), FetchError> + Send + Sync;

/// Fetcher answering from closures, counting calls.
pub struct TestFetcher {
    fetch: Box<FetchFn>,
    probe: Box<ProbeFn>,
    delay: Option<Box<dyn Fn(&str) -> Duration + Send + Sync>>,
    pub fetches: AtomicUsize,
    pub probes: AtomicUsize,
}

impl TestFetcher {
    pub fn new(
        fetch: impl Fn(&str) -> Result<Payload, FetchError> + Send + Sync + 'static,
        probe: impl Fn(&str) -> Result<(), FetchError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            fetch: Box::new(fetch),
            probe: Box::new(probe),
            delay: None,
            fetches: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
        }
    }

    /// Every fetch and probe refused by the origin policy.
    pub fn cors_blocked() -> Self {
        Self::new(
            |url| Err(FetchError::CorsBlocked(url.to_string())),
            |url| Err(FetchError::CorsBlocked(url.to_string())),
        )
    }

    /// Every fetch answers `text`, every probe succeeds.
    pub fn serving(text: &'static str) -> Self {
        Self::new(move |_| Ok(Payload::Text(text.to_string())), |_| Ok(()))
    }

    /// Answers `echo:<url>`.
    pub fn echo() -> Self {
        Self::new(|url| Ok(Payload::Text(format!("echo:{url}"))), |_| Ok(()))
    }

    pub fn with_delay(mut self, delay: impl Fn(&str) -> Duration + Send + Sync + 'static) -> Self {
        self.delay = Some(Box::new(delay));
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for TestFetcher {
    async fn fetch(&self, url: &str, _format: FetchFormat) -> Result<Payload, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = &self.delay {
            tokio::time::sleep(delay(url)).await;
        }
        (self.fetch)(url)
    }

    async fn probe(&self, url: &str) -> Result<(), FetchError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        (self.probe)(url)
    }
}

/// Child ends held by a test for a [`ManualChild`].
pub struct ChildEnds {
    pub requests: mpsc::UnboundedReceiver<ParentMessage>,
    pub replies: mpsc::UnboundedSender<ChildMessage>,
    pub shutdown: CancellationToken,
}

/// Child context whose side of the link is driven by the test itself.
/// Every launch hands out a fresh link; the child ends are queued for the
/// test to pick up.
#[derive(Default)]
pub struct ManualChild {
    ends: Mutex<Vec<ChildEnds>>,
    launches: AtomicUsize,
    announce_ready: bool,
}

impl ManualChild {
    /// A child that announces itself as soon as it is launched.
    pub fn ready() -> Self {
        Self {
            announce_ready: true,
            ..Default::default()
        }
    }

    /// A child that stays silent until the test speaks for it.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn take_ends(&self) -> ChildEnds {
        self.ends
            .lock()
            .expect("lock poisoned")
            .pop()
            .expect("child was never launched")
    }
}

#[async_trait]
impl ChildContext for ManualChild {
    async fn launch(&self) -> Result<ChildLink, ProxyError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        let (parent_tx, child_rx) = mpsc::unbounded_channel();
        let (child_tx, parent_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        if self.announce_ready {
            let _ = child_tx.send(ChildMessage::ProxyReady);
        }
        self.ends.lock().expect("lock poisoned").push(ChildEnds {
            requests: child_rx,
            replies: child_tx,
            shutdown: shutdown.clone(),
        });

        Ok(ChildLink {
            outbound: parent_tx,
            inbound: parent_rx,
            shutdown,
        })
    }
}

/// Wraps a child context and counts launches.
pub struct CountingChild<C> {
    inner: C,
    launches: AtomicUsize,
}

impl<C> CountingChild<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            launches: AtomicUsize::new(0),
        }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<C: ChildContext> ChildContext for CountingChild<C> {
    async fn launch(&self) -> Result<ChildLink, ProxyError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        // Give concurrent callers a chance to pile up on the handshake.
        tokio::task::yield_now().await;
        self.inner.launch().await
    }
}

/// Child context that can never be started.
pub struct BrokenChild;

#[async_trait]
impl ChildContext for BrokenChild {
    async fn launch(&self) -> Result<ChildLink, ProxyError> {
        Err(ProxyError::ChildFailed("sandbox unavailable".to_string()))
    }
}

/// Child context whose launch never completes.
pub struct HangingChild;

#[async_trait]
impl ChildContext for HangingChild {
    async fn launch(&self) -> Result<ChildLink, ProxyError> {
        std::future::pending().await
    }
}
