use super::ProxyError;
use super::protocol::{ChildMessage, ParentMessage, ProxyRequest, ProxyResponse, RequestId};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use storyvault_api::{FetchFormat, Payload};
use tokio::sync::{OnceCell, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Both ends of a freshly launched child context.
pub struct ChildLink {
    pub outbound: mpsc::UnboundedSender<ParentMessage>,
    pub inbound: mpsc::UnboundedReceiver<ChildMessage>,
    /// Cancelling releases the child.
    pub shutdown: CancellationToken,
}

/// Something that can start a sandboxed child context.
#[async_trait]
pub trait ChildContext: Send + Sync {
    async fn launch(&self) -> Result<ChildLink, ProxyError>;
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub handshake_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_millis(crate::config::DEFAULT_HANDSHAKE_TIMEOUT_MS),
            request_timeout: Duration::from_millis(crate::config::DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }
}

impl From<&crate::config::EngineConfig> for ProxyConfig {
    fn from(value: &crate::config::EngineConfig) -> Self {
        Self {
            handshake_timeout: value.handshake_timeout(),
            request_timeout: value.request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChannelState {
    Idle = 0,
    Initializing = 1,
    Ready = 2,
    Failed = 3,
    Closed = 4,
}

impl ChannelState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ChannelState::Idle,
            1 => ChannelState::Initializing,
            2 => ChannelState::Ready,
            3 => ChannelState::Failed,
            _ => ChannelState::Closed,
        }
    }
}

struct PendingRequest {
    request: ProxyRequest,
    completion: oneshot::Sender<Result<Payload, ProxyError>>,
}

type PendingTable = Arc<DashMap<RequestId, PendingRequest>>;

struct Connection {
    outbound: mpsc::UnboundedSender<ParentMessage>,
    shutdown: CancellationToken,
    listener: JoinHandle<()>,
}

struct ChannelInner {
    context: Arc<dyn ChildContext>,
    config: ProxyConfig,
    pending: PendingTable,
    next_id: AtomicU64,
    state: AtomicU8,
    connection: OnceCell<Connection>,
}

impl Drop for ChannelInner {
    fn drop(&mut self) {
        if let Some(conn) = self.connection.get() {
            conn.shutdown.cancel();
            conn.listener.abort();
        }
    }
}

/// Typed request/response channel to a child context.
///
/// Cheap to clone; clones share the child, the pending table and the id
/// counter.
#[derive(Clone)]
pub struct ProxyChannel {
    inner: Arc<ChannelInner>,
}

impl ProxyChannel {
    pub fn new(context: Arc<dyn ChildContext>, config: ProxyConfig) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                context,
                config,
                pending: Arc::new(DashMap::new()),
                next_id: AtomicU64::new(0),
                state: AtomicU8::new(ChannelState::Idle as u8),
                connection: OnceCell::new(),
            }),
        }
    }

    pub fn state(&self) -> ChannelState {
        ChannelState::from_u8(self.inner.state.load(Ordering::SeqCst))
    }

    /// Requests dispatched and not yet settled.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    fn set_state(&self, state: ChannelState) {
        // Closed is terminal.
        let _ = self
            .inner
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current != ChannelState::Closed as u8).then_some(state as u8)
            });
    }

    /// Start the child and wait for its ready signal.
    ///
    /// Concurrent callers share one in-flight attempt. After a failure the
    /// next call tries again with a fresh child.
    pub async fn initialize(&self) -> Result<(), ProxyError> {
        self.connection().await.map(|_| ())
    }

    async fn connection(&self) -> Result<&Connection, ProxyError> {
        if self.state() == ChannelState::Closed {
            return Err(ProxyError::Unavailable);
        }
        self.inner
            .connection
            .get_or_try_init(|| self.connect())
            .await
    }

    async fn connect(&self) -> Result<Connection, ProxyError> {
        self.set_state(ChannelState::Initializing);
        tracing::debug!("Launching proxy child context");

        match self.handshake().await {
            Ok(conn) => {
                self.set_state(ChannelState::Ready);
                tracing::info!("Proxy child context ready");
                Ok(conn)
            }
            Err(e) => {
                self.set_state(ChannelState::Failed);
                tracing::warn!("Proxy child context failed to initialize: {}", e);
                Err(e)
            }
        }
    }

    async fn handshake(&self) -> Result<Connection, ProxyError> {
        // Launch and the ready announcement share one deadline.
        let timeout = self.inner.config.handshake_timeout;
        let attempt = async {
            let mut link = self.inner.context.launch().await?;
            // Cancels the child if the handshake fails or is abandoned.
            let guard = link.shutdown.clone().drop_guard();
            wait_ready(&mut link.inbound).await?;
            guard.disarm();
            Ok::<_, ProxyError>(link)
        };
        let ChildLink {
            outbound,
            inbound,
            shutdown,
        } = match tokio::time::timeout(timeout, attempt).await {
            Ok(result) => result?,
            Err(_) => return Err(ProxyError::HandshakeTimeout(timeout.as_millis() as u64)),
        };

        let listener = tokio::spawn(listen(
            Arc::clone(&self.inner.pending),
            inbound,
            shutdown.clone(),
        ));

        Ok(Connection {
            outbound,
            shutdown,
            listener,
        })
    }

    /// Relay a fetch through the child context.
    ///
    /// Settles exactly once: with the child's reply, or with
    /// [`ProxyError::Timeout`] if none arrives in time. A reply arriving after
    /// the timeout is dropped by the listener.
    pub async fn fetch(&self, url: &str, format: FetchFormat) -> Result<Payload, ProxyError> {
        let conn = self.connection().await?;
        if self.state() == ChannelState::Closed {
            return Err(ProxyError::Unavailable);
        }

        let id = RequestId(self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let request = ProxyRequest {
            id,
            url: url.to_string(),
            desired_format: format,
            created_at: Instant::now(),
        };
        let message = request.to_message();

        let (tx, rx) = oneshot::channel();
        self.inner.pending.insert(
            id,
            PendingRequest {
                request,
                completion: tx,
            },
        );
        // Removes the entry however this future ends, including when the
        // caller drops it.
        let _slot = PendingSlot {
            pending: &self.inner.pending,
            id,
        };

        if conn.outbound.send(message).is_err() {
            return Err(ProxyError::ChildFailed(
                "child context is no longer receiving".to_string(),
            ));
        }
        tracing::debug!(request_id = %id, url, "Dispatched proxy fetch");

        match tokio::time::timeout(self.inner.config.request_timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(ProxyError::Unavailable),
            Err(_) => {
                tracing::warn!(request_id = %id, url, "Proxy fetch timed out");
                Err(ProxyError::Timeout(id))
            }
        }
    }

    /// Release the child context and stop listening.
    ///
    /// Requests still pending are not cancelled; they run into their timeout.
    pub fn teardown(&self) {
        self.inner
            .state
            .store(ChannelState::Closed as u8, Ordering::SeqCst);
        if let Some(conn) = self.inner.connection.get() {
            conn.shutdown.cancel();
            conn.listener.abort();
        }
        tracing::debug!(
            pending = self.inner.pending.len(),
            "Proxy channel torn down"
        );
    }
}

struct PendingSlot<'a> {
    pending: &'a DashMap<RequestId, PendingRequest>,
    id: RequestId,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.id);
    }
}

async fn wait_ready(inbound: &mut mpsc::UnboundedReceiver<ChildMessage>) -> Result<(), ProxyError> {
    while let Some(message) = inbound.recv().await {
        match message {
            ChildMessage::ProxyReady => return Ok(()),
            ChildMessage::ProxyError { error } => return Err(ProxyError::ChildFailed(error)),
            ChildMessage::FileContent { request_id, .. } => {
                tracing::warn!(request_id = %request_id, "Reply received before handshake, dropping");
            }
        }
    }
    Err(ProxyError::ChildFailed(
        "child context closed during handshake".to_string(),
    ))
}

async fn listen(
    pending: PendingTable,
    mut inbound: mpsc::UnboundedReceiver<ChildMessage>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            message = inbound.recv() => match message {
                Some(message) => settle(&pending, message),
                None => {
                    tracing::warn!("Proxy child context closed its channel");
                    break;
                }
            },
        }
    }
}

fn settle(pending: &DashMap<RequestId, PendingRequest>, message: ChildMessage) {
    match message {
        ChildMessage::FileContent { .. } => {
            let Some(response) = ProxyResponse::from_message(message) else {
                return;
            };
            match pending.remove(&response.id) {
                Some((id, entry)) => {
                    tracing::debug!(
                        request_id = %id,
                        url = %entry.request.url,
                        elapsed_ms = entry.request.created_at.elapsed().as_millis() as u64,
                        ok = response.outcome.is_ok(),
                        "Proxy fetch settled"
                    );
                    // The receiver is gone if the caller timed out in the
                    // meantime; nothing else to do.
                    let _ = entry
                        .completion
                        .send(response.outcome.map_err(ProxyError::Remote));
                }
                None => {
                    tracing::warn!(
                        request_id = %response.id,
                        "Dropping proxy reply with no pending request"
                    );
                }
            }
        }
        ChildMessage::ProxyReady => {
            tracing::debug!("Ignoring repeated ready signal");
        }
        ChildMessage::ProxyError { error } => {
            tracing::warn!("Proxy child context reported: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_entry(id: u64) -> (PendingRequest, oneshot::Receiver<Result<Payload, ProxyError>>) {
        let (tx, rx) = oneshot::channel();
        let request = ProxyRequest {
            id: RequestId(id),
            url: format!("https://example.com/{id}"),
            desired_format: FetchFormat::Text,
            created_at: Instant::now(),
        };
        (
            PendingRequest {
                request,
                completion: tx,
            },
            rx,
        )
    }

    #[test]
    fn settle_delivers_once_and_drops_duplicates() {
        let pending = DashMap::new();
        let (entry, mut rx) = pending_entry(1);
        pending.insert(RequestId(1), entry);

        let reply = ChildMessage::success(RequestId(1), "u", Payload::Text("a".into()));
        settle(&pending, reply.clone());
        assert!(pending.is_empty());
        assert_eq!(rx.try_recv().unwrap(), Ok(Payload::Text("a".into())));

        // Duplicate reply: no entry, nothing happens.
        settle(&pending, reply);
        assert!(pending.is_empty());
    }

    #[test]
    fn settle_routes_by_id() {
        let pending = DashMap::new();
        let (first, mut rx1) = pending_entry(1);
        let (second, mut rx2) = pending_entry(2);
        pending.insert(RequestId(1), first);
        pending.insert(RequestId(2), second);

        settle(&pending, ChildMessage::failure(RequestId(2), "u", "HTTP 500"));
        assert_eq!(pending.len(), 1);
        assert!(rx1.try_recv().is_err());
        assert_eq!(
            rx2.try_recv().unwrap(),
            Err(ProxyError::Remote("HTTP 500".into()))
        );
    }

    #[test]
    fn closed_state_is_terminal() {
        struct NeverLaunch;
        #[async_trait]
        impl ChildContext for NeverLaunch {
            async fn launch(&self) -> Result<ChildLink, ProxyError> {
                Err(ProxyError::ChildFailed("unused".into()))
            }
        }

        let channel = ProxyChannel::new(Arc::new(NeverLaunch), ProxyConfig::default());
        assert_eq!(channel.state(), ChannelState::Idle);
        channel.teardown();
        channel.set_state(ChannelState::Ready);
        assert_eq!(channel.state(), ChannelState::Closed);
    }
}
