use super::ProxyError;
use super::channel::{ChildContext, ChildLink};
use super::protocol::{ChildMessage, ParentMessage};
use async_trait::async_trait;
use std::sync::Arc;
use storyvault_api::Fetcher;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Built-in child context: a task that relays `fetchFile` requests through
/// its own fetcher and answers with `fileContent`.
///
/// The relay's fetcher is expected to run with a different trust posture
/// than the parent's direct fetcher (typically no origin restriction).
pub struct RelayContext {
    fetcher: Arc<dyn Fetcher>,
}

impl RelayContext {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl ChildContext for RelayContext {
    async fn launch(&self) -> Result<ChildLink, ProxyError> {
        let (parent_tx, child_rx) = mpsc::unbounded_channel::<ParentMessage>();
        let (child_tx, parent_rx) = mpsc::unbounded_channel::<ChildMessage>();
        let shutdown = CancellationToken::new();

        tokio::spawn(run_relay(
            Arc::clone(&self.fetcher),
            child_rx,
            child_tx,
            shutdown.clone(),
        ));

        Ok(ChildLink {
            outbound: parent_tx,
            inbound: parent_rx,
            shutdown,
        })
    }
}

async fn run_relay(
    fetcher: Arc<dyn Fetcher>,
    mut requests: mpsc::UnboundedReceiver<ParentMessage>,
    replies: mpsc::UnboundedSender<ChildMessage>,
    shutdown: CancellationToken,
) {
    if replies.send(ChildMessage::ProxyReady).is_err() {
        return;
    }

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            request = requests.recv() => {
                let Some(ParentMessage::FetchFile { url, content_type, request_id }) = request else {
                    break;
                };

                if url::Url::parse(&url).is_err() {
                    let _ = replies.send(ChildMessage::failure(request_id, url, "invalid url"));
                    continue;
                }

                // Requests are served concurrently; replies go out in
                // completion order.
                let fetcher = Arc::clone(&fetcher);
                let replies = replies.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    let reply = tokio::select! {
                        _ = shutdown.cancelled() => return,
                        result = fetcher.fetch(&url, content_type) => match result {
                            Ok(content) => ChildMessage::success(request_id, url.as_str(), content),
                            Err(e) => ChildMessage::failure(request_id, url.as_str(), e.to_string()),
                        },
                    };
                    let _ = replies.send(reply);
                });
            }
        }
    }
    tracing::debug!("Relay child context stopped");
}
