//! Cross-context fetch relay
//!
//! Some object-store URLs cannot be fetched from the main context because of
//! the origin policy. A sandboxed child context, reachable only by message
//! passing, fetches them on our behalf. [`ProxyChannel`] owns the handshake,
//! the pending-request table and the per-request timeouts; [`RelayContext`]
//! is the built-in child.

pub mod channel;
pub mod protocol;
pub mod relay;

pub use channel::{ChannelState, ChildContext, ChildLink, ProxyChannel, ProxyConfig};
pub use protocol::{ChildMessage, ParentMessage, ProxyRequest, ProxyResponse, RequestId};
pub use relay::RelayContext;

use storyvault_api::ResolveError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProxyError {
    #[error("child context did not become ready within {0} ms")]
    HandshakeTimeout(u64),
    #[error("proxy request {0} timed out")]
    Timeout(RequestId),
    #[error("child context failed: {0}")]
    ChildFailed(String),
    #[error("proxy channel is closed")]
    Unavailable,
    #[error("relayed fetch failed: {0}")]
    Remote(String),
}

impl ProxyError {
    /// True when the channel never got to dispatch the request.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            ProxyError::HandshakeTimeout(_) | ProxyError::ChildFailed(_) | ProxyError::Unavailable
        )
    }
}

impl From<ProxyError> for ResolveError {
    fn from(err: ProxyError) -> Self {
        match err {
            ProxyError::HandshakeTimeout(_) | ProxyError::Timeout(_) => {
                ResolveError::Timeout(err.to_string())
            }
            other => ResolveError::Network(other.to_string()),
        }
    }
}
