//! Transport handle: the live connection to the cluster.
//!
//! The transport owns connection and membership machinery. Invocations share
//! it read-only; it never retries and imposes no per-request timeout.

pub mod tcp;

use async_trait::async_trait;
use thiserror::Error;

use crate::cluster::{Address, Member, MembershipSnapshot};
use crate::protocol::{ClientMessage, ResponseMessage};

pub use tcp::TcpTransport;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("No member available to send request to")]
    NoMemberAvailable,

    #[error("Failed to connect to {address}: {reason}")]
    ConnectFailed { address: Address, reason: String },

    #[error("Connection to {0} closed")]
    ConnectionClosed(Address),

    #[error("Correlation id {correlation_id} already in flight on {address}")]
    CorrelationInUse { address: Address, correlation_id: u64 },

    #[error("Malformed frame from {address}: {reason}")]
    MalformedFrame { address: Address, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Current membership as known to this transport.
    fn members(&self) -> MembershipSnapshot;

    /// Send one request and wait for its response.
    ///
    /// With `target == None` the transport routes to an endpoint of its
    /// choosing. A remote-raised failure is a successful exchange and comes
    /// back as a [`ResponseMessage`] carrying the failure.
    async fn send(
        &self,
        target: Option<&Member>,
        message: ClientMessage,
    ) -> Result<ResponseMessage, TransportError>;
}
