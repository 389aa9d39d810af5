//! Invocation dispatch: operation -> request envelope -> member -> typed result.
//!
//! # Components
//!
//! - [`Dispatcher`]: builds the envelope, picks the target and hands it to the
//!   shared [`Transport`]
//! - [`PendingResult`]: future completing with the decoded value or a
//!   translated [`JetError`]
//! - [`translate`]: maps transport, remote and decoding failures onto the
//!   client error taxonomy
//!
//! # Guarantees
//!
//! Exactly one exchange per invocation. No retry and no timeout happen here;
//! liveness is the transport's concern. Nothing is sent until the pending
//! result is first polled.

pub mod translate;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

use crate::cluster::{Member, MembershipSnapshot};
use crate::error::{DecodeError, JetError, Result};
use crate::protocol::codec::{Codec, EncodedRequest};
use crate::protocol::{ClientMessage, ResponseBody};
use crate::transport::Transport;

pub use translate::{peel, translate, RawFailure};

/// Where an invocation is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Let the transport choose an endpoint.
    Any,
    Member(Member),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Any => write!(f, "any"),
            Target::Member(member) => write!(f, "{}", member.address),
        }
    }
}

/// Asynchronous completion of one invocation.
#[must_use = "pending results do nothing unless awaited"]
pub struct PendingResult<T> {
    inner: BoxFuture<'static, Result<T>>,
}

impl<T: Send + 'static> PendingResult<T> {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            inner: future.boxed(),
        }
    }

    /// A result that fails without sending anything.
    pub fn failed(error: JetError) -> Self {
        Self::new(async move { Err(error) })
    }

    pub fn map<U, F>(self, f: F) -> PendingResult<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        PendingResult::new(async move { self.await.map(f) })
    }
}

impl<T> Future for PendingResult<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl<T> fmt::Debug for PendingResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingResult").finish_non_exhaustive()
    }
}

/// Turns encoded operations into invocations over a shared transport.
///
/// Cheap to clone; clones share the transport and the correlation counter.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    next_correlation_id: Arc<AtomicU64>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            next_correlation_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn members(&self) -> MembershipSnapshot {
        self.transport.members()
    }

    /// Resolve the coordinator from a fresh membership snapshot.
    pub fn coordinator(&self) -> Result<Member> {
        self.transport.members().coordinator().cloned()
    }

    /// Dispatch `request` to `target`, decoding a successful response with
    /// `decode`.
    pub fn invoke<T, D>(&self, request: EncodedRequest, target: Target, decode: D) -> PendingResult<T>
    where
        T: Send + 'static,
        D: FnOnce(Value) -> std::result::Result<T, DecodeError> + Send + 'static,
    {
        let correlation_id = self.next_correlation_id.fetch_add(1, Ordering::Relaxed);
        let operation = request.operation;
        let message = ClientMessage {
            correlation_id,
            operation,
            payload: request.payload,
        };
        let transport = self.transport.clone();

        PendingResult::new(async move {
            tracing::debug!(
                operation = %operation,
                correlation_id,
                target = %target,
                "Dispatching invocation"
            );

            let member = match &target {
                Target::Any => None,
                Target::Member(member) => Some(member),
            };
            let response = transport
                .send(member, message)
                .await
                .map_err(|e| translate(RawFailure::Transport(e)))?;

            if response.correlation_id != correlation_id {
                return Err(translate(RawFailure::Decode(DecodeError::new(
                    operation,
                    format!(
                        "correlation id mismatch: sent {}, received {}",
                        correlation_id, response.correlation_id
                    ),
                ))));
            }

            match response.body {
                ResponseBody::Ok(payload) => {
                    decode(payload).map_err(|e| translate(RawFailure::Decode(e)))
                }
                ResponseBody::Err(failure) => {
                    tracing::debug!(
                        operation = %operation,
                        correlation_id,
                        failure = %failure,
                        "Invocation failed remotely"
                    );
                    Err(translate(RawFailure::Remote(failure)))
                }
            }
        })
    }

    /// Encode with `C` and decode with `C`'s response decoder.
    pub fn invoke_codec<C>(&self, request: &C::Request, target: Target) -> PendingResult<C::Response>
    where
        C: Codec + 'static,
        C::Response: Send + 'static,
    {
        match C::encode_request(request) {
            Ok(encoded) => self.invoke(encoded, target, C::decode_response),
            Err(e) => PendingResult::failed(e),
        }
    }

    /// Route a cluster-wide operation to the coordinator. Fails without
    /// sending anything when the membership is empty.
    pub fn invoke_on_coordinator<C>(&self, request: &C::Request) -> PendingResult<C::Response>
    where
        C: Codec + 'static,
        C::Response: Send + 'static,
    {
        match self.coordinator() {
            Ok(member) => self.invoke_codec::<C>(request, Target::Member(member)),
            Err(e) => PendingResult::failed(e),
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field(
                "next_correlation_id",
                &self.next_correlation_id.load(Ordering::Relaxed),
            )
            .finish_non_exhaustive()
    }
}
