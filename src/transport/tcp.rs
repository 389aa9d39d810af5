use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use rand::seq::SliceRandom;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::cluster::{Address, Member, MembershipSnapshot};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::protocol::{frame, ClientMessage, ResponseMessage};
use crate::transport::{Transport, TransportError};

type PendingMap = Arc<std::sync::Mutex<HashMap<u64, oneshot::Sender<ResponseMessage>>>>;
type FrameSink = SplitSink<Framed<TcpStream, LengthDelimitedCodec>, Bytes>;

/// One multiplexed connection to a member. Responses are matched to callers
/// by correlation id, so any number of requests may be in flight at once.
struct Connection {
    address: Address,
    writer: Mutex<FrameSink>,
    pending: PendingMap,
    closed: Arc<AtomicBool>,
    next_wire_id: AtomicU64,
    reader: JoinHandle<()>,
}

impl Connection {
    async fn open(
        address: &Address,
        connect_timeout: Duration,
        max_frame_length: usize,
    ) -> std::result::Result<Self, TransportError> {
        let connect = TcpStream::connect((address.host(), address.port()));
        let stream = match tokio::time::timeout(connect_timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(TransportError::ConnectFailed {
                    address: address.clone(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(TransportError::ConnectFailed {
                    address: address.clone(),
                    reason: format!("timed out after {}ms", connect_timeout.as_millis()),
                })
            }
        };
        stream.set_nodelay(true)?;

        let (writer, mut reader) = Framed::new(stream, frame::codec(max_frame_length)).split();
        let pending: PendingMap = Arc::new(std::sync::Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        let reader_pending = pending.clone();
        let reader_closed = closed.clone();
        let reader_address = address.clone();
        let reader = tokio::spawn(async move {
            while let Some(next) = reader.next().await {
                let bytes = match next {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::warn!(address = %reader_address, error = %e, "Connection read failed");
                        break;
                    }
                };
                let response: ResponseMessage = match frame::decode(&bytes) {
                    Ok(response) => response,
                    Err(e) => {
                        tracing::warn!(address = %reader_address, error = %e, "Malformed response frame, closing connection");
                        break;
                    }
                };
                let sender = reader_pending
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&response.correlation_id);
                match sender {
                    Some(tx) => {
                        // Caller may have dropped its pending result
                        let _ = tx.send(response);
                    }
                    None => {
                        tracing::debug!(
                            address = %reader_address,
                            correlation_id = response.correlation_id,
                            "Response for unknown correlation id"
                        );
                    }
                }
            }

            reader_closed.store(true, Ordering::SeqCst);
            // Dropping the senders fails every in-flight request on this connection
            reader_pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clear();
            tracing::info!(address = %reader_address, "Connection closed");
        });

        tracing::info!(address = %address, "Connected to member");

        Ok(Self {
            address: address.clone(),
            writer: Mutex::new(writer),
            pending,
            closed,
            next_wire_id: AtomicU64::new(1),
            reader,
        })
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn in_flight(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Fail every in-flight request and shut the socket down.
    async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        // Dropping the senders wakes their callers with ConnectionClosed
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.reader.abort();
        if let Err(e) = self.writer.lock().await.close().await {
            tracing::debug!(address = %self.address, error = %e, "Error closing connection");
        }
    }

    async fn call(
        &self,
        mut message: ClientMessage,
    ) -> std::result::Result<ResponseMessage, TransportError> {
        // Callers' ids are only unique per dispatcher; the wire uses ids
        // unique to this connection.
        let caller_id = message.correlation_id;
        let wire_id = self.next_wire_id.fetch_add(1, Ordering::Relaxed);
        message.correlation_id = wire_id;

        let bytes = frame::encode(&message).map_err(|e| TransportError::MalformedFrame {
            address: self.address.clone(),
            reason: e.to_string(),
        })?;

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            match pending.entry(wire_id) {
                Entry::Occupied(_) => {
                    return Err(TransportError::CorrelationInUse {
                        address: self.address.clone(),
                        correlation_id: wire_id,
                    })
                }
                Entry::Vacant(slot) => {
                    slot.insert(tx);
                }
            }
        }
        // Unregisters on every exit path, including the caller dropping us
        let _registration = Registration {
            pending: &self.pending,
            wire_id,
        };

        // Checked after registering so the reader's final drain cannot miss us
        if self.is_closed() {
            return Err(TransportError::ConnectionClosed(self.address.clone()));
        }

        // The writer lock covers a single frame write, never the round trip
        let sent = self.writer.lock().await.send(bytes).await;
        if let Err(e) = sent {
            self.closed.store(true, Ordering::SeqCst);
            return Err(TransportError::Io(e));
        }

        let mut response = rx
            .await
            .map_err(|_| TransportError::ConnectionClosed(self.address.clone()))?;
        response.correlation_id = caller_id;
        Ok(response)
    }
}

/// Pending-map slot owned by one in-flight call.
struct Registration<'a> {
    pending: &'a PendingMap,
    wire_id: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.wire_id);
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// [`Transport`] over plain TCP with one pooled connection per member.
pub struct TcpTransport {
    connect_timeout: Duration,
    max_frame_length: usize,
    membership: RwLock<MembershipSnapshot>,
    /// Connection pool keyed by member address
    connections: Mutex<HashMap<Address, Arc<Connection>>>,
}

impl TcpTransport {
    /// Build a transport from configuration without opening any connection.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            max_frame_length: config.max_frame_length,
            membership: RwLock::new(config.membership()?),
            connections: Mutex::new(HashMap::new()),
        })
    }

    /// Build a transport and connect to the first reachable configured member.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let transport = Self::new(config)?;
        let snapshot = transport.members();

        let mut last_error = TransportError::NoMemberAvailable;
        for member in snapshot.iter() {
            match transport.connection(&member.address).await {
                Ok(_) => return Ok(transport),
                Err(e) => {
                    tracing::warn!(member = %member, error = %e, "Member unreachable");
                    last_error = e;
                }
            }
        }
        Err(last_error.into())
    }

    /// Replace the membership view. Existing connections are kept.
    pub fn set_members(&self, snapshot: MembershipSnapshot) {
        *self
            .membership
            .write()
            .unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    /// Addresses with a live pooled connection.
    pub async fn connected_addresses(&self) -> Vec<Address> {
        self.connections
            .lock()
            .await
            .iter()
            .filter(|(_, conn)| !conn.is_closed())
            .map(|(addr, _)| addr.clone())
            .collect()
    }

    /// Close every pooled connection. In-flight requests fail with
    /// [`TransportError::ConnectionClosed`].
    pub async fn close(&self) {
        let closing: Vec<Arc<Connection>> = self
            .connections
            .lock()
            .await
            .drain()
            .map(|(_, conn)| conn)
            .collect();
        for conn in closing {
            conn.shutdown().await;
        }
    }

    /// Requests sent and still awaiting a response, across all connections.
    pub async fn in_flight_requests(&self) -> usize {
        self.connections
            .lock()
            .await
            .values()
            .map(|conn| conn.in_flight())
            .sum()
    }

    /// Get or create a pooled connection to `address`.
    async fn connection(
        &self,
        address: &Address,
    ) -> std::result::Result<Arc<Connection>, TransportError> {
        {
            let pool = self.connections.lock().await;
            if let Some(conn) = pool.get(address) {
                if !conn.is_closed() {
                    return Ok(conn.clone());
                }
            }
        }

        // Connect without holding the pool lock
        let conn = Arc::new(
            Connection::open(address, self.connect_timeout, self.max_frame_length).await?,
        );

        let mut pool = self.connections.lock().await;
        if let Some(existing) = pool.get(address) {
            if !existing.is_closed() {
                return Ok(existing.clone());
            }
        }
        pool.insert(address.clone(), conn.clone());
        Ok(conn)
    }

    /// Pick an endpoint for requests without a target: any member with a live
    /// connection, otherwise a random member of the snapshot.
    async fn any_member(&self) -> std::result::Result<Member, TransportError> {
        let snapshot = self.members();
        {
            let pool = self.connections.lock().await;
            let connected = snapshot.iter().find(|m| {
                pool.get(&m.address)
                    .map(|conn| !conn.is_closed())
                    .unwrap_or(false)
            });
            if let Some(member) = connected {
                return Ok(member.clone());
            }
        }

        snapshot
            .members()
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(TransportError::NoMemberAvailable)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    fn members(&self) -> MembershipSnapshot {
        self.membership
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn send(
        &self,
        target: Option<&Member>,
        message: ClientMessage,
    ) -> std::result::Result<ResponseMessage, TransportError> {
        let member = match target {
            Some(member) => member.clone(),
            None => self.any_member().await?,
        };
        let conn = self.connection(&member.address).await?;
        conn.call(message).await
    }
}
