use std::collections::HashMap;
use std::future::Future;

use futures_util::{SinkExt, StreamExt};
use lipc_wire::{
    HeaderField, Message, MessageCodec, MessageType, ObjectPath, WireError, MAX_MESSAGE_SIZE,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Well-known name, path and interface of the message bus itself.
pub const BUS_NAME: &str = "org.freedesktop.DBus";
pub const BUS_PATH: &str = "/org/freedesktop/DBus";
pub const BUS_INTERFACE: &str = "org.freedesktop.DBus";

/// Configuration for a [`BusConnection`].
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Largest incoming message accepted. Default: 128 MiB.
    pub max_message_size: usize,
    /// Calls that may queue for the I/O task before `send` waits.
    pub outbound_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_message_size: MAX_MESSAGE_SIZE,
            outbound_capacity: 64,
        }
    }
}

type ReplySender = oneshot::Sender<Result<Message>>;

struct Outbound {
    message: Message,
    reply: ReplySender,
}

/// Multiplexes method calls over one bus stream.
///
/// The stream must already be authenticated and ready to carry messages.
/// A spawned I/O task owns it, assigns serials, and hands each reply to the
/// call whose serial it names. Dropping the connection stops the task and
/// fails every call still waiting with [`TransportError::Closed`].
pub struct BusConnection {
    outbound: mpsc::Sender<Outbound>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl BusConnection {
    /// Take over `stream` with default configuration.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        Self::with_config(stream, ConnectionConfig::default())
    }

    /// Take over `stream` with explicit configuration.
    pub fn with_config<S>(stream: S, config: ConnectionConfig) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let framed = Framed::new(
            stream,
            MessageCodec::with_max_message_size(config.max_message_size),
        );
        let (outbound, requests) = mpsc::channel(config.outbound_capacity.max(1));
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run_io(framed, requests, shutdown.clone()));

        Self {
            outbound,
            shutdown,
            task: Some(task),
        }
    }

    /// Register with the bus and return the unique name it assigned.
    ///
    /// A message bus expects this as the first call on a new connection.
    pub async fn hello(&self) -> Result<String> {
        let mut call = Message::method_call(ObjectPath::new(BUS_PATH)?, "Hello");
        call.headers.insert(HeaderField::Destination, BUS_NAME.into());
        call.headers.insert(HeaderField::Interface, BUS_INTERFACE.into());

        let reply = self.send(call).await?;
        if reply.message_type == MessageType::Error {
            return Err(TransportError::from_error_reply(&reply));
        }
        let (unique_name,): (String,) = reply.store().map_err(TransportError::Decode)?;
        debug!(%unique_name, "registered with bus");
        Ok(unique_name)
    }

    /// True once the I/O task has stopped.
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }

    /// Stop the I/O task and wait for it to finish.
    pub async fn close(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for BusConnection {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl Transport for BusConnection {
    fn send(&self, message: Message) -> impl Future<Output = Result<Message>> + Send {
        let outbound = self.outbound.clone();
        async move {
            if !message.expects_reply() {
                return Err(TransportError::Wire(WireError::InvalidMessage(
                    "only method calls expecting a reply can be sent".to_string(),
                )));
            }
            let (reply, waiter) = oneshot::channel();
            outbound
                .send(Outbound { message, reply })
                .await
                .map_err(|_| TransportError::Closed)?;
            waiter.await.map_err(|_| TransportError::Closed)?
        }
    }
}

/// Non-zero, wrapping message serials.
#[derive(Default)]
struct SerialCounter(u32);

impl SerialCounter {
    fn next(&mut self) -> u32 {
        self.0 = self.0.wrapping_add(1);
        if self.0 == 0 {
            self.0 = 1;
        }
        self.0
    }

    /// Next serial with no call still waiting on it.
    fn next_free<V>(&mut self, pending: &HashMap<u32, V>) -> u32 {
        loop {
            let serial = self.next();
            if !pending.contains_key(&serial) {
                return serial;
            }
        }
    }
}

async fn run_io<S>(
    mut framed: Framed<S, MessageCodec>,
    mut requests: mpsc::Receiver<Outbound>,
    shutdown: CancellationToken,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut pending: HashMap<u32, ReplySender> = HashMap::new();
    let mut serials = SerialCounter::default();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("connection shutdown requested");
                break;
            }
            request = requests.recv() => {
                let Some(Outbound { mut message, reply }) = request else {
                    break;
                };
                // Calls whose callers gave up never get a reply routed.
                pending.retain(|_, waiter| !waiter.is_closed());

                message.serial = serials.next_free(&pending);
                let serial = message.serial;
                debug!(
                    serial,
                    destination = message.destination().unwrap_or_default(),
                    member = message.member().unwrap_or_default(),
                    "sending call"
                );
                match framed.send(message).await {
                    Ok(()) => {
                        pending.insert(serial, reply);
                    }
                    Err(WireError::Io(err)) => {
                        warn!(serial, error = %err, "failed to write call");
                        let _ = reply.send(Err(TransportError::Io(err)));
                        break;
                    }
                    Err(err) => {
                        let _ = reply.send(Err(TransportError::Wire(err)));
                    }
                }
            }
            incoming = framed.next() => match incoming {
                Some(Ok(message)) => route_incoming(&mut pending, message),
                Some(Err(err)) => {
                    warn!(error = %err, "failed to read from bus");
                    break;
                }
                None => {
                    debug!("bus closed the connection");
                    break;
                }
            },
        }
    }

    for (_, waiter) in pending.drain() {
        let _ = waiter.send(Err(TransportError::Closed));
    }
}

fn route_incoming(pending: &mut HashMap<u32, ReplySender>, message: Message) {
    match message.message_type {
        MessageType::MethodReturn | MessageType::Error => {
            let Some(reply_serial) = message.reply_serial() else {
                trace!("dropping reply without a reply serial");
                return;
            };
            match pending.remove(&reply_serial) {
                Some(waiter) => {
                    debug!(reply_serial, kind = %message.message_type, "received reply");
                    let _ = waiter.send(Ok(message));
                }
                None => trace!(reply_serial, "dropping reply for abandoned call"),
            }
        }
        other => trace!(
            kind = %other,
            member = message.member().unwrap_or_default(),
            "ignoring unsolicited message"
        ),
    }
}
