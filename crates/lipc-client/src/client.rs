use std::time::Duration;

use lipc_transport::{Transport, TransportError};
use lipc_wire::{Message, MessageType, WireType};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{LipcError, Result};
use crate::message::build_property_message;
use crate::property::{PropertyRequestKind, PropertyTypeTag};
use crate::status::{name_for_status, StatusCode};

/// Cancellation signal and optional deadline for one property call.
///
/// Contexts are cheap to clone; clones share the cancellation token.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context that is never cancelled and has no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context whose deadline is `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Tie this context to an existing cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel every call running under this context or its clones.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Read a property of `service` as type `T`.
///
/// `T` must be `i32` or `String`; anything else fails with
/// [`LipcError::UnsupportedType`] before the transport is touched. The reply
/// body must be `(u32 status, T)`.
pub async fn get_property<T, X>(
    transport: &X,
    ctx: &CallContext,
    service: &str,
    property: &str,
) -> Result<T>
where
    T: WireType,
    X: Transport,
{
    let tag = PropertyTypeTag::resolve::<T>()?;
    let call = build_property_message(PropertyRequestKind::Get, service, property, tag, None)?;
    let reply = dispatch(transport, ctx, call).await?;

    let (status, value): (u32, T) = reply.store().map_err(TransportError::Decode)?;
    check_status(status)?;
    debug!(service, property, "property read");
    Ok(value)
}

/// Write `value` to a property of `service`.
///
/// `T` must be `i32` or `String`. The reply body must be a single `u32`
/// status word.
pub async fn set_property<T, X>(
    transport: &X,
    ctx: &CallContext,
    service: &str,
    property: &str,
    value: T,
) -> Result<()>
where
    T: WireType,
    X: Transport,
{
    let tag = PropertyTypeTag::resolve::<T>()?;
    let call = build_property_message(
        PropertyRequestKind::Set,
        service,
        property,
        tag,
        Some(value.into_value()),
    )?;
    let reply = dispatch(transport, ctx, call).await?;

    let (status,): (u32,) = reply.store().map_err(TransportError::Decode)?;
    check_status(status)?;
    debug!(service, property, "property written");
    Ok(())
}

/// Send `call` and wait for its reply, racing cancellation and deadline.
///
/// A context that is already cancelled or expired never sends.
async fn dispatch<X: Transport>(
    transport: &X,
    ctx: &CallContext,
    call: Message,
) -> Result<Message> {
    debug!(
        destination = call.destination().unwrap_or_default(),
        member = call.member().unwrap_or_default(),
        "dispatching property call"
    );

    if ctx.cancel.is_cancelled() {
        return Err(LipcError::Cancelled);
    }
    if ctx.deadline.is_some_and(|at| at <= Instant::now()) {
        return Err(LipcError::DeadlineExceeded);
    }

    let deadline = async {
        match ctx.deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending::<()>().await,
        }
    };

    let reply = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => return Err(LipcError::Cancelled),
        _ = deadline => return Err(LipcError::DeadlineExceeded),
        reply = transport.send(call) => reply?,
    };

    if reply.message_type == MessageType::Error {
        return Err(TransportError::from_error_reply(&reply).into());
    }
    Ok(reply)
}

fn check_status(status: u32) -> Result<()> {
    if status == StatusCode::OK.0 {
        return Ok(());
    }
    let name = name_for_status(status);
    debug!(status, name, "service reported failure");
    Err(LipcError::Protocol { status, name })
}

/// Client-wide settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Deadline applied to calls whose context has none. `None` waits forever.
    pub call_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            call_timeout: Some(Duration::from_secs(25)),
        }
    }
}

/// Property client bound to one transport.
#[derive(Debug)]
pub struct LipcClient<X> {
    transport: X,
    config: ClientConfig,
}

impl<X: Transport> LipcClient<X> {
    pub fn new(transport: X) -> Self {
        Self::with_config(transport, ClientConfig::default())
    }

    pub fn with_config(transport: X, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    pub fn transport(&self) -> &X {
        &self.transport
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// See [`get_property`].
    pub async fn get<T: WireType>(
        &self,
        ctx: &CallContext,
        service: &str,
        property: &str,
    ) -> Result<T> {
        let ctx = self.effective(ctx);
        get_property(&self.transport, &ctx, service, property).await
    }

    /// See [`set_property`].
    pub async fn set<T: WireType>(
        &self,
        ctx: &CallContext,
        service: &str,
        property: &str,
        value: T,
    ) -> Result<()> {
        let ctx = self.effective(ctx);
        set_property(&self.transport, &ctx, service, property, value).await
    }

    pub async fn get_int(&self, ctx: &CallContext, service: &str, property: &str) -> Result<i32> {
        self.get(ctx, service, property).await
    }

    pub async fn get_str(
        &self,
        ctx: &CallContext,
        service: &str,
        property: &str,
    ) -> Result<String> {
        self.get(ctx, service, property).await
    }

    pub async fn set_int(
        &self,
        ctx: &CallContext,
        service: &str,
        property: &str,
        value: i32,
    ) -> Result<()> {
        self.set(ctx, service, property, value).await
    }

    pub async fn set_str(
        &self,
        ctx: &CallContext,
        service: &str,
        property: &str,
        value: impl Into<String>,
    ) -> Result<()> {
        self.set(ctx, service, property, value.into()).await
    }

    fn effective(&self, ctx: &CallContext) -> CallContext {
        match (ctx.deadline, self.config.call_timeout) {
            (None, Some(timeout)) => ctx.clone().with_deadline(Instant::now() + timeout),
            _ => ctx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use lipc_wire::Value;

    use super::*;

    /// Answers every call with a fixed body and records what it was sent.
    struct StubTransport {
        reply: Message,
        calls: AtomicUsize,
        sent: Mutex<Vec<Message>>,
    }

    impl StubTransport {
        fn returning(body: Vec<Value>) -> Self {
            Self::replying(Message::method_return(1, body))
        }

        fn replying(reply: Message) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_sent(&self) -> Message {
            self.sent.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Transport for StubTransport {
        async fn send(&self, message: Message) -> lipc_transport::Result<Message> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.sent.lock().unwrap().push(message);
            Ok(self.reply.clone())
        }
    }

    /// Never answers.
    struct SilentTransport;

    impl Transport for SilentTransport {
        async fn send(&self, _message: Message) -> lipc_transport::Result<Message> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn get_int_property() {
        let stub = StubTransport::returning(vec![Value::UInt32(0), Value::Int32(12)]);
        let ctx = CallContext::new();
        let value: i32 = get_property(&stub, &ctx, "com.lab126.powerd", "flIntensity")
            .await
            .unwrap();

        assert_eq!(value, 12);
        let sent = stub.last_sent();
        assert_eq!(sent.member(), Some("getflIntensityInt"));
        assert_eq!(sent.path(), Some("/default"));
        assert!(sent.body.is_empty());
    }

    #[tokio::test]
    async fn get_str_property() {
        let stub = StubTransport::returning(vec![Value::UInt32(0), "active".into()]);
        let value: String = get_property(&stub, &CallContext::new(), "com.lab126.powerd", "state")
            .await
            .unwrap();

        assert_eq!(value, "active");
        assert_eq!(stub.last_sent().member(), Some("getstateStr"));
    }

    #[tokio::test]
    async fn set_int_property() {
        let stub = StubTransport::returning(vec![Value::UInt32(0)]);
        set_property(&stub, &CallContext::new(), "com.lab126.powerd", "flIntensity", 13i32)
            .await
            .unwrap();

        let sent = stub.last_sent();
        assert_eq!(sent.member(), Some("setflIntensityInt"));
        assert_eq!(sent.body, vec![Value::Int32(13)]);
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn nonzero_status_is_protocol_error() {
        let stub = StubTransport::returning(vec![Value::UInt32(8), "".into()]);
        let ctx = CallContext::new();
        let err = get_property::<String, _>(&stub, &ctx, "com.lab126.cvm", "logLevel")
            .await
            .unwrap_err();

        match err {
            LipcError::Protocol { status, name } => {
                assert_eq!(status, 8);
                assert_eq!(name, "lipcErrNoSuchProperty");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn set_failure_status() {
        let stub = StubTransport::returning(vec![Value::UInt32(5)]);
        let ctx = CallContext::new();
        let err = set_property(&stub, &ctx, "com.lab126.cvm", "mode", "x".to_string())
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(5));
        assert!(err.to_string().contains("lipcErrOutOfMemory"));
    }

    #[tokio::test]
    async fn unknown_status_has_fallback_name() {
        let stub = StubTransport::returning(vec![Value::UInt32(0x7777)]);
        let err = set_property(&stub, &CallContext::new(), "com.lab126.cvm", "mode", 1i32)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LipcError::Protocol {
                status: 0x7777,
                name: "Unknown"
            }
        ));
    }

    #[tokio::test]
    async fn unsupported_type_sends_nothing() {
        let stub = StubTransport::returning(vec![Value::UInt32(0)]);
        let err = get_property::<f64, _>(&stub, &CallContext::new(), "com.lab126.powerd", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, LipcError::UnsupportedType { type_name: "f64" }));

        let err = set_property(&stub, &CallContext::new(), "com.lab126.powerd", "x", 1u32)
            .await
            .unwrap_err();
        assert!(matches!(err, LipcError::UnsupportedType { .. }));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn invalid_names_send_nothing() {
        let stub = StubTransport::returning(vec![Value::UInt32(0)]);
        let err = get_property::<i32, _>(&stub, &CallContext::new(), "", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, LipcError::InvalidMessage(_)));

        let value = "a\0b".to_string();
        let err = set_property(&stub, &CallContext::new(), "com.lab126.cvm", "x", value)
            .await
            .unwrap_err();
        assert!(matches!(err, LipcError::InvalidMessage(_)));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn wrong_reply_shape_is_decode_error() {
        let stub = StubTransport::returning(vec![Value::UInt32(0), Value::Int32(12)]);
        let err = get_property::<String, _>(&stub, &CallContext::new(), "com.lab126.powerd", "x")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LipcError::Transport(TransportError::Decode(_))
        ));

        let err = set_property(&stub, &CallContext::new(), "com.lab126.powerd", "x", 1i32)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LipcError::Transport(TransportError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn error_reply_is_remote_error() {
        let stub = StubTransport::replying(Message::error(
            1,
            "org.freedesktop.DBus.Error.ServiceUnknown",
            Some("no such service"),
        ));
        let err = get_property::<i32, _>(&stub, &CallContext::new(), "com.lab126.nope", "x")
            .await
            .unwrap_err();

        match err {
            LipcError::Transport(TransportError::Remote { name, message }) => {
                assert_eq!(name, "org.freedesktop.DBus.Error.ServiceUnknown");
                assert_eq!(message, "no such service");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn expired_deadline_never_sends() {
        let stub = StubTransport::returning(vec![Value::UInt32(0), Value::Int32(1)]);
        let ctx = CallContext::new().with_deadline(Instant::now() - Duration::from_millis(1));
        let err = get_property::<i32, _>(&stub, &ctx, "com.lab126.powerd", "x")
            .await
            .unwrap_err();

        assert!(matches!(err, LipcError::DeadlineExceeded));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_while_waiting_for_reply() {
        let ctx = CallContext::with_timeout(Duration::from_secs(2));
        let err = get_property::<i32, _>(&SilentTransport, &ctx, "com.lab126.powerd", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, LipcError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn cancelled_context_never_sends() {
        let stub = StubTransport::returning(vec![Value::UInt32(0)]);
        let ctx = CallContext::new();
        ctx.cancel();
        let err = set_property(&stub, &ctx, "com.lab126.powerd", "x", 1i32)
            .await
            .unwrap_err();

        assert!(matches!(err, LipcError::Cancelled));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn cancel_while_waiting_for_reply() {
        let ctx = CallContext::new();
        let token = ctx.cancel_token().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        let err = get_property::<String, _>(&SilentTransport, &ctx, "com.lab126.powerd", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, LipcError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn client_applies_default_timeout() {
        let client = LipcClient::with_config(
            SilentTransport,
            ClientConfig {
                call_timeout: Some(Duration::from_millis(50)),
            },
        );
        let err = client
            .get_int(&CallContext::new(), "com.lab126.powerd", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, LipcError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn client_typed_helpers() {
        let client = LipcClient::new(StubTransport::returning(vec![Value::UInt32(0)]));
        client
            .set_str(&CallContext::new(), "com.lab126.cvm", "logLevel", "debug")
            .await
            .unwrap();

        let sent = client.transport().last_sent();
        assert_eq!(sent.member(), Some("setlogLevelStr"));
        assert_eq!(sent.body, vec![Value::Str("debug".to_string())]);
    }
}
