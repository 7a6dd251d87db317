use std::future::Future;
use std::sync::Arc;

use lipc_wire::Message;

use crate::error::Result;

/// Sends a method call and resolves to its correlated reply.
///
/// The returned future yields the reply message as received: either a
/// method return or an error message. Interpreting error replies is the
/// caller's job (see [`crate::TransportError::from_error_reply`]).
///
/// Dropping the future abandons the call. Implementations must tolerate
/// that and must not deliver the late reply to any other caller.
pub trait Transport: Send + Sync {
    fn send(&self, message: Message) -> impl Future<Output = Result<Message>> + Send;
}

impl<T: Transport> Transport for &T {
    fn send(&self, message: Message) -> impl Future<Output = Result<Message>> + Send {
        (**self).send(message)
    }
}

impl<T: Transport> Transport for Arc<T> {
    fn send(&self, message: Message) -> impl Future<Output = Result<Message>> + Send {
        (**self).send(message)
    }
}
