//! `tokio_util::codec` adapter for bus messages.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_message, encode_message, MAX_MESSAGE_SIZE};
use crate::error::WireError;
use crate::message::Message;

/// Frames a byte stream into [`Message`]s.
#[derive(Debug, Clone)]
pub struct MessageCodec {
    max_message_size: usize,
}

impl MessageCodec {
    pub fn new() -> Self {
        Self::with_max_message_size(MAX_MESSAGE_SIZE)
    }

    pub fn with_max_message_size(max_message_size: usize) -> Self {
        Self { max_message_size }
    }

    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_message(src, self.max_message_size)
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = WireError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_message(&item, dst)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use tokio_util::codec::Framed;

    use super::*;
    use crate::value::Value;

    #[tokio::test]
    async fn framed_duplex_roundtrip() {
        let (left, right) = tokio::io::duplex(4096);
        let mut tx = Framed::new(left, MessageCodec::new());
        let mut rx = Framed::new(right, MessageCodec::new());

        let mut reply = Message::method_return(4, vec![Value::UInt32(0), Value::Int32(12)]);
        reply.serial = 9;
        tx.send(reply.clone()).await.unwrap();

        let received = rx.next().await.unwrap().unwrap();
        assert_eq!(received, reply);
    }

    #[test]
    fn decoder_waits_for_complete_message() {
        let mut codec = MessageCodec::new();
        let mut reply = Message::method_return(1, vec![Value::UInt32(8)]);
        reply.serial = 2;

        let mut wire = BytesMut::new();
        codec.encode(reply, &mut wire).unwrap();
        let mut partial = wire.split_to(wire.len() - 1);

        assert!(codec.decode(&mut partial).unwrap().is_none());
        partial.extend_from_slice(&wire);
        assert!(codec.decode(&mut partial).unwrap().is_some());
    }
}
