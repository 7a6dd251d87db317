//! Bus message model and wire codec for LIPC property calls.
//!
//! LIPC tunnels property get/set requests through ordinary bus method
//! calls. This crate holds the pieces every layer above shares:
//! - [`Message`] with its fixed-header enums and header fields
//! - [`Value`] and the [`WireType`] mapping from Rust scalars to type codes
//! - [`encode_message`] / [`decode_message`] for the little/big-endian
//!   marshalling of basic types
//! - [`MessageCodec`] for `tokio_util::codec` (behind the `async` feature)
//!
//! Container types (arrays, structs, dicts) are out of scope; a received
//! body that uses them is kept opaque and refuses to [`Message::store`].

pub mod codec;
pub mod error;
#[cfg(feature = "async")]
pub mod framed;
pub mod header;
pub mod message;
pub mod names;
pub mod value;

pub use codec::{decode_message, encode_message, FIXED_HEADER_SIZE, MAX_MESSAGE_SIZE};
pub use error::{Result, WireError};
#[cfg(feature = "async")]
pub use framed::MessageCodec;
pub use header::{header_field_name, Flags, HeaderField, MessageType, PROTOCOL_VERSION};
pub use message::Message;
pub use value::{FromBody, ObjectPath, Signature, Value, WireType, MAX_VARIANT_DEPTH};
