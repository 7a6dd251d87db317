//! Call/reply transport for LIPC clients.
//!
//! The [`Transport`] trait is the seam the property client talks through:
//! hand it a method call, get back the correlated reply. [`BusConnection`]
//! implements it over a single bus stream that has already been
//! authenticated; tests and embedders can supply their own implementation.

pub mod connection;
pub mod error;
pub mod traits;

pub use connection::{BusConnection, ConnectionConfig, BUS_INTERFACE, BUS_NAME, BUS_PATH};
pub use error::{Result, TransportError};
pub use traits::Transport;
