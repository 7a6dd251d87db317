//! Client for LIPC property services.
//!
//! LIPC is the property protocol spoken by system services over the message
//! bus: each property is read and written through a pair of method calls,
//! and every reply carries a numeric status word.
//!
//! # Crate Structure
//!
//! - [`wire`] - bus message model and binary codec
//! - [`transport`] - call/reply transport seam and bus connection
//! - [`client`] - status table, property message builder and typed client

/// Re-export wire types.
pub mod wire {
    pub use lipc_wire::*;
}

/// Re-export transport types.
pub mod transport {
    pub use lipc_transport::*;
}

/// Re-export client types.
pub mod client {
    pub use lipc_client::*;
}
