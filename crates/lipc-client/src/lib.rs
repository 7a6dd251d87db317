//! Typed LIPC property access.
//!
//! LIPC services expose each property as a pair of bus methods named
//! `get<Property><Int|Str>` and `set<Property><Int|Str>` on object path
//! `/default`. Every reply starts with a `u32` status word; zero means
//! success and anything else maps to a name in [`STATUS_TABLE`].
//!
//! ```no_run
//! # async fn demo(conn: lipc_transport::BusConnection) -> lipc_client::Result<()> {
//! use lipc_client::{CallContext, LipcClient};
//!
//! let client = LipcClient::new(conn);
//! let ctx = CallContext::new();
//! let level: i32 = client.get(&ctx, "com.lab126.powerd", "flIntensity").await?;
//! client.set(&ctx, "com.lab126.powerd", "flIntensity", level + 1).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod message;
pub mod property;
pub mod status;

pub use client::{get_property, set_property, CallContext, ClientConfig, LipcClient};
pub use error::{LipcError, Result};
pub use message::{build_property_message, LIPC_OBJECT_PATH};
pub use property::{method_name, PropertyRequestKind, PropertyTypeTag};
pub use status::{name_for_status, StatusCode, STATUS_TABLE, UNKNOWN_STATUS};
