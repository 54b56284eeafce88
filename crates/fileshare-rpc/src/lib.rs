//! # fileshare-rpc
//!
//! Wire protocol and TCP transport for the three methods of the file
//! service: `remote_list`, `remote_fragments_available`, `remote_download`.
//! A minimal length-prefixed `bincode` framing over a short-lived TCP
//! connection per call, in place of a full RPC framework this protocol's
//! three-method surface doesn't need.

pub mod client;
pub mod error;
pub mod protocol;
pub mod server;

pub use client::RpcClient;
pub use error::{Result, RpcError};
pub use protocol::{Request, Response, WireMetaData};
pub use server::{serve, RpcHandler};
