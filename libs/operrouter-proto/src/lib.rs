//! `OperRouter` protobuf layer
//!
//! Generated prost/tonic types for the `operrouter.v1` package and the
//! conversions between them and the SDK models. The gRPC adapter sends
//! these messages over HTTP/2; the FFI adapter passes the same messages,
//! encoded, to the native library.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod convert;
#[cfg(feature = "memory")]
pub mod memory;

// Generated protobuf types for the OperRouter service
pub mod v1 {
    tonic::include_proto!("operrouter.v1");
}

// Re-export the generated client and server
pub use v1::oper_router_client::OperRouterClient as OperRouterGrpcClient;
pub use v1::oper_router_server::{OperRouter, OperRouterServer};

/// Fully qualified gRPC service name
pub const SERVICE_NAME: &str = <OperRouterServer<()> as tonic::server::NamedService>::NAME;
