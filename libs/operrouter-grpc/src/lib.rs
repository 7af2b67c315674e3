//! `OperRouter` gRPC adapter
//!
//! Implements [`operrouter_sdk::OperRouterClient`] over tonic. Requests are
//! built by [`operrouter_proto::convert`], the same code the FFI adapter
//! uses, so both transports send identical messages.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

mod client;
pub mod transport;

pub use client::GrpcClient;
pub use transport::{GrpcClientConfig, connect_with_stack};
