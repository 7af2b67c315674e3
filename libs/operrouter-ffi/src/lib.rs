//! `OperRouter` FFI adapter
//!
//! Talks to a router linked into the process, either a shared library
//! loaded at runtime ([`DynamicLibrary`]) or entry points compiled into the
//! binary ([`SymbolTable`]). Requests and replies are the `operrouter.v1`
//! protobuf messages also used over gRPC.
//!
//! ## Ownership
//!
//! Reply buffers are allocated by the library. The adapter copies each one
//! and returns it through `proto_buffer_free` on every path, including
//! decode failures.

#![deny(rust_2018_idioms)]

pub mod abi;
mod client;
mod library;
#[cfg(feature = "memory")]
pub mod memory;

pub use abi::{ProtoBuffer, ProtoFn, ProtoFreeFn};
pub use client::FfiClient;
pub use library::{DynamicLibrary, ProtoLibrary, SymbolTable};
