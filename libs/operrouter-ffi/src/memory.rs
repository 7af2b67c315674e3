//! [`MemoryRouter`] exposed through the C ABI.
//!
//! Entry points are plain `extern "C"` functions over one process-wide
//! router, so a client built from [`memory_library`] goes through the same
//! encode, call, copy and free path as one backed by a shared library.

use std::sync::LazyLock;

use operrouter_proto::memory::MemoryRouter;
use prost::Message;

use crate::abi::{ProtoBuffer, symbols};
use crate::library::SymbolTable;

static ROUTER: LazyLock<MemoryRouter> = LazyLock::new(MemoryRouter::new);

/// Copy a reply into a buffer owned by this module.
fn into_buffer(bytes: Vec<u8>) -> ProtoBuffer {
    if bytes.is_empty() {
        return ProtoBuffer::empty();
    }
    let boxed = bytes.into_boxed_slice();
    let len = boxed.len();
    ProtoBuffer {
        data: Box::into_raw(boxed).cast::<u8>(),
        len,
    }
}

/// # Safety
///
/// `data` is null with `len == 0` or points to `len` readable bytes.
unsafe fn request_bytes<'a>(data: *const u8, len: usize) -> &'a [u8] {
    if data.is_null() || len == 0 {
        return &[];
    }
    // SAFETY: guaranteed by the caller.
    unsafe { std::slice::from_raw_parts(data, len) }
}

macro_rules! entry_points {
    ($($symbol:ident => $handler:ident($request:ty);)*) => {
        $(
            /// # Safety
            ///
            /// `data` is null with `len == 0` or points to `len` readable bytes.
            unsafe extern "C" fn $handler(data: *const u8, len: usize) -> ProtoBuffer {
                // SAFETY: forwarded from the caller.
                let input = unsafe { request_bytes(data, len) };
                match <$request>::decode(input) {
                    Ok(req) => into_buffer(ROUTER.$handler(req).encode_to_vec()),
                    Err(e) => {
                        tracing::warn!(error = %e, "undecodable request");
                        ProtoBuffer::empty()
                    }
                }
            }
        )*

        /// Entry points of the in-memory router.
        #[must_use]
        pub fn memory_library() -> SymbolTable {
            // SAFETY: every handler returns a buffer from `into_buffer` or the
            // null buffer, both of which `proto_buffer_free` releases.
            unsafe {
                SymbolTable::new(proto_buffer_free)
                    $(.with(symbols::$symbol, $handler))*
            }
        }
    };
}

entry_points! {
    PING => ping(operrouter_proto::v1::PingRequest);
    VALIDATE_CONFIG => validate_config(operrouter_proto::v1::ValidateConfigRequest);
    LOAD_CONFIG => load_config(operrouter_proto::v1::LoadConfigRequest);
    GET_METADATA => get_metadata(operrouter_proto::v1::GetMetadataRequest);
    DATASOURCE_CREATE => create_datasource(operrouter_proto::v1::CreateDataSourceRequest);
    DATASOURCE_QUERY => query_datasource(operrouter_proto::v1::QueryDataSourceRequest);
    DATASOURCE_EXECUTE => execute_datasource(operrouter_proto::v1::ExecuteDataSourceRequest);
    DATASOURCE_INSERT => insert_datasource(operrouter_proto::v1::InsertDataSourceRequest);
    DATASOURCE_PING => ping_datasource(operrouter_proto::v1::PingDataSourceRequest);
    DATASOURCE_CLOSE => close_datasource(operrouter_proto::v1::CloseDataSourceRequest);
    LLM_CREATE => create_llm(operrouter_proto::v1::CreateLlmRequest);
    LLM_GENERATE => generate_llm(operrouter_proto::v1::GenerateLlmRequest);
    LLM_CHAT => chat_llm(operrouter_proto::v1::ChatLlmRequest);
    LLM_EMBEDDING => embedding_llm(operrouter_proto::v1::EmbeddingLlmRequest);
    LLM_PING => ping_llm(operrouter_proto::v1::PingLlmRequest);
    LLM_CLOSE => close_llm(operrouter_proto::v1::CloseLlmRequest);
}

/// Release a buffer produced by [`into_buffer`].
///
/// # Safety
///
/// `buf` was returned by an entry point of this module and is freed once.
unsafe extern "C" fn proto_buffer_free(buf: ProtoBuffer) {
    if buf.data.is_null() {
        return;
    }
    let slice = std::ptr::slice_from_raw_parts_mut(buf.data, buf.len);
    // SAFETY: `slice` is the pointer and length `into_buffer` leaked from a
    // `Box<[u8]>`.
    drop(unsafe { Box::from_raw(slice) });
}
