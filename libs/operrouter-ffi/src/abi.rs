//! C ABI shared with the native router.
//!
//! Every entry point takes a protobuf-encoded request as `(ptr, len)` and
//! returns a [`ProtoBuffer`] owned by the library. The caller copies the
//! bytes out and hands the buffer back through [`PROTO_BUFFER_FREE`].

use operrouter_sdk::OperRouterError;

/// Buffer allocated by the native library.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ProtoBuffer {
    pub data: *mut u8,
    pub len: usize,
}

impl ProtoBuffer {
    /// The null buffer: no data, zero length.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            data: std::ptr::null_mut(),
            len: 0,
        }
    }
}

/// Signature of every `<operation>_proto` entry point.
pub type ProtoFn = unsafe extern "C" fn(*const u8, usize) -> ProtoBuffer;

/// Signature of the release entry point.
pub type ProtoFreeFn = unsafe extern "C" fn(ProtoBuffer);

/// Release entry point name.
pub const PROTO_BUFFER_FREE: &str = "proto_buffer_free";

/// Entry point names, one per operation.
pub mod symbols {
    pub const PING: &str = "ping_proto";
    pub const VALIDATE_CONFIG: &str = "validate_config_proto";
    pub const LOAD_CONFIG: &str = "load_config_proto";
    pub const GET_METADATA: &str = "get_metadata_proto";
    pub const DATASOURCE_CREATE: &str = "datasource_create_proto";
    pub const DATASOURCE_QUERY: &str = "datasource_query_proto";
    pub const DATASOURCE_EXECUTE: &str = "datasource_execute_proto";
    pub const DATASOURCE_INSERT: &str = "datasource_insert_proto";
    pub const DATASOURCE_PING: &str = "datasource_ping_proto";
    pub const DATASOURCE_CLOSE: &str = "datasource_close_proto";
    pub const LLM_CREATE: &str = "llm_create_proto";
    pub const LLM_GENERATE: &str = "llm_generate_proto";
    pub const LLM_CHAT: &str = "llm_chat_proto";
    pub const LLM_EMBEDDING: &str = "llm_embedding_proto";
    pub const LLM_PING: &str = "llm_ping_proto";
    pub const LLM_CLOSE: &str = "llm_close_proto";
}

/// Returns a library buffer to its owner when dropped.
struct BufferGuard {
    buf: ProtoBuffer,
    free: ProtoFreeFn,
}

impl Drop for BufferGuard {
    fn drop(&mut self) {
        if !self.buf.data.is_null() {
            // SAFETY: `buf` came from the entry point paired with `free` and
            // is released exactly once, here.
            unsafe { (self.free)(self.buf) };
        }
    }
}

/// Call one entry point and copy its reply out.
///
/// Empty input is passed as null with zero length. The returned buffer is
/// released on every path, including errors.
///
/// # Errors
///
/// Returns [`OperRouterError::Protocol`] when the library returns null data
/// with a non-zero length.
///
/// # Safety
///
/// `entry` must read at most `len` bytes from its input and return either a
/// null buffer or one whose `data` points to `len` initialised bytes that
/// stay valid until passed to `free`. `free` must release exactly such
/// buffers and must belong to the same library as `entry`.
///
/// ```compile_fail
/// use operrouter_ffi::ProtoBuffer;
/// use operrouter_ffi::abi::invoke;
///
/// unsafe extern "C" fn reply(_: *const u8, _: usize) -> ProtoBuffer {
///     ProtoBuffer::empty()
/// }
/// unsafe extern "C" fn release(_: ProtoBuffer) {}
///
/// let _ = invoke(reply, release, &[]);
/// ```
pub unsafe fn invoke(
    entry: ProtoFn,
    free: ProtoFreeFn,
    input: &[u8],
) -> Result<Vec<u8>, OperRouterError> {
    let (ptr, len) = if input.is_empty() {
        (std::ptr::null(), 0)
    } else {
        (input.as_ptr(), input.len())
    };

    // SAFETY: `ptr` is null with `len == 0` or points to `len` live bytes
    // borrowed for the duration of the call; `entry` honours the ABI per
    // this function's contract.
    let buf = unsafe { entry(ptr, len) };
    let guard = BufferGuard { buf, free };

    if guard.buf.data.is_null() {
        if guard.buf.len > 0 {
            return Err(OperRouterError::Protocol(format!(
                "native call returned null data with length {}",
                guard.buf.len
            )));
        }
        return Ok(Vec::new());
    }

    // SAFETY: by this function's contract `data` points to `len` initialised
    // bytes until the buffer is freed, which happens after the copy when
    // `guard` drops.
    let bytes = unsafe { std::slice::from_raw_parts(guard.buf.data, guard.buf.len) }.to_vec();
    Ok(bytes)
}
