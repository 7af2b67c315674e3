//! Native library handles.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use libloading::Library;
use operrouter_sdk::OperRouterError;

use crate::abi::{PROTO_BUFFER_FREE, ProtoFn, ProtoFreeFn};

/// Source of ABI entry points.
///
/// Entry points are resolved by name on every call, so a library missing
/// one operation still serves the others.
///
/// # Safety
///
/// Every function pointer returned by [`resolve`](Self::resolve) must honour
/// the contract of [`crate::abi::invoke`] together with the pointer returned
/// by [`free_fn`](Self::free_fn), and both must stay callable for as long as
/// the implementor is alive.
pub unsafe trait ProtoLibrary: Send + Sync + 'static {
    /// Look up an operation entry point.
    ///
    /// # Errors
    ///
    /// [`OperRouterError::SymbolNotFound`] when the library does not export it.
    fn resolve(&self, symbol: &str) -> Result<ProtoFn, OperRouterError>;

    /// Look up the buffer release entry point.
    ///
    /// # Errors
    ///
    /// [`OperRouterError::SymbolNotFound`] when the library does not export it.
    fn free_fn(&self) -> Result<ProtoFreeFn, OperRouterError>;

    /// Release the library. Called once, when no call is in flight.
    ///
    /// # Errors
    ///
    /// Implementation specific.
    fn unload(self) -> Result<(), OperRouterError>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Shared library opened with `libloading`.
///
/// On Unix the library is opened with lazy binding and process-local symbols.
pub struct DynamicLibrary {
    library: Library,
    path: PathBuf,
}

impl fmt::Debug for DynamicLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicLibrary").field("path", &self.path).finish()
    }
}

impl DynamicLibrary {
    /// Load the shared library at `path`.
    ///
    /// Opening a path asserts that the library exports the entry points of
    /// [`crate::abi`] with their documented contract.
    ///
    /// # Errors
    ///
    /// [`OperRouterError::LibraryLoad`] with the loader's diagnostic.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, OperRouterError> {
        let path = path.as_ref().to_path_buf();

        // SAFETY: loading runs the library's initialisers. The caller chose
        // the path and vouches for the library.
        let library = unsafe { Library::new(&path) }.map_err(|e| OperRouterError::LibraryLoad {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        tracing::info!(path = %path.display(), "native library loaded");
        Ok(Self { library, path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn symbol<T: Copy>(&self, name: &str) -> Result<T, OperRouterError> {
        // SAFETY: `T` is one of the ABI signatures from `crate::abi`. The
        // copied function pointer stays valid while `self.library` is loaded,
        // and callers hold the library for the duration of the call.
        let symbol = unsafe { self.library.get::<T>(name.as_bytes()) }
            .map_err(|_| OperRouterError::SymbolNotFound(name.to_owned()))?;
        Ok(*symbol)
    }
}

// SAFETY: `open` is where the caller vouches that the library implements
// the ABI; symbols stay valid while `self.library` is loaded.
unsafe impl ProtoLibrary for DynamicLibrary {
    fn resolve(&self, symbol: &str) -> Result<ProtoFn, OperRouterError> {
        self.symbol::<ProtoFn>(symbol)
    }

    fn free_fn(&self) -> Result<ProtoFreeFn, OperRouterError> {
        self.symbol::<ProtoFreeFn>(PROTO_BUFFER_FREE)
    }

    fn unload(self) -> Result<(), OperRouterError> {
        let path = self.path;
        self.library.close().map_err(OperRouterError::transport)?;
        tracing::info!(path = %path.display(), "native library unloaded");
        Ok(())
    }
}

/// Entry points linked into the current binary.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    entries: HashMap<String, ProtoFn>,
    free: ProtoFreeFn,
}

impl SymbolTable {
    /// # Safety
    ///
    /// `free` must release every buffer returned by the entry points later
    /// registered with [`with`](Self::with), as required by
    /// [`crate::abi::invoke`].
    ///
    /// Building a table outside an `unsafe` block does not compile:
    ///
    /// ```compile_fail
    /// use operrouter_ffi::{ProtoBuffer, SymbolTable};
    ///
    /// unsafe extern "C" fn release(_: ProtoBuffer) {}
    ///
    /// let _table = SymbolTable::new(release);
    /// ```
    #[must_use]
    pub unsafe fn new(free: ProtoFreeFn) -> Self {
        Self {
            entries: HashMap::new(),
            free,
        }
    }

    /// Register an entry point under `symbol`.
    ///
    /// # Safety
    ///
    /// `entry` must honour the contract of [`crate::abi::invoke`] together
    /// with the table's release function.
    #[must_use]
    pub unsafe fn with(mut self, symbol: impl Into<String>, entry: ProtoFn) -> Self {
        self.entries.insert(symbol.into(), entry);
        self
    }

    /// Drop an entry point, e.g. to model a partial library.
    #[must_use]
    pub fn without(mut self, symbol: &str) -> Self {
        self.entries.remove(symbol);
        self
    }
}

// SAFETY: entries and the release function were registered through the
// unsafe constructors, whose callers vouch for them.
unsafe impl ProtoLibrary for SymbolTable {
    fn resolve(&self, symbol: &str) -> Result<ProtoFn, OperRouterError> {
        self.entries
            .get(symbol)
            .copied()
            .ok_or_else(|| OperRouterError::SymbolNotFound(symbol.to_owned()))
    }

    fn free_fn(&self) -> Result<ProtoFreeFn, OperRouterError> {
        Ok(self.free)
    }
}
