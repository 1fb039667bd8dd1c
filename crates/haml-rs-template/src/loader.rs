//! The load protocol.
//!
//! A [`Loader`] returns the compiled content for a source file, reusing a
//! fresh cache entry when there is one and otherwise compiling, evaluating,
//! and caching the result before fetching it back from storage.

use std::path::Path;

use haml_rs_core::error::HamlResult;

use crate::storage::Storage;

/// Loads compiled templates through a storage backend.
pub trait Loader: Send + Sync {
    /// Returns the compiled content for `path`.
    ///
    /// # Errors
    ///
    /// Returns compile errors (`StructuralError`, `UnknownFilter`,
    /// `TemplateDoesNotExist`) and storage errors. A failed compile writes
    /// nothing to `storage`.
    fn load(&self, storage: &dyn Storage, path: &Path) -> HamlResult<String>;
}
