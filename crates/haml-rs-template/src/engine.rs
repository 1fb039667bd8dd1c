//! The template engine: compiler, storage and evaluator wired together.
//!
//! [`Engine`] is the entry point for hosts. It owns a [`Compiler`], an
//! optional [`Storage`] backend, a [`ContentEvaluator`] and the global
//! [`Bindings`] handed to it, and implements the [`Loader`] protocol.

use std::fmt;
use std::path::Path;

use haml_rs_core::error::{HamlError, HamlResult};
use haml_rs_core::logging::template_span;
use haml_rs_core::settings::Settings;

use crate::compiler::{read_error, Compiler};
use crate::context::Bindings;
use crate::evaluator::{BindingEvaluator, ContentEvaluator, PassthroughEvaluator};
use crate::filters::FilterContainer;
use crate::loader::Loader;
use crate::storage::{FileId, FileStorage, SourceSignal, Storage};

/// The template engine.
///
/// # Examples
///
/// ```
/// use haml_rs_template::engine::Engine;
/// use haml_rs_template::storage::InMemoryStorage;
///
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("index.haml");
/// std::fs::write(&path, "%h1= title").unwrap();
///
/// let engine = Engine::new().with_storage(Box::new(InMemoryStorage::new()));
/// assert_eq!(engine.load_file(&path).unwrap(), "<h1>{{ title }}</h1>");
/// ```
pub struct Engine {
    compiler: Compiler,
    storage: Option<Box<dyn Storage>>,
    evaluator: Box<dyn ContentEvaluator>,
    globals: Bindings,
    cache_enabled: bool,
}

impl Engine {
    /// Creates an engine with default compiler settings, the built-in
    /// filters, no storage, and a passthrough evaluator.
    pub fn new() -> Self {
        Self {
            compiler: Compiler::default(),
            storage: None,
            evaluator: Box::new(PassthroughEvaluator),
            globals: Bindings::new(),
            cache_enabled: true,
        }
    }

    /// Creates an engine from settings.
    ///
    /// A [`FileStorage`] is configured when `settings.cache.dir` is set, and
    /// a [`BindingEvaluator`] when `settings.globals` is non-empty.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut engine = Self::new();
        engine.compiler = Compiler::new(
            settings.compiler.clone(),
            FilterContainer::with_builtins(),
        );
        if let Some(dir) = &settings.cache.dir {
            engine.storage = Some(Box::new(FileStorage::new(
                dir.clone(),
                settings.cache.extension.clone(),
            )));
        }
        if !settings.globals.is_empty() {
            engine.evaluator = Box::new(BindingEvaluator);
            engine.globals = Bindings::from_json(settings.globals.clone());
        }
        engine.cache_enabled = settings.cache.enabled;
        engine
    }

    /// Sets the storage backend, builder style.
    #[must_use]
    pub fn with_storage(mut self, storage: Box<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Sets the storage backend.
    pub fn set_storage(&mut self, storage: Box<dyn Storage>) {
        self.storage = Some(storage);
    }

    /// Returns the storage backend, if any.
    pub fn storage(&self) -> Option<&dyn Storage> {
        self.storage.as_deref()
    }

    /// Sets the content evaluator.
    pub fn set_evaluator(&mut self, evaluator: Box<dyn ContentEvaluator>) {
        self.evaluator = evaluator;
    }

    /// Replaces the global bindings.
    pub fn set_globals(&mut self, globals: Bindings) {
        self.globals = globals;
    }

    /// Returns the global bindings for modification.
    pub fn globals_mut(&mut self) -> &mut Bindings {
        &mut self.globals
    }

    /// Returns the compiler.
    pub const fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    /// Returns the filter container for registering more filters.
    pub fn filters_mut(&mut self) -> &mut FilterContainer {
        self.compiler.filters_mut()
    }

    /// Reuses fresh cache entries (the default).
    pub fn enable_cache(&mut self) {
        self.cache_enabled = true;
    }

    /// Recompiles on every load. Results are still written to storage.
    pub fn disable_cache(&mut self) {
        self.cache_enabled = false;
    }

    /// Returns `true` if fresh cache entries are reused.
    pub const fn is_cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    /// Loads `path` through the configured storage.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` when no storage is configured, and any
    /// error of [`Loader::load`].
    pub fn load_file(&self, path: impl AsRef<Path>) -> HamlResult<String> {
        let storage = self.storage.as_deref().ok_or(HamlError::StorageUnavailable)?;
        self.load(storage, path.as_ref())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("compiler", &self.compiler)
            .field("has_storage", &self.storage.is_some())
            .field("globals", &self.globals.len())
            .field("cache_enabled", &self.cache_enabled)
            .finish_non_exhaustive()
    }
}

impl Loader for Engine {
    fn load(&self, storage: &dyn Storage, path: &Path) -> HamlResult<String> {
        let id = FileId::from_path(path)?;
        let span = template_span(&id.source);
        let _guard = span.enter();

        if self.cache_enabled && storage.is_fresh(&id) {
            tracing::debug!(key = %id.key, "cache hit");
            return storage.fetch(&id);
        }
        tracing::debug!(key = %id.key, cache_enabled = self.cache_enabled, "cache miss");

        // The signal stored with the entry is the one of the bytes compiled
        // here, so an edit during compilation leaves the entry stale.
        let (signal, bytes) =
            SourceSignal::snapshot(&id.source).map_err(|e| read_error(&id.source, &e))?;
        let source = String::from_utf8(bytes).map_err(|e| read_error(&id.source, &e))?;

        let compiled = self.compiler.compile_source(&id.source, &source)?;
        let content = self.evaluator.evaluate(&compiled, &self.globals, &id)?;
        storage.cache_with_signal(&id, signal, &content)?;
        storage.fetch(&id)
    }
}
