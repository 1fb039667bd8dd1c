//! The compiler: source text in, compiled template text out.

use std::path::Path;

use haml_rs_core::error::{HamlError, HamlResult};
use haml_rs_core::logging::template_span;
use haml_rs_core::settings::CompilerSettings;

use crate::filters::FilterContainer;
use crate::node::Node;
use crate::parser;
use crate::render::{render_nodes, RenderContext};

/// Compiles templates with a fixed set of settings and filters.
///
/// # Examples
///
/// ```
/// use haml_rs_template::compiler::Compiler;
///
/// let compiler = Compiler::default();
/// let out = compiler.compile_str(".box\n  %p Hi").unwrap();
/// assert_eq!(out, r#"<div class="box"><p>Hi</p></div>"#);
/// ```
#[derive(Debug)]
pub struct Compiler {
    settings: CompilerSettings,
    filters: FilterContainer,
}

impl Compiler {
    /// Creates a compiler.
    pub const fn new(settings: CompilerSettings, filters: FilterContainer) -> Self {
        Self { settings, filters }
    }

    /// Creates a compiler with the given settings and the built-in filters.
    pub fn with_settings(settings: CompilerSettings) -> Self {
        Self::new(settings, FilterContainer::with_builtins())
    }

    /// Returns the compiler settings.
    pub const fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    /// Returns the filter container.
    pub const fn filters(&self) -> &FilterContainer {
        &self.filters
    }

    /// Returns the filter container for registering more filters.
    pub fn filters_mut(&mut self) -> &mut FilterContainer {
        &mut self.filters
    }

    /// Parses source into its root nodes without rendering.
    pub fn parse(&self, source: &str) -> HamlResult<Vec<Node>> {
        parser::parse(source, &self.settings)
    }

    /// Compiles template source.
    ///
    /// # Errors
    ///
    /// Returns `StructuralError` for malformed templates and `UnknownFilter`
    /// for filter blocks naming an unregistered filter. No partial output is
    /// produced on error.
    pub fn compile_str(&self, source: &str) -> HamlResult<String> {
        let roots = self.parse(source)?;
        let ctx = RenderContext {
            settings: &self.settings,
            filters: &self.filters,
        };
        render_nodes(&roots, &ctx)
    }

    /// Reads and compiles a template file.
    ///
    /// # Errors
    ///
    /// Returns `TemplateDoesNotExist` if the file cannot be read, and any
    /// error of [`compile_str`](Self::compile_str).
    pub fn compile(&self, path: &Path) -> HamlResult<String> {
        let source = std::fs::read_to_string(path).map_err(|e| read_error(path, &e))?;
        self.compile_source(path, &source)
    }

    /// Compiles `source`, already read from `path`, inside the template's
    /// logging span.
    ///
    /// # Errors
    ///
    /// Any error of [`compile_str`](Self::compile_str).
    pub fn compile_source(&self, path: &Path, source: &str) -> HamlResult<String> {
        let span = template_span(path);
        let _guard = span.enter();
        tracing::trace!(bytes = source.len(), "compiling template");

        let compiled = self.compile_str(source);
        if let Err(err) = &compiled {
            tracing::debug!(error = %err, "template failed to compile");
        }
        compiled
    }
}

/// The error for a template source that cannot be read.
pub(crate) fn read_error(path: &Path, err: &dyn std::fmt::Display) -> HamlError {
    HamlError::TemplateDoesNotExist(format!(
        "Error reading template '{}': {err}",
        path.display()
    ))
}

impl Default for Compiler {
    fn default() -> Self {
        Self::with_settings(CompilerSettings::default())
    }
}
