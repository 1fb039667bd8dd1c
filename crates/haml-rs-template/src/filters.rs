//! Content filters.
//!
//! A filter transforms the raw text block captured under a `:name` line.
//! Filters are looked up by name in a [`FilterContainer`], which is built
//! before compilation and only read while compiling.

use std::collections::HashMap;
use std::fmt;

use crate::context::escape_html;

/// A named transformation applied to a filter block.
pub trait Filter: Send + Sync {
    /// Returns the filter name, as written after `:`.
    fn name(&self) -> &str;

    /// Transforms the (already interpolated) block text.
    fn filter(&self, text: &str) -> String;
}

/// A registry of filters keyed by name.
///
/// Names are unique; registering a filter under an existing name replaces
/// the previous one.
///
/// # Examples
///
/// ```
/// use haml_rs_template::filters::FilterContainer;
///
/// let mut filters = FilterContainer::with_builtins();
/// filters.register_fn("upper", |text| text.to_uppercase());
///
/// let upper = filters.get("upper").unwrap();
/// assert_eq!(upper.filter("hi"), "HI");
/// assert!(filters.contains("javascript"));
/// ```
pub struct FilterContainer {
    filters: HashMap<String, Box<dyn Filter>>,
}

impl FilterContainer {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self {
            filters: HashMap::new(),
        }
    }

    /// Creates a container holding the built-in filters.
    pub fn with_builtins() -> Self {
        let mut container = Self::new();
        register_builtins(&mut container);
        container
    }

    /// Registers a filter under its own name.
    pub fn add_filter(&mut self, filter: Box<dyn Filter>) {
        self.filters.insert(filter.name().to_string(), filter);
    }

    /// Registers a closure as a filter.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.add_filter(Box::new(FnFilter {
            name: name.into(),
            func: Box::new(func),
        }));
    }

    /// Looks up a filter by name.
    pub fn get(&self, name: &str) -> Option<&dyn Filter> {
        self.filters.get(name).map(AsRef::as_ref)
    }

    /// Returns `true` if a filter with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Returns the registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The number of registered filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns `true` if no filters are registered.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl Default for FilterContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FilterContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterContainer")
            .field("filters", &self.names())
            .finish()
    }
}

type FilterFn = Box<dyn Fn(&str) -> String + Send + Sync>;

/// A filter backed by a closure.
struct FnFilter {
    name: String,
    func: FilterFn,
}

impl Filter for FnFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn filter(&self, text: &str) -> String {
        (self.func)(text)
    }
}

/// Registers all built-in filters.
fn register_builtins(c: &mut FilterContainer) {
    c.add_filter(Box::new(PlainFilter));
    c.add_filter(Box::new(JavascriptFilter));
    c.add_filter(Box::new(CssFilter));
    c.add_filter(Box::new(CdataFilter));
    c.add_filter(Box::new(EscapedFilter));
    c.add_filter(Box::new(PreserveFilter));
}

// ── Built-in filters ────────────────────────────────────────────────────

/// `plain`: outputs the block unchanged.
pub struct PlainFilter;

impl Filter for PlainFilter {
    fn name(&self) -> &str {
        "plain"
    }

    fn filter(&self, text: &str) -> String {
        text.to_string()
    }
}

/// `javascript`: wraps the block in a `<script>` element.
pub struct JavascriptFilter;

impl Filter for JavascriptFilter {
    fn name(&self) -> &str {
        "javascript"
    }

    fn filter(&self, text: &str) -> String {
        format!("<script>\n{text}\n</script>")
    }
}

/// `css`: wraps the block in a `<style>` element.
pub struct CssFilter;

impl Filter for CssFilter {
    fn name(&self) -> &str {
        "css"
    }

    fn filter(&self, text: &str) -> String {
        format!("<style>\n{text}\n</style>")
    }
}

/// `cdata`: wraps the block in a CDATA section.
pub struct CdataFilter;

impl Filter for CdataFilter {
    fn name(&self) -> &str {
        "cdata"
    }

    fn filter(&self, text: &str) -> String {
        format!("<![CDATA[\n{text}\n]]>")
    }
}

/// `escaped`: HTML-escapes the block.
pub struct EscapedFilter;

impl Filter for EscapedFilter {
    fn name(&self) -> &str {
        "escaped"
    }

    fn filter(&self, text: &str) -> String {
        escape_html(text)
    }
}

/// `preserve`: replaces newlines with `&#x000A;` so whitespace-sensitive
/// content survives reindentation.
pub struct PreserveFilter;

impl Filter for PreserveFilter {
    fn name(&self) -> &str {
        "preserve"
    }

    fn filter(&self, text: &str) -> String {
        text.replace('\n', "&#x000A;")
    }
}
