//! Line classification.
//!
//! Decides which kind of node a source line starts, from its trimmed
//! content alone. The checks run in a fixed order and the first match wins.

/// The kind of node a line starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// `%tag`, `#id` or `.class` shorthand.
    Element,
    /// `- statement`, `= expr`, `&= expr` or `!= expr`.
    Tag,
    /// `:name` filter block.
    Filter,
    /// `/` markup comment or `-#` silent comment.
    Comment,
    /// `!!!` doctype declaration.
    Doctype,
    /// Anything else.
    PlainText,
}

/// Classifies a line. Returns `None` for blank lines.
///
/// # Examples
///
/// ```
/// use haml_rs_template::classifier::{classify, NodeType};
///
/// assert_eq!(classify("  %p Hello"), Some(NodeType::Element));
/// assert_eq!(classify("- if user"), Some(NodeType::Tag));
/// assert_eq!(classify("#{greeting}, world"), Some(NodeType::PlainText));
/// assert_eq!(classify("   "), None);
/// ```
pub fn classify(line: &str) -> Option<NodeType> {
    let trimmed = line.trim();
    let first = trimmed.chars().next()?;

    if first == ':' {
        return Some(NodeType::Filter);
    }
    if trimmed.contains("!!!") {
        return Some(NodeType::Doctype);
    }
    if first == '/' || trimmed.starts_with("-#") {
        return Some(NodeType::Comment);
    }
    if trimmed.starts_with("#{") {
        return Some(NodeType::PlainText);
    }
    if matches!(first, '%' | '#' | '.') {
        return Some(NodeType::Element);
    }
    if matches!(first, '-' | '=') || trimmed.starts_with("&=") || trimmed.starts_with("!=") {
        return Some(NodeType::Tag);
    }
    Some(NodeType::PlainText)
}
