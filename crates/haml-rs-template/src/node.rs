//! The node model.
//!
//! Every non-blank structural line becomes a [`Node`]. Nested lines become
//! its `children`, in source order.

use crate::element::{Element, InlineContent};

/// Keywords whose statements always get a closing `{% end<kw> %}`.
pub const BLOCK_KEYWORDS: &[&str] = &[
    "if",
    "for",
    "with",
    "block",
    "autoescape",
    "spaceless",
    "filter",
    "ifchanged",
    "comment",
    "verbatim",
];

/// Keywords that continue the chain opened by a preceding silent script.
pub const CONTINUATION_KEYWORDS: &[&str] = &["else", "elif", "empty"];

/// Returns `true` when `- <next>` may extend a chain opened by `- <opener>`
/// whose latest link is `- <last>`.
///
/// `elif` and `else` continue `if`, `else` also continues `ifchanged`, and
/// `empty` continues `for`. Nothing follows an `else` or `empty`.
pub fn continues_chain(opener: &str, last: &str, next: &str) -> bool {
    match next {
        "elif" => opener == "if" && last != "else",
        "else" => matches!(opener, "if" | "ifchanged") && last != "else",
        "empty" => opener == "for" && last == "for",
        _ => false,
    }
}

/// How loud script output is escaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escaping {
    /// `=`: escaped when the compiler's `escape_html` is on.
    FollowSetting,
    /// `&=`: always escaped.
    Always,
    /// `!=`: never escaped.
    Never,
}

impl Escaping {
    /// Resolves against the compiler's `escape_html` setting.
    pub const fn resolve(self, escape_html: bool) -> bool {
        match self {
            Self::FollowSetting => escape_html,
            Self::Always => true,
            Self::Never => false,
        }
    }
}

/// A script line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
    /// `- statement`.
    Silent {
        /// The statement text after `-`.
        statement: String,
        /// The first word of the statement.
        keyword: String,
    },
    /// `= expr`, `&= expr` or `!= expr`.
    Loud {
        /// The expression text.
        expression: String,
        /// How the output is escaped.
        escaping: Escaping,
    },
}

/// A `:name` filter block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterBlock {
    /// The filter name.
    pub name: String,
    /// The captured block, with common indentation removed.
    pub text: String,
}

/// A comment line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comment {
    /// `/ text`, `/` or `/[condition]`.
    Html {
        /// Text on the comment line, if any.
        text: Option<String>,
        /// The condition of a conditional comment.
        condition: Option<String>,
    },
    /// `-#`.
    Silent,
}

/// A `!!!` doctype line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Doctype {
    /// The lowercased first word after `!!!`; empty if there is none.
    pub keyword: String,
    /// The second word, used by `!!! xml`.
    pub encoding: Option<String>,
}

/// The variant-specific part of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A markup element.
    Element(Element),
    /// A silent or loud script.
    Tag(Script),
    /// A filter block.
    Filter(FilterBlock),
    /// A markup or silent comment.
    Comment(Comment),
    /// A doctype declaration.
    Doctype(Doctype),
    /// Plain text; a leading `\` has already been removed.
    PlainText(String),
}

/// A parsed template node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// 1-based source line number.
    pub line: usize,
    /// The source line as written.
    pub raw: String,
    /// What the node is.
    pub kind: NodeKind,
    /// Nested nodes, in source order.
    pub children: Vec<Node>,
}

impl Node {
    /// Creates a node with no children.
    pub fn new(line: usize, raw: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            line,
            raw: raw.into(),
            kind,
            children: Vec::new(),
        }
    }

    /// Checks whether nested lines may be attached to this node.
    ///
    /// # Errors
    ///
    /// Returns the reason when the node cannot have children.
    pub fn accepts_children(&self) -> Result<(), &'static str> {
        match &self.kind {
            NodeKind::Element(el) if el.is_void() => {
                Err("void elements cannot have nested content")
            }
            NodeKind::Element(el) if el.content != InlineContent::None => {
                Err("an element with inline content cannot also have nested content")
            }
            NodeKind::Comment(Comment::Html { text: Some(_), .. }) => {
                Err("a comment with inline text cannot also have nested content")
            }
            NodeKind::Filter(_) => Err("filter blocks cannot have nested nodes"),
            NodeKind::Doctype(_) => Err("a doctype cannot have nested content"),
            NodeKind::PlainText(_) => Err("plain text cannot have nested content"),
            _ => Ok(()),
        }
    }

    /// Returns the keyword if this is a silent script.
    pub fn silent_keyword(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Tag(Script::Silent { keyword, .. }) => Some(keyword),
            _ => None,
        }
    }

    /// Returns `true` for `- statement` lines.
    pub fn is_silent_script(&self) -> bool {
        self.silent_keyword().is_some()
    }

    /// Returns `true` for `- else`, `- elif ...` and `- empty`.
    pub fn is_continuation(&self) -> bool {
        self.silent_keyword()
            .is_some_and(|kw| CONTINUATION_KEYWORDS.contains(&kw))
    }

    /// Returns `true` for nodes that render as a run of inline text.
    pub fn is_inline_text(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::PlainText(_) | NodeKind::Tag(Script::Loud { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::parse_element;

    fn silent(statement: &str) -> Node {
        let keyword = statement.split_whitespace().next().unwrap_or("").to_string();
        Node::new(
            1,
            format!("- {statement}"),
            NodeKind::Tag(Script::Silent {
                statement: statement.to_string(),
                keyword,
            }),
        )
    }

    #[test]
    fn test_escaping_resolve() {
        assert!(Escaping::FollowSetting.resolve(true));
        assert!(!Escaping::FollowSetting.resolve(false));
        assert!(Escaping::Always.resolve(false));
        assert!(!Escaping::Never.resolve(true));
    }

    #[test]
    fn test_continuations() {
        assert!(silent("else").is_continuation());
        assert!(silent("elif x").is_continuation());
        assert!(silent("empty").is_continuation());
        assert!(!silent("if x").is_continuation());
        assert!(silent("if x").is_silent_script());
    }

    #[test]
    fn test_continues_chain() {
        assert!(continues_chain("if", "if", "elif"));
        assert!(continues_chain("if", "elif", "else"));
        assert!(continues_chain("ifchanged", "ifchanged", "else"));
        assert!(continues_chain("for", "for", "empty"));

        assert!(!continues_chain("load", "load", "else"));
        assert!(!continues_chain("with", "with", "elif"));
        assert!(!continues_chain("for", "for", "else"));
        assert!(!continues_chain("if", "if", "empty"));
        assert!(!continues_chain("if", "else", "elif"));
        assert!(!continues_chain("if", "else", "else"));
        assert!(!continues_chain("for", "empty", "empty"));
    }

    #[test]
    fn test_accepts_children() {
        let el = Node::new(1, "%div", NodeKind::Element(parse_element("%div", "div").unwrap()));
        assert!(el.accepts_children().is_ok());

        let inline = Node::new(
            1,
            "%p hi",
            NodeKind::Element(parse_element("%p hi", "div").unwrap()),
        );
        assert!(inline.accepts_children().is_err());

        let void = Node::new(1, "%br", NodeKind::Element(parse_element("%br", "div").unwrap()));
        assert!(void.accepts_children().unwrap_err().contains("void"));

        let text = Node::new(1, "hello", NodeKind::PlainText("hello".into()));
        assert!(text.accepts_children().is_err());

        let doctype = Node::new(
            1,
            "!!!",
            NodeKind::Doctype(Doctype {
                keyword: String::new(),
                encoding: None,
            }),
        );
        assert!(doctype.accepts_children().is_err());

        let cond = Node::new(
            1,
            "/[if IE]",
            NodeKind::Comment(Comment::Html {
                text: None,
                condition: Some("if IE".into()),
            }),
        );
        assert!(cond.accepts_children().is_ok());
        assert!(silent("for x in xs").accepts_children().is_ok());
    }

    #[test]
    fn test_inline_text() {
        let loud = Node::new(
            1,
            "= x",
            NodeKind::Tag(Script::Loud {
                expression: "x".into(),
                escaping: Escaping::FollowSetting,
            }),
        );
        assert!(loud.is_inline_text());
        assert!(Node::new(1, "t", NodeKind::PlainText("t".into())).is_inline_text());
        assert!(!silent("if x").is_inline_text());
    }
}
