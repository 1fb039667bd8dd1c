//! Content evaluation.
//!
//! A [`ContentEvaluator`] post-processes compiled content before it is
//! cached. The default [`PassthroughEvaluator`] leaves it untouched;
//! [`BindingEvaluator`] substitutes variables that resolve in the engine's
//! global [`Bindings`] and leaves every other tag for the host engine.

use haml_rs_core::error::HamlResult;

use crate::context::{escape_html, Bindings};
use crate::storage::FileId;

/// Binds compiled content against variables.
pub trait ContentEvaluator: Send + Sync {
    /// Returns the content to cache for `id`.
    fn evaluate(&self, content: &str, bindings: &Bindings, id: &FileId) -> HamlResult<String>;
}

/// Returns compiled content unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughEvaluator;

impl ContentEvaluator for PassthroughEvaluator {
    fn evaluate(&self, content: &str, _bindings: &Bindings, _id: &FileId) -> HamlResult<String> {
        Ok(content.to_string())
    }
}

/// Substitutes `{{ name }}` and `{{ name|escape }}` when `name` resolves in
/// the bindings.
///
/// Variables that do not resolve, variables with any other filter, block
/// tags and comments are left verbatim. Names bound by the template itself
/// (`{% for x in %}`, `{% with x=... %}`, `... as x`) shadow the bindings
/// and are left for the host within their block. Braces in substituted
/// values are emitted as `{% templatetag %}` tags so a value never becomes
/// template code.
///
/// # Examples
///
/// ```
/// use haml_rs_template::context::Bindings;
/// use haml_rs_template::evaluator::{BindingEvaluator, ContentEvaluator};
/// use haml_rs_template::storage::FileId;
///
/// let mut globals = Bindings::new();
/// globals.set("site", "Example & Co");
/// let id = FileId::from_path("/views/index.haml").unwrap();
///
/// let out = BindingEvaluator
///     .evaluate("<h1>{{ site|escape }}</h1>{{ user }}", &globals, &id)
///     .unwrap();
/// assert_eq!(out, "<h1>Example &amp; Co</h1>{{ user }}");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BindingEvaluator;

impl ContentEvaluator for BindingEvaluator {
    fn evaluate(&self, content: &str, bindings: &Bindings, id: &FileId) -> HamlResult<String> {
        let mut out = String::with_capacity(content.len());
        let mut scopes = Scopes::default();
        let mut substituted = 0usize;

        for token in tokenize(content) {
            match token {
                Token::Variable { raw, inner } => {
                    match resolve(inner, bindings, &scopes) {
                        Some(value) => {
                            out.push_str(&value);
                            substituted += 1;
                        }
                        None => out.push_str(raw),
                    }
                }
                Token::Block { raw, inner } => {
                    scopes.apply(inner);
                    out.push_str(raw);
                }
                Token::Text(raw) | Token::Comment(raw) => out.push_str(raw),
            }
        }

        tracing::trace!(key = %id.key, substituted, "evaluated compiled content");
        Ok(out)
    }
}

/// Names bound by the template, innermost block last.
#[derive(Debug)]
struct Scopes<'a> {
    frames: Vec<Vec<&'a str>>,
}

impl Default for Scopes<'_> {
    fn default() -> Self {
        Self {
            frames: vec![Vec::new()],
        }
    }
}

impl<'a> Scopes<'a> {
    /// Updates the bound names for one block tag.
    fn apply(&mut self, inner: &'a str) {
        let words: Vec<&str> = inner.split_whitespace().collect();
        match words.first().copied() {
            Some("for") => {
                let targets = words[1..].iter().copied().take_while(|w| *w != "in");
                self.frames.push(
                    targets
                        .flat_map(|w| w.split(','))
                        .filter(|name| !name.is_empty())
                        .collect(),
                );
            }
            Some("with") => {
                let mut names: Vec<&str> = words[1..]
                    .iter()
                    .copied()
                    .filter_map(|w| w.split_once('=').map(|(name, _)| name))
                    .collect();
                if let Some(pos) = words.iter().position(|w| *w == "as") {
                    names.extend(words.get(pos + 1).copied());
                }
                self.frames.push(names);
            }
            Some("endfor" | "endwith") => {
                if self.frames.len() > 1 {
                    self.frames.pop();
                }
            }
            Some(_) => {
                if let [.., "as", name] = words.as_slice() {
                    if let Some(frame) = self.frames.last_mut() {
                        frame.push(*name);
                    }
                }
            }
            None => {}
        }
    }

    fn binds(&self, name: &str) -> bool {
        self.frames.iter().flatten().any(|bound| *bound == name)
    }
}

fn resolve(inner: &str, bindings: &Bindings, scopes: &Scopes<'_>) -> Option<String> {
    let (name, escape) = match inner.split_once('|') {
        None => (inner, false),
        Some((name, filter)) if filter.trim() == "escape" => (name, true),
        Some(_) => return None,
    };
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    let root = name.split('.').next().unwrap_or(name);
    if scopes.binds(root) {
        return None;
    }

    let value = bindings.get(name)?;
    let text = value.to_display_string();
    let text = if escape && !value.is_safe() {
        escape_html(&text)
    } else {
        text
    };
    Some(neutralize_delimiters(&text))
}

/// Replaces braces with `{% templatetag %}` tags.
fn neutralize_delimiters(text: &str) -> String {
    if !text.contains(|c| c == '{' || c == '}') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len() + 32);
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        let next = chars.peek().copied();
        let tag = match (c, next) {
            ('{', Some('{')) => Some("openvariable"),
            ('{', Some('%')) => Some("openblock"),
            ('{', Some('#')) => Some("opencomment"),
            ('}', Some('}')) => Some("closevariable"),
            ('%', Some('}')) => Some("closeblock"),
            ('#', Some('}')) => Some("closecomment"),
            _ => None,
        };
        if let Some(tag) = tag {
            chars.next();
            out.push_str(&format!("{{% templatetag {tag} %}}"));
            continue;
        }
        match c {
            '{' => out.push_str("{% templatetag openbrace %}"),
            '}' => out.push_str("{% templatetag closebrace %}"),
            other => out.push(other),
        }
    }
    out
}

/// A slice of compiled content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    /// Literal text.
    Text(&'a str),
    /// `{{ ... }}`: the full tag and its trimmed inside.
    Variable { raw: &'a str, inner: &'a str },
    /// `{% ... %}`: the full tag and its trimmed inside.
    Block { raw: &'a str, inner: &'a str },
    /// `{# ... #}`.
    Comment(&'a str),
}

#[derive(Debug, Clone, Copy)]
enum TagType {
    Variable, // {{
    Block,    // {%
    Comment,  // {#
}

/// Splits content into tokens. An unclosed tag is kept as text.
fn tokenize(source: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut remaining = source;

    while !remaining.is_empty() {
        let Some((pos, tag_type)) = find_next_open(remaining) else {
            tokens.push(Token::Text(remaining));
            break;
        };

        if pos > 0 {
            tokens.push(Token::Text(&remaining[..pos]));
        }

        let tag = &remaining[pos..];
        let closer = match tag_type {
            TagType::Variable => "}}",
            TagType::Block => "%}",
            TagType::Comment => "#}",
        };
        let Some(end) = tag[2..].find(closer) else {
            tokens.push(Token::Text(tag));
            break;
        };

        let raw = &tag[..end + 4];
        let inner = tag[2..end + 2].trim();
        tokens.push(match tag_type {
            TagType::Variable => Token::Variable { raw, inner },
            TagType::Block => Token::Block { raw, inner },
            TagType::Comment => Token::Comment(raw),
        });
        remaining = &tag[end + 4..];
    }

    tokens
}

/// Finds the next tag opening in the source.
fn find_next_open(s: &str) -> Option<(usize, TagType)> {
    let mut best: Option<(usize, TagType)> = None;

    for (tag_str, tag_type) in [
        ("{{", TagType::Variable),
        ("{%", TagType::Block),
        ("{#", TagType::Comment),
    ] {
        if let Some(pos) = s.find(tag_str) {
            match best {
                Some((best_pos, _)) if best_pos <= pos => {}
                _ => best = Some((pos, tag_type)),
            }
        }
    }

    best
}
