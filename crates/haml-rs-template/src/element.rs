//! Element lines: `%tag#id.class(attrs){attrs}/ rest`.
//!
//! [`parse_element`] turns the trimmed text of an element line into an
//! [`Element`]. Rendering the opening and closing tags needs the compiler
//! settings (output format, escaping), so it happens later in
//! [`crate::render`].

use haml_rs_core::settings::{CompilerSettings, OutputFormat};

use crate::interpolate::{expression, interpolate};
use crate::node::Escaping;

/// Elements that never have content or a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// An attribute value as written in the template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    /// A quoted literal. Any `"` has already been replaced by `&quot;`.
    Literal(String),
    /// An unquoted expression, emitted as expression output.
    Expression(String),
    /// A bare key or `true`.
    Boolean,
}

/// What follows the element head on the same line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InlineContent {
    /// Nothing; content (if any) comes from nested lines.
    #[default]
    None,
    /// ` text`, interpolated.
    Text(String),
    /// `= expr`, `&= expr` or `!= expr`.
    Script {
        /// The expression source.
        expression: String,
        /// How the expression output is escaped.
        escaping: Escaping,
    },
}

/// A parsed element line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// The tag name.
    pub tag: String,
    /// The `id`, from `#id` or an explicit `id` attribute.
    pub id: Option<AttrValue>,
    /// Class parts, from `.class` and `class` attributes in source order.
    pub classes: Vec<AttrValue>,
    /// Every other attribute, in first-seen order.
    pub attributes: Vec<(String, AttrValue)>,
    /// Whether the head ended with `/`.
    pub self_closing: bool,
    /// Content on the same line.
    pub content: InlineContent,
}

impl Element {
    fn new(tag: String) -> Self {
        Self {
            tag,
            id: None,
            classes: Vec::new(),
            attributes: Vec::new(),
            self_closing: false,
            content: InlineContent::None,
        }
    }

    /// Returns `true` for void tags and tags written with a trailing `/`.
    pub fn is_void(&self) -> bool {
        self.self_closing || VOID_ELEMENTS.contains(&self.tag.as_str())
    }

    /// Sets an attribute. `None` removes it (`false` / `nil`); a valueless
    /// `class` is an error.
    fn set_attribute(&mut self, key: String, value: Option<AttrValue>) -> Result<(), String> {
        match key.as_str() {
            "id" => self.id = value,
            "class" => match value {
                Some(AttrValue::Boolean) => {
                    return Err("the 'class' attribute needs a value".to_string());
                }
                Some(v) => self.classes.push(v),
                None => {}
            },
            _ => {
                let existing = self.attributes.iter().position(|(k, _)| *k == key);
                match (existing, value) {
                    (Some(idx), Some(value)) => self.attributes[idx].1 = value,
                    (Some(idx), None) => {
                        self.attributes.remove(idx);
                    }
                    (None, Some(value)) => self.attributes.push((key, value)),
                    (None, None) => {}
                }
            }
        }
        Ok(())
    }

    /// Renders `<tag attrs>`, or the self-closed form for void elements.
    pub fn open_tag(&self, settings: &CompilerSettings) -> String {
        let mut out = format!("<{}", self.tag);

        if let Some(id) = &self.id {
            push_attribute(&mut out, "id", id, settings);
        }
        if !self.classes.is_empty() {
            let joined: Vec<String> = self
                .classes
                .iter()
                .map(|part| attr_text(part, settings))
                .collect();
            out.push_str(&format!(" class=\"{}\"", joined.join(" ")));
        }
        for (key, value) in &self.attributes {
            push_attribute(&mut out, key, value, settings);
        }

        if self.is_void() && settings.format == OutputFormat::Xhtml {
            out.push_str(" />");
        } else {
            out.push('>');
        }
        out
    }

    /// Renders `</tag>`, or nothing for void elements.
    pub fn close_tag(&self) -> String {
        if self.is_void() {
            String::new()
        } else {
            format!("</{}>", self.tag)
        }
    }
}

fn attr_text(value: &AttrValue, settings: &CompilerSettings) -> String {
    match value {
        AttrValue::Literal(text) => interpolate(text, settings.escape_html),
        AttrValue::Expression(expr) => expression(expr, settings.escape_html),
        AttrValue::Boolean => String::new(),
    }
}

fn push_attribute(out: &mut String, key: &str, value: &AttrValue, settings: &CompilerSettings) {
    match value {
        AttrValue::Boolean => match settings.format {
            OutputFormat::Html5 => out.push_str(&format!(" {key}")),
            OutputFormat::Xhtml => out.push_str(&format!(" {key}=\"{key}\"")),
        },
        _ => out.push_str(&format!(" {key}=\"{}\"", attr_text(value, settings))),
    }
}

/// Parses the trimmed text of an element line.
///
/// # Errors
///
/// Returns a message describing the problem; the caller attaches the line.
///
/// # Examples
///
/// ```
/// use haml_rs_template::element::{parse_element, AttrValue, InlineContent};
///
/// let el = parse_element("%a.nav(href=url) Home", "div").unwrap();
/// assert_eq!(el.tag, "a");
/// assert_eq!(el.classes, vec![AttrValue::Literal("nav".into())]);
/// assert_eq!(el.content, InlineContent::Text("Home".into()));
/// ```
pub fn parse_element(text: &str, default_tag: &str) -> Result<Element, String> {
    let mut cur = Cursor::new(text);

    let tag = if cur.eat('%') {
        let name = cur.take_while(is_tag_char);
        if name.is_empty() {
            return Err("expected a tag name after '%'".to_string());
        }
        name.to_string()
    } else {
        default_tag.to_string()
    };
    let mut element = Element::new(tag);

    // Shorthands.
    loop {
        match cur.peek() {
            Some('#') if cur.rest().starts_with("#{") => break,
            Some(marker @ ('#' | '.')) => {
                cur.bump();
                let ident = cur.take_while(is_ident_char);
                if ident.is_empty() {
                    return Err(format!("expected a name after '{marker}'"));
                }
                let value = AttrValue::Literal(ident.to_string());
                if marker == '#' {
                    element.id = Some(value);
                } else {
                    element.classes.push(value);
                }
            }
            _ => break,
        }
    }

    // Attribute lists.
    loop {
        match cur.peek() {
            Some('(') => {
                cur.bump();
                parse_html_attributes(&mut cur, &mut element)?;
            }
            Some('{') => {
                cur.bump();
                parse_hash_attributes(&mut cur, &mut element)?;
            }
            _ => break,
        }
    }

    if cur.eat('/') {
        element.self_closing = true;
    }

    element.content = parse_rest(cur.rest())?;

    if element.is_void() && element.content != InlineContent::None {
        return Err(format!("void element '{}' cannot have content", element.tag));
    }

    Ok(element)
}

fn parse_rest(rest: &str) -> Result<InlineContent, String> {
    let (marker, escaping) = if rest.starts_with("&=") {
        (2, Escaping::Always)
    } else if rest.starts_with("!=") {
        (2, Escaping::Never)
    } else if rest.starts_with('=') {
        (1, Escaping::FollowSetting)
    } else if rest.starts_with("#{") {
        return Ok(InlineContent::Text(rest.trim_end().to_string()));
    } else if rest.trim().is_empty() {
        return Ok(InlineContent::None);
    } else if rest.starts_with(char::is_whitespace) {
        return Ok(InlineContent::Text(rest.trim().to_string()));
    } else {
        return Err(format!("unexpected text after element head: {rest:?}"));
    };

    let expression = rest[marker..].trim();
    if expression.is_empty() {
        return Err("expected an expression after '='".to_string());
    }
    Ok(InlineContent::Script {
        expression: expression.to_string(),
        escaping,
    })
}

/// `(key="v" key='v' key=expr key)`; the `(` is already consumed.
fn parse_html_attributes(cur: &mut Cursor<'_>, element: &mut Element) -> Result<(), String> {
    loop {
        cur.skip_whitespace();
        match cur.peek() {
            None => return Err("unterminated attribute list: expected ')'".to_string()),
            Some(')') => {
                cur.bump();
                return Ok(());
            }
            Some(_) => {}
        }

        let key = cur.take_while(|c| !c.is_whitespace() && c != '=' && c != ')');
        if key.is_empty() {
            return Err(format!("expected an attribute name in {:?}", cur.rest()));
        }
        let key = key.to_string();

        cur.skip_whitespace();
        if !cur.eat('=') {
            element.set_attribute(key, Some(AttrValue::Boolean))?;
            continue;
        }
        cur.skip_whitespace();

        let value = match cur.peek() {
            Some(q @ ('"' | '\'')) => {
                cur.bump();
                Some(AttrValue::Literal(cur.quoted(q)?))
            }
            Some(_) => {
                let expr = cur.take_while(|c| !c.is_whitespace() && c != ')');
                bare_value(expr)
            }
            None => return Err("unterminated attribute list: expected ')'".to_string()),
        };
        element.set_attribute(key, value)?;
    }
}

/// `{ key: "v", :key => "v", "key" => expr }`; the `{` is already consumed.
fn parse_hash_attributes(cur: &mut Cursor<'_>, element: &mut Element) -> Result<(), String> {
    loop {
        cur.skip_whitespace();
        match cur.peek() {
            None => return Err("unterminated attribute hash: expected '}'".to_string()),
            Some('}') => {
                cur.bump();
                return Ok(());
            }
            Some(',') => {
                cur.bump();
                continue;
            }
            Some(_) => {}
        }

        let key = match cur.peek() {
            Some(q @ ('"' | '\'')) => {
                cur.bump();
                let key = cur.quoted(q)?;
                cur.skip_whitespace();
                if !(cur.eat_str("=>") || cur.eat(':')) {
                    return Err(format!("expected '=>' after attribute name {key:?}"));
                }
                key
            }
            Some(':') => {
                cur.bump();
                let key = cur.take_while(is_ident_char).to_string();
                cur.skip_whitespace();
                if key.is_empty() || !cur.eat_str("=>") {
                    return Err("expected ':name =>' in attribute hash".to_string());
                }
                key
            }
            Some(_) => {
                let key = cur.take_while(is_ident_char).to_string();
                if key.is_empty() {
                    return Err(format!("expected an attribute name in {:?}", cur.rest()));
                }
                if !cur.eat(':') {
                    cur.skip_whitespace();
                    if !cur.eat_str("=>") {
                        return Err(format!("expected ':' or '=>' after attribute name {key:?}"));
                    }
                }
                key
            }
            None => return Err("unterminated attribute hash: expected '}'".to_string()),
        };

        cur.skip_whitespace();
        let value = match cur.peek() {
            Some(q @ ('"' | '\'')) => {
                cur.bump();
                Some(AttrValue::Literal(cur.quoted(q)?))
            }
            Some(_) => {
                let expr = cur.take_expression()?;
                if expr.is_empty() {
                    return Err(format!("expected a value for attribute {key:?}"));
                }
                bare_value(expr)
            }
            None => return Err("unterminated attribute hash: expected '}'".to_string()),
        };
        element.set_attribute(key, value)?;
    }
}

fn bare_value(expr: &str) -> Option<AttrValue> {
    match expr {
        "true" => Some(AttrValue::Boolean),
        "false" | "nil" => None,
        _ => Some(AttrValue::Expression(expr.to_string())),
    }
}

fn is_tag_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || c == ':'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

/// A byte cursor over the element text.
struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    const fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, expected: &str) -> bool {
        if self.rest().starts_with(expected) {
            self.pos += expected.len();
            true
        } else {
            false
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let end = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += end;
        &rest[..end]
    }

    fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }

    /// Reads a quoted string whose opening quote is already consumed.
    /// Backslash escapes the next character; `"` becomes `&quot;`.
    fn quoted(&mut self, quote: char) -> Result<String, String> {
        let mut value = String::new();
        while let Some(c) = self.bump() {
            match c {
                '\\' => match self.bump() {
                    Some('"') => value.push_str("&quot;"),
                    Some(escaped) => value.push(escaped),
                    None => break,
                },
                c if c == quote => return Ok(value),
                '"' => value.push_str("&quot;"),
                c => value.push(c),
            }
        }
        Err(format!("unterminated string: expected closing {quote}"))
    }

    /// Reads a bare hash value up to the next top-level `,` or `}`.
    fn take_expression(&mut self) -> Result<&'a str, String> {
        let rest = self.rest();
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        for (i, c) in rest.char_indices() {
            if let Some(q) = quote {
                if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '"' | '\'' => quote = Some(c),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                '}' if depth > 0 => depth -= 1,
                ',' | '}' if depth == 0 => {
                    self.pos += i;
                    return Ok(rest[..i].trim());
                }
                _ => {}
            }
        }
        Err("unterminated attribute hash: expected '}'".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html5() -> CompilerSettings {
        CompilerSettings::default()
    }

    fn xhtml() -> CompilerSettings {
        CompilerSettings {
            format: OutputFormat::Xhtml,
            ..CompilerSettings::default()
        }
    }

    fn open(text: &str) -> String {
        parse_element(text, "div").unwrap().open_tag(&html5())
    }

    #[test]
    fn test_default_tag() {
        let el = parse_element(".box", "div").unwrap();
        assert_eq!(el.tag, "div");
        assert_eq!(el.open_tag(&html5()), r#"<div class="box">"#);
        assert_eq!(el.close_tag(), "</div>");
    }

    #[test]
    fn test_custom_default_tag() {
        let el = parse_element("#main", "section").unwrap();
        assert_eq!(el.open_tag(&html5()), r#"<section id="main">"#);
    }

    #[test]
    fn test_tag_with_namespace() {
        let el = parse_element("%fb:like", "div").unwrap();
        assert_eq!(el.tag, "fb:like");
    }

    #[test]
    fn test_id_and_classes() {
        assert_eq!(open("%p#intro.a.b"), r#"<p id="intro" class="a b">"#);
    }

    #[test]
    fn test_html_attributes() {
        assert_eq!(
            open(r#"%a(href="/x" title='t' data-id=item.id)"#),
            r#"<a href="/x" title="t" data-id="{{ item.id }}">"#
        );
    }

    #[test]
    fn test_hash_attributes() {
        assert_eq!(
            open(r#"%a{ href: "/x", :title => 'T', "data-n" => count }"#),
            r#"<a href="/x" title="T" data-n="{{ count }}">"#
        );
    }

    #[test]
    fn test_both_attribute_styles() {
        assert_eq!(
            open(r#"%a(href="/a"){ rel: "nofollow" }"#),
            r#"<a href="/a" rel="nofollow">"#
        );
    }

    #[test]
    fn test_attribute_order() {
        assert_eq!(
            open(r#"%p.x(title="t" id="real" class="y")"#),
            r#"<p id="real" class="x y" title="t">"#
        );
    }

    #[test]
    fn test_explicit_id_overrides_shorthand() {
        assert_eq!(open("%p#short(id=\"long\")"), r#"<p id="long">"#);
    }

    #[test]
    fn test_repeated_key_keeps_position_last_value() {
        assert_eq!(
            open(r#"%p(a="1" b="2" a="3")"#),
            r#"<p a="3" b="2">"#
        );
    }

    #[test]
    fn test_boolean_attributes_html5() {
        assert_eq!(
            open("%input(type=\"checkbox\" checked disabled=true)"),
            r#"<input type="checkbox" checked disabled>"#
        );
    }

    #[test]
    fn test_boolean_attributes_xhtml() {
        let el = parse_element("%input(checked)", "div").unwrap();
        assert_eq!(el.open_tag(&xhtml()), r#"<input checked="checked" />"#);
    }

    #[test]
    fn test_false_and_nil_omit() {
        assert_eq!(
            open("%input{ checked: false, disabled: nil, value: v }"),
            r#"<input value="{{ v }}">"#
        );
    }

    #[test]
    fn test_single_quoted_double_quote() {
        assert_eq!(open(r#"%p(title='say "hi"')"#), r#"<p title="say &quot;hi&quot;">"#);
    }

    #[test]
    fn test_literal_values_interpolated() {
        assert_eq!(
            open(r#"%a(href="/u/#{user.id}")"#),
            r#"<a href="/u/{{ user.id }}">"#
        );
    }

    #[test]
    fn test_expression_escaped_when_enabled() {
        let settings = CompilerSettings {
            escape_html: true,
            ..CompilerSettings::default()
        };
        let el = parse_element("%a(href=url)", "div").unwrap();
        assert_eq!(el.open_tag(&settings), r#"<a href="{{ url|escape }}">"#);
    }

    #[test]
    fn test_class_attribute_expression_merges() {
        assert_eq!(
            open("%li.item{ class: state }"),
            r#"<li class="item {{ state }}">"#
        );
    }

    #[test]
    fn test_valueless_class_is_error() {
        assert!(parse_element("%p(class)", "div").unwrap_err().contains("class"));
        assert!(parse_element("%p(class=true)", "div").is_err());
        assert!(parse_element("%p{ class: true }", "div").is_err());
        assert_eq!(open("%p.a{ class: false }"), r#"<p class="a">"#);
    }

    #[test]
    fn test_void_elements() {
        let el = parse_element("%br", "div").unwrap();
        assert!(el.is_void());
        assert_eq!(el.open_tag(&html5()), "<br>");
        assert_eq!(el.open_tag(&xhtml()), "<br />");
        assert_eq!(el.close_tag(), "");
    }

    #[test]
    fn test_trailing_slash_self_closes() {
        let el = parse_element("%foo/", "div").unwrap();
        assert!(el.self_closing);
        assert_eq!(el.open_tag(&xhtml()), "<foo />");
    }

    #[test]
    fn test_inline_text() {
        let el = parse_element("%p   Hello there ", "div").unwrap();
        assert_eq!(el.content, InlineContent::Text("Hello there".into()));
    }

    #[test]
    fn test_inline_scripts() {
        let el = parse_element("%p= name", "div").unwrap();
        assert_eq!(
            el.content,
            InlineContent::Script {
                expression: "name".into(),
                escaping: Escaping::FollowSetting,
            }
        );
        let el = parse_element("%p&= name", "div").unwrap();
        assert!(matches!(
            el.content,
            InlineContent::Script { escaping: Escaping::Always, .. }
        ));
        let el = parse_element("%p!= name", "div").unwrap();
        assert!(matches!(
            el.content,
            InlineContent::Script { escaping: Escaping::Never, .. }
        ));
    }

    #[test]
    fn test_interpolation_right_after_head() {
        let el = parse_element("%p#{name}", "div").unwrap();
        assert_eq!(el.content, InlineContent::Text("#{name}".into()));
        assert!(el.id.is_none());
    }

    #[test]
    fn test_errors() {
        assert!(parse_element("%", "div").is_err());
        assert!(parse_element("%p.", "div").is_err());
        assert!(parse_element("#", "div").is_err());
        assert!(parse_element("%p(a=\"1\"", "div")
            .unwrap_err()
            .contains("unterminated"));
        assert!(parse_element("%p{ a: 1", "div")
            .unwrap_err()
            .contains("unterminated"));
        assert!(parse_element("%p(a=\"oops)", "div").is_err());
        assert!(parse_element("%p= ", "div").is_err());
        assert!(parse_element("%p!oops", "div").is_err());
    }

    #[test]
    fn test_void_with_content_is_error() {
        let err = parse_element("%br text", "div").unwrap_err();
        assert!(err.contains("void element"));
        assert!(parse_element("%img/= src", "div").is_err());
    }
}
