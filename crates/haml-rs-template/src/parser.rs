//! Tree construction.
//!
//! Walks the source lines, builds one [`Node`] per structural line, and
//! nests nodes by indentation depth using a stack of open nodes. Filter
//! blocks (and silent comments under the drop policy) capture the deeper
//! lines that follow them as raw text instead.

use haml_rs_core::error::{HamlError, HamlResult};
use haml_rs_core::settings::{CompilerSettings, SilentCommentPolicy};

use crate::classifier::{classify, NodeType};
use crate::element::parse_element;
use crate::lexer::{lex_lines, Indentation, SourceLine};
use crate::node::{continues_chain, Comment, Doctype, Escaping, FilterBlock, Node, NodeKind, Script};

/// Parses template source into its root nodes.
///
/// # Errors
///
/// Returns a `StructuralError` for malformed indentation, illegal nesting,
/// or a malformed line.
///
/// # Examples
///
/// ```
/// use haml_rs_core::settings::CompilerSettings;
/// use haml_rs_template::parser::parse;
///
/// let roots = parse("%ul\n  %li one\n  %li two", &CompilerSettings::default()).unwrap();
/// assert_eq!(roots.len(), 1);
/// assert_eq!(roots[0].children.len(), 2);
/// ```
pub fn parse(source: &str, settings: &CompilerSettings) -> HamlResult<Vec<Node>> {
    let lines = lex_lines(source);
    let mut indentation = Indentation::new();
    let mut stack: Vec<(Node, usize)> = Vec::new();
    let mut roots: Vec<Node> = Vec::new();
    let mut prev_depth: Option<usize> = None;
    let mut i = 0;

    while i < lines.len() {
        let line = &lines[i];
        i += 1;
        let Some(node_type) = classify(&line.text) else {
            continue;
        };

        let depth = indentation.depth(line)?;
        match prev_depth {
            None if depth > 0 => {
                return Err(line.error("the first line of a template cannot be indented"));
            }
            Some(prev) if depth > prev + 1 => {
                return Err(line.error(format!(
                    "indentation jumped from level {prev} to level {depth}"
                )));
            }
            _ => {}
        }

        let mut node = build_node(line, node_type, settings)?;

        match &mut node.kind {
            NodeKind::Filter(block) => {
                let (text, next) = capture_raw_block(&lines, i, line.indent_width());
                block.text = text;
                i = next;
            }
            NodeKind::Comment(Comment::Silent)
                if settings.silent_comments == SilentCommentPolicy::Drop =>
            {
                let (_, next) = capture_raw_block(&lines, i, line.indent_width());
                i = next;
            }
            _ => {}
        }

        while stack.last().is_some_and(|(_, d)| *d >= depth) {
            if let Some((done, _)) = stack.pop() {
                attach(done, &mut stack, &mut roots);
            }
        }

        let siblings = match stack.last() {
            Some((parent, _)) => {
                parent.accepts_children().map_err(|msg| {
                    HamlError::structural(
                        line.number,
                        line.text.clone(),
                        format!("{msg} (parent on line {})", parent.line),
                    )
                })?;
                &parent.children
            }
            None => &roots,
        };
        if let Some(next) = node.silent_keyword().filter(|_| node.is_continuation()) {
            let Some(last) = siblings.last().and_then(Node::silent_keyword) else {
                return Err(line.error(format!(
                    "'- {next}' must directly follow a '-' statement at the same level"
                )));
            };
            let opener = siblings
                .iter()
                .rev()
                .find(|n| !n.is_continuation())
                .and_then(Node::silent_keyword)
                .unwrap_or(last);
            if !continues_chain(opener, last, next) {
                return Err(line.error(format!("'- {next}' cannot continue '- {last}'")));
            }
        }

        stack.push((node, depth));
        prev_depth = Some(depth);
    }

    while let Some((done, _)) = stack.pop() {
        attach(done, &mut stack, &mut roots);
    }

    Ok(roots)
}

fn attach(node: Node, stack: &mut [(Node, usize)], roots: &mut Vec<Node>) {
    match stack.last_mut() {
        Some((parent, _)) => parent.children.push(node),
        None => roots.push(node),
    }
}

/// Builds the node for one classified line.
fn build_node(
    line: &SourceLine,
    node_type: NodeType,
    settings: &CompilerSettings,
) -> HamlResult<Node> {
    let content = line.content();
    let kind = match node_type {
        NodeType::Element => NodeKind::Element(
            parse_element(content, &settings.default_tag).map_err(|msg| line.error(msg))?,
        ),
        NodeType::Tag => NodeKind::Tag(parse_script(line)?),
        NodeType::Filter => {
            let name = content[1..].split_whitespace().next().unwrap_or_default();
            if name.is_empty() {
                return Err(line.error("expected a filter name after ':'"));
            }
            NodeKind::Filter(FilterBlock {
                name: name.to_string(),
                text: String::new(),
            })
        }
        NodeType::Comment => NodeKind::Comment(parse_comment(line)?),
        NodeType::Doctype => {
            let after = content
                .split_once("!!!")
                .map_or("", |(_, after)| after);
            let mut words = after.split_whitespace();
            NodeKind::Doctype(Doctype {
                keyword: words.next().unwrap_or_default().to_lowercase(),
                encoding: words.next().map(str::to_string),
            })
        }
        NodeType::PlainText => {
            NodeKind::PlainText(content.strip_prefix('\\').unwrap_or(content).to_string())
        }
    };
    Ok(Node::new(line.number, line.text.clone(), kind))
}

fn parse_script(line: &SourceLine) -> HamlResult<Script> {
    let content = line.content();
    let (marker_len, escaping) = if content.starts_with("&=") {
        (2, Escaping::Always)
    } else if content.starts_with("!=") {
        (2, Escaping::Never)
    } else if content.starts_with('=') {
        (1, Escaping::FollowSetting)
    } else {
        let statement = content[1..].trim();
        let Some(keyword) = statement.split_whitespace().next() else {
            return Err(line.error("expected a statement after '-'"));
        };
        return Ok(Script::Silent {
            keyword: keyword.to_string(),
            statement: statement.to_string(),
        });
    };

    let expression = content[marker_len..].trim();
    if expression.is_empty() {
        return Err(line.error("expected an expression after '='"));
    }
    Ok(Script::Loud {
        expression: expression.to_string(),
        escaping,
    })
}

fn parse_comment(line: &SourceLine) -> HamlResult<Comment> {
    let content = line.content();
    if content.starts_with("-#") {
        return Ok(Comment::Silent);
    }

    let rest = content[1..].trim();
    if let Some(cond) = rest.strip_prefix('[') {
        let Some((condition, after)) = cond.split_once(']') else {
            return Err(line.error("unterminated conditional comment: expected ']'"));
        };
        let after = after.trim();
        return Ok(Comment::Html {
            text: (!after.is_empty()).then(|| after.to_string()),
            condition: Some(condition.trim().to_string()),
        });
    }

    Ok(Comment::Html {
        text: (!rest.is_empty()).then(|| rest.to_string()),
        condition: None,
    })
}

/// Captures the raw block starting at `start`: every following line that is
/// blank or indented deeper than `parent_width`. Trailing blank lines are
/// left out. Returns the dedented text and the index of the first line after
/// the block.
pub fn capture_raw_block(
    lines: &[SourceLine],
    start: usize,
    parent_width: usize,
) -> (String, usize) {
    let mut end = start;
    while end < lines.len() && (lines[end].is_blank() || lines[end].indent_width() > parent_width)
    {
        end += 1;
    }
    while end > start && lines[end - 1].is_blank() {
        end -= 1;
    }
    (dedent(&lines[start..end]), end)
}

/// Joins lines with their common leading indentation removed.
fn dedent(lines: &[SourceLine]) -> String {
    let common = lines
        .iter()
        .filter(|l| !l.is_blank())
        .map(SourceLine::indent_width)
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|l| {
            if l.is_blank() {
                ""
            } else {
                l.text[common..].trim_end()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::InlineContent;

    fn parse_default(source: &str) -> HamlResult<Vec<Node>> {
        parse(source, &CompilerSettings::default())
    }

    fn structural_line(result: HamlResult<Vec<Node>>) -> usize {
        match result {
            Err(HamlError::StructuralError { line, .. }) => line,
            other => panic!("expected a structural error, got {other:?}"),
        }
    }

    #[test]
    fn test_nesting() {
        let roots = parse_default("%div\n  %p\n    %b x\n  %p y\n%footer").unwrap();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].children.len(), 2);
        assert_eq!(roots[0].children[0].children.len(), 1);
        assert_eq!(roots[0].children[0].children[0].line, 3);
        assert_eq!(roots[1].line, 5);
    }

    #[test]
    fn test_blank_lines_ignored() {
        let roots = parse_default("%div\n\n  %p\n   \n%span").unwrap();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].children.len(), 1);
    }

    #[test]
    fn test_two_level_jump() {
        assert_eq!(structural_line(parse_default("%div\n  %p\n      %b")), 3);
        assert_eq!(structural_line(parse_default("%div\n  %p\n%a\n    %b")), 4);
    }

    #[test]
    fn test_first_line_indented() {
        assert_eq!(structural_line(parse_default("\n  %p")), 2);
    }

    #[test]
    fn test_children_of_plain_text() {
        let err = parse_default("hello\n  %p").unwrap_err();
        assert!(err.to_string().contains("plain text"));
    }

    #[test]
    fn test_children_of_inline_element() {
        assert_eq!(structural_line(parse_default("%p hi\n  %b")), 2);
    }

    #[test]
    fn test_children_of_void() {
        assert_eq!(structural_line(parse_default("%br\n  text")), 2);
    }

    #[test]
    fn test_doctype_children() {
        assert_eq!(structural_line(parse_default("!!! 5\n  %p")), 2);
    }

    #[test]
    fn test_comment_with_text_and_children() {
        assert_eq!(structural_line(parse_default("/ note\n  %p")), 2);
    }

    #[test]
    fn test_filter_captures_raw_block() {
        let roots =
            parse_default("%div\n  :javascript\n    if (a) {\n\n      b();\n    }\n\n  %p").unwrap();
        let div = &roots[0];
        assert_eq!(div.children.len(), 2);
        match &div.children[0].kind {
            NodeKind::Filter(block) => {
                assert_eq!(block.name, "javascript");
                assert_eq!(block.text, "if (a) {\n\n  b();\n}");
            }
            other => panic!("expected a filter, got {other:?}"),
        }
    }

    #[test]
    fn test_filter_block_is_not_classified() {
        // `%%` and odd indentation inside a filter are not errors.
        let roots = parse_default(":plain\n   %% odd\n     \t mixed\n%p").unwrap();
        assert_eq!(roots.len(), 2);
        let NodeKind::Filter(block) = &roots[0].kind else {
            panic!("expected a filter");
        };
        assert_eq!(block.text, "%% odd\n  \t mixed");
    }

    #[test]
    fn test_filter_without_name() {
        assert_eq!(structural_line(parse_default(":")), 1);
    }

    #[test]
    fn test_silent_comment_drop() {
        let roots = parse_default("-# hidden\n  %p(broken\n    !!!\n%p ok").unwrap();
        assert_eq!(roots.len(), 2);
        assert!(roots[0].children.is_empty());
    }

    #[test]
    fn test_silent_comment_discard_parses_children() {
        let settings = CompilerSettings {
            silent_comments: SilentCommentPolicy::Discard,
            ..CompilerSettings::default()
        };
        let roots = parse("-# hidden\n  %p x", &settings).unwrap();
        assert_eq!(roots[0].children.len(), 1);
        assert!(parse("-# hidden\n  %p(broken", &settings).is_err());
    }

    #[test]
    fn test_continuation_requires_silent_sibling() {
        assert!(parse_default("- if a\n  x\n- else\n  y").is_ok());
        assert!(parse_default("- for x in xs\n  = x\n- empty\n  none").is_ok());
        assert_eq!(structural_line(parse_default("%p\n- else")), 2);
        assert_eq!(structural_line(parse_default("%div\n  - else")), 2);
    }

    #[test]
    fn test_continuation_must_match_opener() {
        assert!(parse_default("- if a\n  x\n- elif b\n  y\n- else\n  z").is_ok());
        assert!(parse_default("- ifchanged day\n  = day\n- else\n  same").is_ok());

        assert_eq!(structural_line(parse_default("- load static\n- else\n  x")), 2);
        assert_eq!(structural_line(parse_default("- with a=b\n  x\n- elif c\n  y")), 3);
        assert_eq!(structural_line(parse_default("- for x in xs\n  = x\n- else\n  y")), 3);
        assert_eq!(structural_line(parse_default("- if a\n  x\n- empty\n  y")), 3);
        assert_eq!(
            structural_line(parse_default("- if a\n  x\n- else\n  y\n- elif b\n  z")),
            5
        );
        assert_eq!(
            structural_line(parse_default("- for x in xs\n  = x\n- empty\n  a\n- empty\n  b")),
            5
        );
    }

    #[test]
    fn test_script_parsing() {
        let roots = parse_default("- if user.is_admin\n= name\n&= a\n!= b").unwrap();
        assert_eq!(
            roots[0].kind,
            NodeKind::Tag(Script::Silent {
                statement: "if user.is_admin".into(),
                keyword: "if".into(),
            })
        );
        assert_eq!(
            roots[1].kind,
            NodeKind::Tag(Script::Loud {
                expression: "name".into(),
                escaping: Escaping::FollowSetting,
            })
        );
        assert!(matches!(
            roots[2].kind,
            NodeKind::Tag(Script::Loud { escaping: Escaping::Always, .. })
        ));
        assert!(matches!(
            roots[3].kind,
            NodeKind::Tag(Script::Loud { escaping: Escaping::Never, .. })
        ));
    }

    #[test]
    fn test_empty_script() {
        assert_eq!(structural_line(parse_default("-")), 1);
        assert_eq!(structural_line(parse_default("=")), 1);
    }

    #[test]
    fn test_comment_parsing() {
        let roots = parse_default("/ note\n/[if IE]\n  %p\n/\n  %p").unwrap();
        assert_eq!(
            roots[0].kind,
            NodeKind::Comment(Comment::Html {
                text: Some("note".into()),
                condition: None,
            })
        );
        assert_eq!(
            roots[1].kind,
            NodeKind::Comment(Comment::Html {
                text: None,
                condition: Some("if IE".into()),
            })
        );
        assert_eq!(roots[2].children.len(), 1);
        assert_eq!(structural_line(parse_default("/[if IE")), 1);
    }

    #[test]
    fn test_doctype_parsing() {
        let roots = parse_default("!!! XML iso-8859-1").unwrap();
        assert_eq!(
            roots[0].kind,
            NodeKind::Doctype(Doctype {
                keyword: "xml".into(),
                encoding: Some("iso-8859-1".into()),
            })
        );
    }

    #[test]
    fn test_plain_text_escape() {
        let roots = parse_default("\\= not a script").unwrap();
        assert_eq!(roots[0].kind, NodeKind::PlainText("= not a script".into()));
    }

    #[test]
    fn test_element_error_has_line() {
        let err = parse_default("%p\n%a(href=\"x\"").unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert!(err.to_string().contains("unterminated"));
    }

    #[test]
    fn test_element_inline_content_kept() {
        let roots = parse_default("%h1 Title").unwrap();
        let NodeKind::Element(el) = &roots[0].kind else {
            panic!("expected an element");
        };
        assert_eq!(el.content, InlineContent::Text("Title".into()));
    }

    #[test]
    fn test_tab_indentation() {
        let roots = parse_default("%ul\n\t%li a\n\t%li b").unwrap();
        assert_eq!(roots[0].children.len(), 2);
    }

    #[test]
    fn test_mixed_indentation_across_lines() {
        assert_eq!(structural_line(parse_default("%ul\n  %li\n\t%li")), 3);
    }

    #[test]
    fn test_dedent() {
        let lines = lex_lines("    a\n      b\n\n    c");
        assert_eq!(dedent(&lines), "a\n  b\n\nc");
    }
}
