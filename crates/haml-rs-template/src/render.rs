//! Rendering nodes to compiled output.
//!
//! Rendering is a pure function of the node tree, the compiler settings and
//! the filter container: rendering the same tree twice yields the same text.

use haml_rs_core::error::{HamlError, HamlResult};
use haml_rs_core::settings::{CompilerSettings, OutputFormat};

use crate::element::{Element, InlineContent};
use crate::filters::FilterContainer;
use crate::interpolate::{expression, interpolate};
use crate::node::{Comment, Doctype, FilterBlock, Node, NodeKind, Script, BLOCK_KEYWORDS};

/// Everything rendering reads besides the tree itself.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Compiler settings.
    pub settings: &'a CompilerSettings,
    /// Registered filters.
    pub filters: &'a FilterContainer,
}

/// Renders a list of sibling nodes.
///
/// Silent scripts followed by continuations (`else`, `elif`, `empty`) are
/// rendered as one chain closed by the opener's keyword. Two adjacent
/// inline-text siblings are separated by a newline.
pub fn render_nodes(nodes: &[Node], ctx: &RenderContext<'_>) -> HamlResult<String> {
    let mut out = String::new();
    let mut prev_inline = false;
    let mut i = 0;

    while i < nodes.len() {
        let node = &nodes[i];
        let rendered = match node.silent_keyword() {
            Some(keyword) if nodes.get(i + 1).is_some_and(Node::is_continuation) => {
                let mut chain = render_silent_body(node, ctx)?;
                while let Some(next) = nodes.get(i + 1).filter(|n| n.is_continuation()) {
                    chain.push_str(&render_silent_body(next, ctx)?);
                    i += 1;
                }
                chain.push_str(&block_close(keyword));
                chain
            }
            _ => render_node(node, ctx)?,
        };
        i += 1;

        if rendered.is_empty() {
            continue;
        }
        let inline = node.is_inline_text();
        if inline && prev_inline {
            out.push('\n');
        }
        out.push_str(&rendered);
        prev_inline = inline;
    }

    Ok(out)
}

/// Renders a single node and its children.
pub fn render_node(node: &Node, ctx: &RenderContext<'_>) -> HamlResult<String> {
    match &node.kind {
        NodeKind::Element(element) => render_element(element, node, ctx),
        NodeKind::Tag(Script::Silent { keyword, .. }) => {
            let mut out = render_silent_body(node, ctx)?;
            let is_continuation = node.is_continuation();
            if !is_continuation
                && (!node.children.is_empty() || BLOCK_KEYWORDS.contains(&keyword.as_str()))
            {
                out.push_str(&block_close(keyword));
            }
            Ok(out)
        }
        NodeKind::Tag(Script::Loud {
            expression: expr,
            escaping,
        }) => {
            let mut out = expression(expr, escaping.resolve(ctx.settings.escape_html));
            out.push_str(&render_nodes(&node.children, ctx)?);
            Ok(out)
        }
        NodeKind::Filter(block) => render_filter(block, node.line, ctx),
        NodeKind::Comment(Comment::Silent) => {
            // Children exist only under the discard policy; render them for
            // their errors and drop the output.
            render_nodes(&node.children, ctx)?;
            Ok(String::new())
        }
        NodeKind::Comment(Comment::Html { text, condition }) => {
            render_comment(text.as_deref(), condition.as_deref(), node, ctx)
        }
        NodeKind::Doctype(doctype) => Ok(render_doctype(doctype, ctx.settings.format)),
        NodeKind::PlainText(text) => Ok(interpolate(text, ctx.settings.escape_html)),
    }
}

/// `{% statement %}` followed by the rendered children.
fn render_silent_body(node: &Node, ctx: &RenderContext<'_>) -> HamlResult<String> {
    let NodeKind::Tag(Script::Silent { statement, .. }) = &node.kind else {
        return render_node(node, ctx);
    };
    let mut out = format!("{{% {statement} %}}");
    out.push_str(&render_nodes(&node.children, ctx)?);
    Ok(out)
}

fn block_close(keyword: &str) -> String {
    format!("{{% end{keyword} %}}")
}

fn render_element(element: &Element, node: &Node, ctx: &RenderContext<'_>) -> HamlResult<String> {
    let mut out = element.open_tag(ctx.settings);
    if element.is_void() {
        return Ok(out);
    }
    match &element.content {
        InlineContent::None => out.push_str(&render_nodes(&node.children, ctx)?),
        InlineContent::Text(text) => out.push_str(&interpolate(text, ctx.settings.escape_html)),
        InlineContent::Script {
            expression: expr,
            escaping,
        } => out.push_str(&expression(expr, escaping.resolve(ctx.settings.escape_html))),
    }
    out.push_str(&element.close_tag());
    Ok(out)
}

fn render_filter(block: &FilterBlock, line: usize, ctx: &RenderContext<'_>) -> HamlResult<String> {
    let filter = ctx
        .filters
        .get(&block.name)
        .ok_or_else(|| HamlError::UnknownFilter {
            name: block.name.clone(),
            line,
        })?;
    Ok(filter.filter(&interpolate(&block.text, ctx.settings.escape_html)))
}

fn render_comment(
    text: Option<&str>,
    condition: Option<&str>,
    node: &Node,
    ctx: &RenderContext<'_>,
) -> HamlResult<String> {
    let body = match text {
        Some(text) => interpolate(text, ctx.settings.escape_html),
        None => render_nodes(&node.children, ctx)?,
    };
    Ok(match (condition, text) {
        (Some(cond), _) => format!("<!--[{cond}]>{body}<![endif]-->"),
        (None, Some(_)) => format!("<!-- {body} -->"),
        (None, None) => format!("<!--{body}-->"),
    })
}

fn render_doctype(doctype: &Doctype, format: OutputFormat) -> String {
    if doctype.keyword == "xml" {
        let encoding = doctype.encoding.as_deref().unwrap_or("utf-8");
        return format!("<?xml version='1.0' encoding='{encoding}' ?>");
    }
    if format == OutputFormat::Html5 {
        return "<!DOCTYPE html>".to_string();
    }
    let (public_id, system_id) = match doctype.keyword.as_str() {
        "5" => return "<!DOCTYPE html>".to_string(),
        "strict" => (
            "-//W3C//DTD XHTML 1.0 Strict//EN",
            "http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd",
        ),
        "frameset" => (
            "-//W3C//DTD XHTML 1.0 Frameset//EN",
            "http://www.w3.org/TR/xhtml1/DTD/xhtml1-frameset.dtd",
        ),
        "1.1" => (
            "-//W3C//DTD XHTML 1.1//EN",
            "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd",
        ),
        "basic" => (
            "-//W3C//DTD XHTML Basic 1.1//EN",
            "http://www.w3.org/TR/xhtml-basic/xhtml-basic11.dtd",
        ),
        "mobile" => (
            "-//WAPFORUM//DTD XHTML Mobile 1.2//EN",
            "http://www.openmobilealliance.org/tech/DTD/xhtml-mobile12.dtd",
        ),
        "rdfa" => (
            "-//W3C//DTD XHTML+RDFa 1.0//EN",
            "http://www.w3.org/MarkUp/DTD/xhtml-rdfa-1.dtd",
        ),
        _ => (
            "-//W3C//DTD XHTML 1.0 Transitional//EN",
            "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd",
        ),
    };
    format!("<!DOCTYPE html PUBLIC \"{public_id}\" \"{system_id}\">")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Escaping;

    fn doctype(keyword: &str, encoding: Option<&str>) -> Doctype {
        Doctype {
            keyword: keyword.to_string(),
            encoding: encoding.map(str::to_string),
        }
    }

    #[test]
    fn test_doctype_html5() {
        assert_eq!(
            render_doctype(&doctype("strict", None), OutputFormat::Html5),
            "<!DOCTYPE html>"
        );
        assert_eq!(
            render_doctype(&doctype("", None), OutputFormat::Html5),
            "<!DOCTYPE html>"
        );
    }

    #[test]
    fn test_doctype_xml() {
        assert_eq!(
            render_doctype(&doctype("xml", None), OutputFormat::Html5),
            "<?xml version='1.0' encoding='utf-8' ?>"
        );
        assert_eq!(
            render_doctype(&doctype("xml", Some("iso-8859-1")), OutputFormat::Xhtml),
            "<?xml version='1.0' encoding='iso-8859-1' ?>"
        );
    }

    #[test]
    fn test_doctype_xhtml_table() {
        let strict = render_doctype(&doctype("strict", None), OutputFormat::Xhtml);
        assert!(strict.contains("XHTML 1.0 Strict"));
        let fallback = render_doctype(&doctype("bogus", None), OutputFormat::Xhtml);
        assert!(fallback.contains("XHTML 1.0 Transitional"));
        let empty = render_doctype(&doctype("", None), OutputFormat::Xhtml);
        assert_eq!(empty, fallback);
        assert_eq!(
            render_doctype(&doctype("5", None), OutputFormat::Xhtml),
            "<!DOCTYPE html>"
        );
        assert!(render_doctype(&doctype("1.1", None), OutputFormat::Xhtml).contains("XHTML 1.1"));
        assert!(render_doctype(&doctype("mobile", None), OutputFormat::Xhtml).contains("Mobile"));
        assert!(render_doctype(&doctype("rdfa", None), OutputFormat::Xhtml).contains("RDFa"));
        assert!(render_doctype(&doctype("basic", None), OutputFormat::Xhtml).contains("Basic"));
        assert!(
            render_doctype(&doctype("frameset", None), OutputFormat::Xhtml).contains("Frameset")
        );
    }

    #[test]
    fn test_loud_script_with_children() {
        let settings = CompilerSettings::default();
        let filters = FilterContainer::new();
        let ctx = RenderContext {
            settings: &settings,
            filters: &filters,
        };
        let mut node = Node::new(
            1,
            "= greeting",
            NodeKind::Tag(Script::Loud {
                expression: "greeting".into(),
                escaping: Escaping::Always,
            }),
        );
        node.children
            .push(Node::new(2, "  tail", NodeKind::PlainText("tail".into())));
        assert_eq!(render_node(&node, &ctx).unwrap(), "{{ greeting|escape }}tail");
    }

    #[test]
    fn test_unknown_filter_reports_line() {
        let settings = CompilerSettings::default();
        let filters = FilterContainer::with_builtins();
        let ctx = RenderContext {
            settings: &settings,
            filters: &filters,
        };
        let node = Node::new(
            7,
            ":coffee",
            NodeKind::Filter(FilterBlock {
                name: "coffee".into(),
                text: "x = 1".into(),
            }),
        );
        let err = render_node(&node, &ctx).unwrap_err();
        assert!(matches!(err, HamlError::UnknownFilter { ref name, line: 7 } if name == "coffee"));
    }
}
