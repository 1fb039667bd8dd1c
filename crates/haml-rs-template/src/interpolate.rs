//! `#{expr}` interpolation.
//!
//! Replaces every `#{expr}` in a text with expression output. A backslash
//! before the marker (`\#{`) yields a literal `#{`. A marker with no closing
//! brace, or with nothing inside it, is left as literal text.

/// Formats an expression as host-language output.
pub fn expression(expr: &str, escape: bool) -> String {
    if escape {
        format!("{{{{ {expr}|escape }}}}")
    } else {
        format!("{{{{ {expr} }}}}")
    }
}

/// Applies interpolation to `text`.
///
/// # Examples
///
/// ```
/// use haml_rs_template::interpolate::interpolate;
///
/// assert_eq!(interpolate("Hi #{name}!", false), "Hi {{ name }}!");
/// assert_eq!(interpolate("Hi #{name}!", true), "Hi {{ name|escape }}!");
/// assert_eq!(interpolate(r"\#{name}", false), "#{name}");
/// ```
pub fn interpolate(text: &str, escape: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find("#{") {
        if rest[..pos].ends_with('\\') {
            out.push_str(&rest[..pos - 1]);
            out.push_str("#{");
            rest = &rest[pos + 2..];
            continue;
        }

        out.push_str(&rest[..pos]);
        let after = &rest[pos + 2..];
        match find_closing_brace(after) {
            Some(end) if !after[..end].trim().is_empty() => {
                out.push_str(&expression(after[..end].trim(), escape));
                rest = &after[end + 1..];
            }
            _ => {
                out.push_str("#{");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Finds the `}` closing an interpolation, skipping quoted strings and
/// nested braces.
fn find_closing_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, ch) in s.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '{' => depth += 1,
            '}' if depth == 0 => return Some(i),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}
