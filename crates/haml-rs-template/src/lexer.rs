//! Line lexer.
//!
//! Splits template source into [`SourceLine`]s and measures their
//! indentation. A file is indented either with tabs or with spaces; the
//! width of one level is taken from the first indented node line and every
//! later node line must be a whole multiple of it.

use haml_rs_core::error::HamlError;

/// One line of template source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// 1-based line number.
    pub number: usize,
    /// The full line text, without the line terminator.
    pub text: String,
    indent_len: usize,
}

impl SourceLine {
    /// Creates a source line, measuring its leading whitespace.
    pub fn new(number: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        let indent_len = text.len() - text.trim_start_matches(is_indent_char).len();
        Self {
            number,
            text,
            indent_len,
        }
    }

    /// The leading whitespace of the line.
    pub fn indent(&self) -> &str {
        &self.text[..self.indent_len]
    }

    /// The number of leading whitespace characters.
    pub const fn indent_width(&self) -> usize {
        self.indent_len
    }

    /// The line text with surrounding whitespace removed.
    pub fn content(&self) -> &str {
        self.text.trim()
    }

    /// Returns `true` if the line holds nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.content().is_empty()
    }

    /// Builds a structural error pointing at this line.
    pub fn error(&self, message: impl Into<String>) -> HamlError {
        HamlError::structural(self.number, self.text.clone(), message)
    }
}

const fn is_indent_char(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Splits a source string into lines. Both `\n` and `\r\n` terminators are
/// accepted.
pub fn lex_lines(source: &str) -> Vec<SourceLine> {
    source
        .lines()
        .enumerate()
        .map(|(idx, text)| SourceLine::new(idx + 1, text))
        .collect()
}

/// Tracks the indentation unit of a file and converts indents to depths.
#[derive(Debug, Default, Clone)]
pub struct Indentation {
    unit: Option<(char, usize)>,
}

impl Indentation {
    /// Creates a tracker with no unit detected yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the nesting depth of a node line.
    ///
    /// The first indented line fixes the unit (character and width).
    ///
    /// # Errors
    ///
    /// Returns a `StructuralError` if the indent mixes tabs and spaces, uses
    /// a different character than the file's unit, or is not a whole
    /// multiple of the unit width.
    pub fn depth(&mut self, line: &SourceLine) -> Result<usize, HamlError> {
        let indent = line.indent();
        let Some(first) = indent.chars().next() else {
            return Ok(0);
        };

        if indent.chars().any(|c| c != first) {
            return Err(line.error("indentation mixes tabs and spaces"));
        }

        match self.unit {
            None => {
                self.unit = Some((first, indent.len()));
                Ok(1)
            }
            Some((unit_char, width)) => {
                if first != unit_char {
                    return Err(line.error(format!(
                        "indented with {} but the file is indented with {}",
                        describe(first),
                        describe(unit_char)
                    )));
                }
                if indent.len() % width != 0 {
                    return Err(line.error(format!(
                        "indentation of {} is not a multiple of the file's indentation unit ({width})",
                        indent.len()
                    )));
                }
                Ok(indent.len() / width)
            }
        }
    }

    /// The detected unit as `(character, width)`, if any line was indented.
    pub const fn unit(&self) -> Option<(char, usize)> {
        self.unit
    }
}

const fn describe(c: char) -> &'static str {
    if c == '\t' {
        "tabs"
    } else {
        "spaces"
    }
}
