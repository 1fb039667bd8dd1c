//! Evaluation bindings.
//!
//! [`Bindings`] holds the named variables a
//! [`ContentEvaluator`](crate::evaluator::ContentEvaluator) binds into
//! compiled content before it is cached. Variables are [`Value`]s and are
//! resolved with dotted paths (`user.name`, `items.0`).

use std::collections::HashMap;
use std::fmt;

/// A value that can be bound into compiled content.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A string value.
    String(String),
    /// An integer value.
    Integer(i64),
    /// A floating-point value.
    Float(f64),
    /// A boolean value.
    Bool(bool),
    /// A list of values.
    List(Vec<Value>),
    /// A dictionary of values.
    Dict(HashMap<String, Value>),
    /// The null value.
    None,
    /// A string that is already safe markup and is never escaped.
    SafeString(String),
}

impl Value {
    /// Returns `true` if the value is marked safe.
    pub const fn is_safe(&self) -> bool {
        matches!(self, Self::SafeString(_))
    }

    /// Converts the value to its display form.
    pub fn to_display_string(&self) -> String {
        match self {
            Self::String(s) | Self::SafeString(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    format!("{f:.1}")
                } else {
                    f.to_string()
                }
            }
            Self::Bool(b) => {
                if *b {
                    "True".to_string()
                } else {
                    "False".to_string()
                }
            }
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(Self::to_display_string).collect();
                format!("[{}]", parts.join(", "))
            }
            Self::Dict(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                let parts: Vec<String> = keys
                    .into_iter()
                    .map(|k| format!("'{k}': {}", map[k].to_display_string()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            Self::None => "None".to_string(),
        }
    }

    /// Resolves a single path segment against this value.
    ///
    /// Dictionaries are indexed by key and lists by integer position.
    pub fn resolve_segment(&self, segment: &str) -> Option<&Self> {
        match self {
            Self::Dict(map) => map.get(segment),
            Self::List(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(o: Option<T>) -> Self {
        o.map_or(Self::None, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::None,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or(0.0)), Self::Integer),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(arr) => Self::List(arr.into_iter().map(Into::into).collect()),
            serde_json::Value::Object(map) => {
                Self::Dict(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

/// Named variables available to a content evaluator.
///
/// # Examples
///
/// ```
/// use haml_rs_template::context::{Bindings, Value};
///
/// let mut bindings = Bindings::new();
/// bindings.set("site", Value::from("Example"));
/// assert_eq!(bindings.get("site"), Some(&Value::from("Example")));
/// assert!(bindings.get("missing").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    vars: HashMap<String, Value>,
}

impl Bindings {
    /// Creates an empty set of bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds bindings from JSON values, as found in `Settings::globals`.
    pub fn from_json<I>(values: I) -> Self
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        Self {
            vars: values.into_iter().map(|(k, v)| (k, v.into())).collect(),
        }
    }

    /// Binds a variable, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Looks up a variable by dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.vars.get(first)?;
        for segment in segments {
            current = current.resolve_segment(segment)?;
        }
        Some(current)
    }

    /// The number of top-level variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns `true` if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Escapes HTML special characters: `&`, `<`, `>`, `"`, `'`.
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(ch),
        }
    }
    result
}
