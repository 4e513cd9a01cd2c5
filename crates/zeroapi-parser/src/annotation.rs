//! Canonical annotation values.
//!
//! Every annotation body, be it `@server(...)`, `@doc "..."` or an `info`
//! block, goes through [`canonical_value`]: one item becomes text, several
//! become a list, and keys listed in [`BOOLEAN_KEYS`] become booleans.
//! Quoted and bare spellings of the same item are equal.

use std::fmt;

use indexmap::IndexMap;

use crate::{
    error::{Diagnostic, DiagnosticCollector, ErrorCode},
    span::{Span, Spanned},
    syntax,
};

/// Keys whose value must be `true` or `false`, quoted or bare.
pub const BOOLEAN_KEYS: &[&str] = &["compact_handler", "signature"];

/// A canonical annotation value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Text(String),
    List(Vec<String>),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// The value as a list: text is a one-element list, `Bool` is empty.
    pub fn items(&self) -> Vec<&str> {
        match self {
            Value::Text(text) if text.is_empty() => Vec::new(),
            Value::Text(text) => vec![text.as_str()],
            Value::List(items) => items.iter().map(String::as_str).collect(),
            Value::Bool(_) => Vec::new(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(value) => write!(f, "{value}"),
            Value::Text(text) => f.write_str(text),
            Value::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

/// An annotation after canonicalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub name: Spanned<String>,
    /// Value of the inline form, `@handler getUser`.
    pub value: Option<Spanned<Value>>,
    /// Entries of the block form, `@server( key: value )`.
    pub properties: IndexMap<String, Spanned<Value>>,
    pub span: Span,
}

impl Annotation {
    pub fn name(&self) -> &str {
        self.name.inner()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key).map(|value| value.inner())
    }
}

/// Options of a service, merged from its `@server` annotations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerOptions {
    properties: IndexMap<String, Value>,
}

impl ServerOptions {
    pub(crate) fn from_annotations(annotations: &[Annotation]) -> Self {
        let properties = annotations
            .iter()
            .filter(|annotation| annotation.name() == "server")
            .flat_map(|annotation| annotation.properties.iter())
            .map(|(key, value)| (key.clone(), value.inner().clone()))
            .collect();
        Self { properties }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn group(&self) -> Option<&str> {
        self.get("group").and_then(Value::as_text)
    }

    pub fn prefix(&self) -> Option<&str> {
        self.get("prefix").and_then(Value::as_text)
    }

    pub fn jwt(&self) -> Option<&str> {
        self.get("jwt").and_then(Value::as_text)
    }

    /// Middleware names, always as a list.
    pub fn middleware(&self) -> Vec<&str> {
        self.get("middleware").map(Value::items).unwrap_or_default()
    }

    pub fn compact_handler(&self) -> Option<bool> {
        self.get("compact_handler").and_then(Value::as_bool)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Canonicalize the value stored under `key`.
///
/// Boolean keys holding anything but `true`/`false` keep their text and
/// get an `E207` warning.
pub(crate) fn canonical_value(
    key: &str,
    value: &syntax::AnnotationValue,
    diagnostics: &mut DiagnosticCollector,
) -> Spanned<Value> {
    let mut texts: Vec<String> = value
        .items
        .iter()
        .map(|item| item.inner().text().to_string())
        .collect();

    let canonical = match texts.len() {
        0 => Value::Text(String::new()),
        1 => Value::Text(texts.remove(0)),
        _ => Value::List(texts),
    };

    if !BOOLEAN_KEYS.contains(&key) {
        return Spanned::new(canonical, value.span);
    }

    let canonical = match canonical {
        Value::Text(text) if text == "true" => Value::Bool(true),
        Value::Text(text) if text == "false" => Value::Bool(false),
        other => {
            diagnostics.emit(
                Diagnostic::warning(format!(
                    "`{key}` expects `true` or `false`, found `{other}`"
                ))
                .with_code(ErrorCode::E207)
                .with_label(value.span, "not a boolean")
                .with_help("write `true` or `false`"),
            );
            other
        }
    };
    Spanned::new(canonical, value.span)
}

/// Canonicalize one annotation.
pub(crate) fn canonical_annotation(
    annotation: &syntax::Annotation,
    diagnostics: &mut DiagnosticCollector,
) -> Annotation {
    let name = annotation.name.clone();
    let (value, properties) = match &annotation.body {
        syntax::AnnotationBody::Empty => (None, IndexMap::new()),
        syntax::AnnotationBody::Inline(value) => (
            Some(canonical_value(name.inner(), value, diagnostics)),
            IndexMap::new(),
        ),
        syntax::AnnotationBody::Block(entries) => (None, canonical_entries(entries, diagnostics)),
    };

    Annotation {
        name,
        value,
        properties,
        span: annotation.span,
    }
}

/// Canonicalize `key: value` entries. A repeated key keeps its last value.
pub(crate) fn canonical_entries(
    entries: &[syntax::KeyValue],
    diagnostics: &mut DiagnosticCollector,
) -> IndexMap<String, Spanned<Value>> {
    entries
        .iter()
        .map(|entry| {
            let key = entry.key.inner().clone();
            let value = canonical_value(&key, &entry.value, diagnostics);
            (key, value)
        })
        .collect()
}
