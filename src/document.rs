//! Document model and text extraction.
//!
//! Knowledge bases hand us documents in many shapes: plain strings, objects
//! with `content`, `text` or `pageContent`, or vector-store points with a
//! nested `payload`. [`TextExtractable`] gives every shape one extraction
//! order, used everywhere text is needed (BM25, embeddings, MMR).
//!
//! # Extraction Order
//!
//! ```ascii
//! "raw string"            ──► itself
//! { content: "..." }      ──► content
//! { text: "..." }         ──► text
//! { pageContent: "..." }  ──► pageContent
//! { payload: { ... } }    ──► payload.content │ payload.text │ serialized payload
//! anything else           ──► serialized JSON
//! ```
//!
//! Empty strings do not match and fall through to the next rule.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Number of leading characters used as an id for documents without one.
const FALLBACK_ID_CHARS: usize = 50;

/// Top-level fields consumed by [`Document::from_value`] rather than kept as metadata.
const TEXT_FIELDS: &[&str] = &["id", "content", "text", "pageContent"];

/// Anything that can yield the text used for scoring.
pub trait TextExtractable {
    /// Return the canonical text of this value.
    fn extract_text(&self) -> Cow<'_, str>;
}

impl TextExtractable for str {
    fn extract_text(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl TextExtractable for String {
    fn extract_text(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}

impl<T: TextExtractable + ?Sized> TextExtractable for &T {
    fn extract_text(&self) -> Cow<'_, str> {
        (**self).extract_text()
    }
}

impl TextExtractable for Value {
    fn extract_text(&self) -> Cow<'_, str> {
        match self {
            Value::String(s) => Cow::Borrowed(s.as_str()),
            Value::Object(map) => {
                for field in ["content", "text", "pageContent"] {
                    if let Some(text) = non_empty_str(map.get(field)) {
                        return Cow::Borrowed(text);
                    }
                }
                if let Some(payload) = map.get("payload").filter(|p| is_truthy(p)) {
                    if let Value::Object(inner) = payload {
                        for field in ["content", "text"] {
                            if let Some(text) = non_empty_str(inner.get(field)) {
                                return Cow::Borrowed(text);
                            }
                        }
                    }
                    return Cow::Owned(payload.to_string());
                }
                Cow::Owned(self.to_string())
            }
            other => Cow::Owned(other.to_string()),
        }
    }
}

impl TextExtractable for Document {
    fn extract_text(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.text.as_str())
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn id_from_value(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// A retrievable unit of knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier, used to merge hits from different sources.
    pub id: String,
    /// Canonical text used for scoring.
    pub text: String,
    /// Opaque caller data carried through the pipeline untouched.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Document {
    /// Create a document with empty metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: Map::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Build a document from an arbitrary JSON shape.
    ///
    /// The id is taken from `id`, then `payload.id`, then the first
    /// 50 characters of the extracted text. Remaining top-level object
    /// fields become metadata.
    pub fn from_value(value: &Value) -> Self {
        let text = value.extract_text().into_owned();

        let id = match value {
            Value::Object(map) => id_from_value(map.get("id")).or_else(|| {
                map.get("payload")
                    .and_then(|p| p.as_object())
                    .and_then(|p| id_from_value(p.get("id")))
            }),
            _ => None,
        }
        .unwrap_or_else(|| text.chars().take(FALLBACK_ID_CHARS).collect());

        let metadata = match value {
            Value::Object(map) => map
                .iter()
                .filter(|(k, _)| !TEXT_FIELDS.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            _ => Map::new(),
        };

        Self { id, text, metadata }
    }
}
