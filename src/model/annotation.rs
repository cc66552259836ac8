//! Vertex annotations of phylogenetic trees.
//!
//! [Annotations] stores one column per key, each parallel to the tree's
//! vertex arena. Keys keep the order in which they were first added, so
//! annotated output is deterministic. Values are captured by
//! [AnnotationValue].

use crate::model::VertexIndex;
use std::collections::HashMap;
use std::fmt;

// =#========================================================================#=
// ANNOTATIONS
// =#========================================================================$=
/// Vertex annotations for multiple keys.
#[derive(Debug, Clone, Default)]
pub struct Annotations {
    /// Keys in insertion order
    keys: Vec<String>,
    /// Key to position in `keys` and `columns`
    key_index: HashMap<String, usize>,
    /// Per key, one optional value per vertex
    columns: Vec<Vec<Option<AnnotationValue>>>,
    num_vertices: usize,
}

impl Annotations {
    /// Creates empty annotations for a tree with (about) `num_vertices`
    /// vertices; columns grow if larger vertex indices are used.
    pub fn new(num_vertices: usize) -> Self {
        Annotations {
            num_vertices,
            ..Default::default()
        }
    }

    /// Annotation keys in the order they were first added.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.key_index.contains_key(key)
    }

    /// All values for `key`, one slot per vertex, or `None` for an unknown key.
    pub fn get_all_for_key(&self, key: &str) -> Option<&[Option<AnnotationValue>]> {
        self.key_index
            .get(key)
            .map(|&column| self.columns[column].as_slice())
    }

    /// The value of `key` at the given vertex, if any.
    pub fn get(&self, key: &str, vertex_index: VertexIndex) -> Option<&AnnotationValue> {
        self.get_all_for_key(key)
            .and_then(|column| column.get(vertex_index))
            .and_then(Option::as_ref)
    }

    /// Sets the value of `key` at the given vertex, replacing any previous one.
    pub fn add(
        &mut self,
        key: impl Into<String>,
        vertex_index: VertexIndex,
        value: AnnotationValue,
    ) {
        let key = key.into();
        let column = match self.key_index.get(&key) {
            Some(&column) => column,
            None => {
                self.keys.push(key.clone());
                self.columns.push(vec![None; self.num_vertices]);
                self.key_index.insert(key, self.columns.len() - 1);
                self.columns.len() - 1
            }
        };

        let values = &mut self.columns[column];
        if vertex_index >= values.len() {
            values.resize(vertex_index + 1, None);
        }
        values[vertex_index] = Some(value);
    }

    /// All `(key, value)` pairs present at the given vertex, in key order.
    pub fn for_vertex(
        &self,
        vertex_index: VertexIndex,
    ) -> impl Iterator<Item = (&str, &AnnotationValue)> + '_ {
        self.keys
            .iter()
            .zip(&self.columns)
            .filter_map(move |(key, column)| {
                column
                    .get(vertex_index)
                    .and_then(Option::as_ref)
                    .map(|value| (key.as_str(), value))
            })
    }

    /// Removes all keys and values.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.key_index.clear();
        self.columns.clear();
    }
}

// =#========================================================================#=
// ANNOTATION VALUE
// =#========================================================================€=
/// A parsed or computed annotation value.
///
/// Written in BEAST's annotation syntax by [Display]: strings in double
/// quotes and arrays in braces, e.g. `{0.1,0.7}`.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    String(String),
    /// Brace-delimited list, possibly nested
    Array(Vec<AnnotationValue>),
}

impl AnnotationValue {
    /// Numeric value of `Float` and `Int`, `None` otherwise.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AnnotationValue::Float(v) => Some(*v),
            AnnotationValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Interprets an unquoted token: integer, float, boolean, else string.
    pub fn from_token(token: &str) -> Self {
        if let Ok(v) = token.parse::<i64>() {
            AnnotationValue::Int(v)
        } else if let Ok(v) = token.parse::<f64>() {
            AnnotationValue::Float(v)
        } else if token.eq_ignore_ascii_case("true") {
            AnnotationValue::Bool(true)
        } else if token.eq_ignore_ascii_case("false") {
            AnnotationValue::Bool(false)
        } else {
            AnnotationValue::String(token.to_string())
        }
    }
}

impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationValue::Float(v) => write!(f, "{v}"),
            AnnotationValue::Int(v) => write!(f, "{v}"),
            AnnotationValue::Bool(v) => write!(f, "{v}"),
            AnnotationValue::String(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            AnnotationValue::Array(values) => {
                f.write_str("{")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<f64> for AnnotationValue {
    fn from(v: f64) -> Self {
        AnnotationValue::Float(v)
    }
}

impl From<i64> for AnnotationValue {
    fn from(v: i64) -> Self {
        AnnotationValue::Int(v)
    }
}

impl From<usize> for AnnotationValue {
    fn from(v: usize) -> Self {
        AnnotationValue::Int(v as i64)
    }
}

impl From<bool> for AnnotationValue {
    fn from(v: bool) -> Self {
        AnnotationValue::Bool(v)
    }
}

impl From<String> for AnnotationValue {
    fn from(v: String) -> Self {
        AnnotationValue::String(v)
    }
}

impl From<&str> for AnnotationValue {
    fn from(v: &str) -> Self {
        AnnotationValue::String(v.to_string())
    }
}

impl From<Vec<f64>> for AnnotationValue {
    fn from(values: Vec<f64>) -> Self {
        AnnotationValue::Array(values.into_iter().map(AnnotationValue::Float).collect())
    }
}
