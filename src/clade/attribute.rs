//! Attribute values sampled per clade occurrence.

use crate::model::AnnotationValue;

/// One sampled value of a tracked attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleValue {
    Number(f64),
    Bool(bool),
    Discrete(String),
    /// Bivariate value, e.g. a `location1`/`location2` pair
    Pair(f64, f64),
}

impl SampleValue {
    /// Converts a univariate annotation value; arrays are not univariate.
    pub fn from_annotation(value: &AnnotationValue) -> Option<Self> {
        match value {
            AnnotationValue::Float(x) => Some(SampleValue::Number(*x)),
            AnnotationValue::Int(i) => Some(SampleValue::Number(*i as f64)),
            AnnotationValue::Bool(b) => Some(SampleValue::Bool(*b)),
            AnnotationValue::String(s) => Some(SampleValue::Discrete(s.clone())),
            AnnotationValue::Array(_) => None,
        }
    }

    /// Converts a two-element numeric array annotation into a [SampleValue::Pair].
    pub fn pair_from_annotation(value: &AnnotationValue) -> Option<Self> {
        match value {
            AnnotationValue::Array(values) if values.len() == 2 => {
                Some(SampleValue::Pair(values[0].as_f64()?, values[1].as_f64()?))
            }
            _ => None,
        }
    }

    /// Numeric value, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            SampleValue::Number(x) => Some(*x),
            _ => None,
        }
    }
}

/// Values of all tracked attributes at one clade occurrence, one slot per
/// attribute name (`None` where the tree carried no usable value).
pub type AttributeTuple = Vec<Option<SampleValue>>;
