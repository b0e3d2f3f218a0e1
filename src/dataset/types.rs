use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::scoring::text::is_blank;

/// A raw field value as it arrives from ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl FieldValue {
    /// Text form of the value, or `None` when it is null, blank or a
    /// placeholder such as "nan".
    pub fn as_text(&self) -> Option<String> {
        match self {
            FieldValue::Number(n) => Some(n.to_string()),
            FieldValue::Text(s) if is_blank(Some(s)) => None,
            FieldValue::Text(s) => Some(s.trim().to_string()),
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Null => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Null => Ok(()),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

/// One subject's narrative, quantitative fields and protected attributes.
///
/// ```json
/// {"subject_id": "E-104", "narrative": "Delivered on time...",
///  "fields": {"performance_grade": "B+", "kpi_score": 0.82},
///  "attributes": {"gender": "F", "age_band": "30s"}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub subject_id: String,

    #[serde(default)]
    pub narrative: Option<String>,

    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,

    #[serde(default)]
    pub attributes: BTreeMap<String, FieldValue>,
}

impl EvaluationRecord {
    /// Resolved protected attributes; blank values are dropped.
    pub fn attribute_labels(&self) -> BTreeMap<String, String> {
        self.attributes
            .iter()
            .filter_map(|(k, v)| v.as_text().map(|label| (k.clone(), label)))
            .collect()
    }
}
