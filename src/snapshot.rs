use crate::format::{js_number, value_text};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One analytics payload for a shop and time range, as returned by `/stats`.
///
/// Every key is optional; absent or `null` keys read as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default, deserialize_with = "null_as_default")]
    pub metrics: Map<String, Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub active_visitors: Vec<Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub top_pages: Vec<Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub entry_pages: Vec<Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub exit_pages: Vec<Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub traffic_sources: Vec<Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub devices: Vec<Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub browsers: Vec<Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub geography: Vec<Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Snapshot {
    /// Value of a metric, `None` when missing or `null`.
    pub fn metric(&self, name: &str) -> Option<&Value> {
        self.metrics.get(name).filter(|v| !v.is_null())
    }

    /// Numeric `<name>_change` delta for a metric.
    pub fn metric_change(&self, name: &str) -> Option<f64> {
        self.metrics
            .get(&format!("{}_change", name))
            .and_then(Value::as_f64)
    }
}

/// Read access to one loosely typed row of a list section.
///
/// A field falls back whenever it is missing, `null`, `false`, `0` or `""`.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a>(pub &'a Value);

impl<'a> Record<'a> {
    pub fn field(&self, key: &str) -> Option<&'a Value> {
        self.0.get(key).filter(|v| is_truthy(v))
    }

    /// First present field among `keys`, as text.
    pub fn text(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|k| self.field(k)).map(value_text)
    }

    pub fn text_or(&self, keys: &[&str], fallback: &str) -> String {
        self.text(keys).unwrap_or_else(|| fallback.to_string())
    }

    /// Count-like field printed as-is, `0` when absent.
    pub fn count(&self, key: &str) -> String {
        self.field(key)
            .map(value_text)
            .unwrap_or_else(|| js_number(0.0))
    }

    /// Numeric field, `0.0` when absent or not a number.
    pub fn number(&self, key: &str) -> f64 {
        match self.field(key) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
