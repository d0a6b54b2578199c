use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

/// A single query parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Rendered as ISO-8601 with millisecond precision, e.g. `2024-01-02T03:04:05.000Z`
    DateTime(DateTime<Utc>),
    /// Delimited array, rendered as comma-joined items
    Array(Vec<QueryValue>),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Null => f.write_str("null"),
            QueryValue::Bool(b) => write!(f, "{b}"),
            QueryValue::Int(i) => write!(f, "{i}"),
            QueryValue::Float(x) => write!(f, "{x}"),
            QueryValue::Str(s) => f.write_str(s),
            QueryValue::DateTime(dt) => {
                f.write_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            QueryValue::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for QueryValue {
    fn from(v: bool) -> Self {
        QueryValue::Bool(v)
    }
}

impl From<i32> for QueryValue {
    fn from(v: i32) -> Self {
        QueryValue::Int(i64::from(v))
    }
}

impl From<i64> for QueryValue {
    fn from(v: i64) -> Self {
        QueryValue::Int(v)
    }
}

impl From<u32> for QueryValue {
    fn from(v: u32) -> Self {
        QueryValue::Int(i64::from(v))
    }
}

impl From<f64> for QueryValue {
    fn from(v: f64) -> Self {
        QueryValue::Float(v)
    }
}

impl From<&str> for QueryValue {
    fn from(v: &str) -> Self {
        QueryValue::Str(v.to_owned())
    }
}

impl From<String> for QueryValue {
    fn from(v: String) -> Self {
        QueryValue::Str(v)
    }
}

impl From<DateTime<Utc>> for QueryValue {
    fn from(v: DateTime<Utc>) -> Self {
        QueryValue::DateTime(v)
    }
}

impl<T: Into<QueryValue>> From<Vec<T>> for QueryValue {
    fn from(v: Vec<T>) -> Self {
        QueryValue::Array(v.into_iter().map(Into::into).collect())
    }
}

/// Query parameters by name.
///
/// A `None` entry is an undefined value and is dropped during encoding.
/// `Some(QueryValue::Null)` is kept and rendered as `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Values(BTreeMap<String, Option<QueryValue>>);

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing any previous value under the same name
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.0.insert(name.into(), Some(value.into()));
        self
    }

    /// Set a parameter from an optional value; `None` leaves it undefined
    #[must_use]
    pub fn with_opt<V: Into<QueryValue>>(mut self, name: impl Into<String>, value: Option<V>) -> Self {
        self.0.insert(name.into(), value.map(Into::into));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Option<QueryValue>) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&QueryValue> {
        self.0.get(name).and_then(Option::as_ref)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&QueryValue>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }
}

impl<K: Into<String>> FromIterator<(K, Option<QueryValue>)> for Values {
    fn from_iter<I: IntoIterator<Item = (K, Option<QueryValue>)>>(iter: I) -> Self {
        Values(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Percent-encode a rendered value as a URI component.
///
/// Values that already carry valid percent-escapes are passed through so
/// pre-encoded input is not encoded twice.
pub fn encode_param(value: &str) -> String {
    match urlencoding::decode(value) {
        Ok(decoded) if decoded != value => value.to_owned(),
        _ => urlencoding::encode(value).into_owned(),
    }
}

/// Serialize parameters into `k=v&k2=v2`, skipping undefined values
pub fn encode_params(values: Option<&Values>) -> String {
    let Some(values) = values else {
        return String::new();
    };

    values
        .iter()
        .filter_map(|(name, value)| {
            value.map(|v| format!("{name}={}", encode_param(&v.to_string())))
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Append `?` and the encoded parameters to `path` when there is anything to add
pub fn add_query_params(path: &str, values: Option<&Values>) -> String {
    let params = encode_params(values);
    if params.is_empty() {
        path.to_owned()
    } else {
        format!("{path}?{params}")
    }
}
