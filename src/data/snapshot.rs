//! Snapshot - a point-in-time view of the node stats.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Map, Value};

use crate::error::{CheckError, Result};

/// A JSON object as returned by the stats API.
pub type Fields = Map<String, Value>;

/// Resolve a `.`-delimited path inside nested JSON objects.
///
/// The first segment is looked up in `data`. When a non-empty remainder is
/// left and the resolved value is an object, the lookup continues in that
/// object. Otherwise the resolved value is returned as-is, even if segments
/// remain: `a.b.c` resolves to the value of `a.b` when that value is not an
/// object. Callers must not pass segments past a known leaf; this may hide a
/// typo in a path and is kept for compatibility with existing checks.
///
/// # Errors
///
/// [`CheckError::InvalidField`] naming the full `path` when a segment is absent.
///
/// # Example
///
/// ```
/// use logstash_check::data::lookup;
///
/// let data = serde_json::json!({ "jvm": { "mem": { "heap_used_percent": 42 } } });
/// let value = lookup("jvm.mem.heap_used_percent", data.as_object().unwrap()).unwrap();
/// assert_eq!(value, 42);
/// ```
pub fn lookup<'a>(path: &str, data: &'a Fields) -> Result<&'a Value> {
    descend(path, data).ok_or_else(|| CheckError::InvalidField(path.to_string()))
}

fn descend<'a>(path: &str, data: &'a Fields) -> Option<&'a Value> {
    let (first, remaining) = match path.split_once('.') {
        Some((first, rest)) if !rest.is_empty() => (first, Some(rest)),
        Some((first, _)) => (first, None),
        None => (path, None),
    };

    let value = data.get(first)?;
    match (value, remaining) {
        (Value::Object(nested), Some(rest)) => descend(rest, nested),
        _ => Some(value),
    }
}

/// Coerce a JSON value to an integer.
///
/// Numbers truncate toward zero, numeric strings are parsed and `null`
/// counts as zero. Anything else has no integer reading.
pub fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        Value::Null => Some(0),
        _ => None,
    }
}

/// Coerce a JSON value to a float. Numeric strings are accepted.
pub fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Render a JSON value the way it appears in plugin output.
///
/// Strings are written without quotes and `null` renders empty.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Immutable stats payload plus the time it was captured.
///
/// `captured_at` comes from the monitoring host's clock, never from the
/// server, so rates are always computed against local time.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    data: Fields,
    captured_at: f64,
}

impl Snapshot {
    /// Wrap fetched data, stamping it with the current time.
    pub fn new(data: Fields) -> Self {
        Self::with_timestamp(data, current_timestamp())
    }

    /// Wrap data with a specific capture time (seconds since the Unix epoch).
    pub fn with_timestamp(data: Fields, captured_at: f64) -> Self {
        Self { data, captured_at }
    }

    /// Seconds since the Unix epoch at which this snapshot was captured.
    pub fn captured_at(&self) -> f64 {
        self.captured_at
    }

    /// The raw top-level object.
    pub fn data(&self) -> &Fields {
        &self.data
    }

    /// Check whether a top-level key is present.
    pub fn has_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Look up a dotted path. See [`lookup`].
    pub fn get(&self, path: &str) -> Result<&Value> {
        lookup(path, &self.data)
    }

    /// Look up a dotted path, treating absence as `None`.
    pub fn get_optional(&self, path: &str) -> Option<&Value> {
        descend(path, &self.data)
    }

    /// Look up a dotted path and coerce it to an integer.
    pub fn get_i64(&self, path: &str) -> Result<i64> {
        as_integer(self.get(path)?).ok_or_else(|| CheckError::InvalidField(path.to_string()))
    }

    /// Look up a dotted path and coerce it to a float.
    pub fn get_f64(&self, path: &str) -> Result<f64> {
        as_float(self.get(path)?).ok_or_else(|| CheckError::InvalidField(path.to_string()))
    }
}

/// Current time in fractional seconds since the Unix epoch.
pub fn current_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
