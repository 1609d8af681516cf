//! Runtime values for CEL evaluation.
//!
//! `Value` represents all CEL values at runtime: the primitive kinds,
//! collections, the placeholder timestamp/duration kinds, and the internal
//! error kind used for propagation.
//!
//! # Creating Values
//!
//! Use Rust's standard `Into` trait to create values from native types:
//!
//! ```rust
//! use cel_runtime::Value;
//!
//! // Primitives - integer types automatically widen to i64/u64
//! let v: Value = 42.into();      // i32 -> Value::Int(i64)
//! let v: Value = 42u32.into();   // u32 -> Value::UInt(u64)
//! let v: Value = true.into();
//! let v: Value = "hello".into();
//!
//! // Collections
//! let list: Value = vec![Value::Int(1), Value::Int(2)].into();
//! let map = Value::map([("name", "Alice")]);
//! ```
//!
//! # Extracting Values
//!
//! Use `TryFrom` to extract native types from values:
//!
//! ```rust
//! use cel_runtime::Value;
//! use std::convert::TryFrom;
//!
//! let v = Value::Int(42);
//! let i: i64 = i64::try_from(&v).unwrap();
//!
//! let v: Value = "hi".into();
//! let s: &str = <&str>::try_from(&v).unwrap();
//! ```

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::EvalError;

/// Error returned when converting from Value to a specific type fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueError {
    /// The expected type name.
    pub expected: &'static str,
    /// The actual type name found.
    pub found: &'static str,
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {}, found {}", self.expected, self.found)
    }
}

impl std::error::Error for ValueError {}

/// A CEL runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// Unsigned 64-bit integer.
    UInt(u64),
    /// 64-bit floating point.
    Double(f64),
    /// Unicode string (Arc for cheap cloning).
    String(Arc<str>),
    /// Byte sequence (Arc for cheap cloning).
    Bytes(Arc<[u8]>),
    /// List of values.
    List(Arc<[Value]>),
    /// Key-value map (BTreeMap for deterministic iteration).
    Map(Arc<ValueMap>),
    /// Timestamp (seconds and nanos since Unix epoch).
    Timestamp(Timestamp),
    /// Duration (seconds and nanos).
    Duration(Duration),
    /// Error value (evaluation errors propagate as values).
    Error(Arc<EvalError>),
}

/// A CEL timestamp value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    /// Seconds since Unix epoch.
    pub seconds: i64,
    /// Nanoseconds (0..999_999_999).
    pub nanos: i32,
}

impl Timestamp {
    /// Minimum valid timestamp: Year 0001-01-01 00:00:00 UTC.
    pub const MIN_SECONDS: i64 = -62135596800;

    /// Maximum valid timestamp: Year 9999-12-31 23:59:59 UTC.
    pub const MAX_SECONDS: i64 = 253402300799;

    /// Create a new timestamp.
    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    /// Create a timestamp from seconds since Unix epoch.
    pub fn from_seconds(seconds: i64) -> Self {
        Self { seconds, nanos: 0 }
    }

    /// Check if this timestamp is within the representable range
    /// (Year 0001 to 9999).
    pub fn is_valid(&self) -> bool {
        self.seconds >= Self::MIN_SECONDS && self.seconds <= Self::MAX_SECONDS
    }

    /// Convert to a chrono DateTime<Utc>.
    pub fn to_datetime_utc(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp(self.seconds, self.nanos as u32)
    }
}

/// A CEL duration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duration {
    /// Seconds component.
    pub seconds: i64,
    /// Nanoseconds component (same sign as the duration).
    pub nanos: i32,
}

impl Duration {
    /// Maximum valid duration in seconds (roughly the timestamp range span).
    pub const MAX_SECONDS: i64 = 315_537_897_598;

    /// Minimum valid duration in seconds (negative max).
    pub const MIN_SECONDS: i64 = -315_537_897_598;

    /// Create a new duration.
    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    /// Create a duration from seconds.
    pub fn from_seconds(seconds: i64) -> Self {
        Self { seconds, nanos: 0 }
    }

    /// Check if this duration is within the representable range.
    pub fn is_valid(&self) -> bool {
        self.seconds >= Self::MIN_SECONDS && self.seconds <= Self::MAX_SECONDS
    }

    /// Get total hours (truncated).
    pub fn total_hours(&self) -> i64 {
        self.seconds / 3600
    }

    /// Get total minutes (truncated).
    pub fn total_minutes(&self) -> i64 {
        self.seconds / 60
    }

    /// Get total seconds (truncated).
    pub fn total_seconds(&self) -> i64 {
        self.seconds
    }
}

/// A CEL map with heterogeneous keys.
///
/// Uses a BTreeMap with a custom key type for deterministic iteration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueMap {
    entries: BTreeMap<MapKey, Value>,
}

/// A map key. CEL allows bool, int, uint, and string as map keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    UInt(u64),
    String(Arc<str>),
}

impl MapKey {
    /// Create a map key from a Value. Returns None for non-key kinds.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(MapKey::Bool(*b)),
            Value::Int(i) => Some(MapKey::Int(*i)),
            Value::UInt(u) => Some(MapKey::UInt(*u)),
            Value::String(s) => Some(MapKey::String(s.clone())),
            _ => None,
        }
    }

    /// Convert back to a Value.
    pub fn to_value(&self) -> Value {
        match self {
            MapKey::Bool(b) => Value::Bool(*b),
            MapKey::Int(i) => Value::Int(*i),
            MapKey::UInt(u) => Value::UInt(*u),
            MapKey::String(s) => Value::String(s.clone()),
        }
    }
}

impl From<&str> for MapKey {
    fn from(s: &str) -> Self {
        MapKey::String(Arc::from(s))
    }
}

impl From<String> for MapKey {
    fn from(s: String) -> Self {
        MapKey::String(Arc::from(s))
    }
}

impl From<bool> for MapKey {
    fn from(b: bool) -> Self {
        MapKey::Bool(b)
    }
}

impl From<i64> for MapKey {
    fn from(i: i64) -> Self {
        MapKey::Int(i)
    }
}

impl From<i32> for MapKey {
    fn from(i: i32) -> Self {
        MapKey::Int(i as i64)
    }
}

impl From<u64> for MapKey {
    fn from(u: u64) -> Self {
        MapKey::UInt(u)
    }
}

impl ValueMap {
    /// Create a new empty map.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Create a map from an iterator of key-value pairs.
    /// Later entries win on duplicate keys.
    pub fn from_entries(entries: impl IntoIterator<Item = (MapKey, Value)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Get a value by key.
    pub fn get(&self, key: &MapKey) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Insert a key-value pair.
    pub fn insert(&mut self, key: MapKey, value: Value) {
        self.entries.insert(key, value);
    }

    /// Check if a key exists.
    pub fn contains_key(&self, key: &MapKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Get a value by key with cross-type numeric coercion.
    /// Tries an exact match first, then int<->uint for in-range values,
    /// so lookup follows structural equality of keys.
    pub fn get_coerced(&self, key: &MapKey) -> Option<&Value> {
        if let Some(v) = self.entries.get(key) {
            return Some(v);
        }
        match key {
            MapKey::Int(i) => {
                if *i >= 0 {
                    self.entries.get(&MapKey::UInt(*i as u64))
                } else {
                    None
                }
            }
            MapKey::UInt(u) => {
                if *u <= i64::MAX as u64 {
                    self.entries.get(&MapKey::Int(*u as i64))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Check if a key exists with cross-type numeric coercion.
    pub fn contains_key_coerced(&self, key: &MapKey) -> bool {
        self.get_coerced(key).is_some()
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries.
    pub fn iter(&self) -> impl Iterator<Item = (&MapKey, &Value)> {
        self.entries.iter()
    }

    /// Iterate over keys.
    pub fn keys(&self) -> impl Iterator<Item = &MapKey> {
        self.entries.keys()
    }

    /// Iterate over values.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.values()
    }
}

// ==================== Value Constructors ====================

impl Value {
    /// Create a map value from key-value pairs.
    ///
    /// ```
    /// use cel_runtime::Value;
    ///
    /// let map = Value::map([("host", "localhost"), ("port", "8080")]);
    /// let mixed = Value::map([
    ///     ("name", Value::from("Alice")),
    ///     ("age", Value::from(30i64)),
    /// ]);
    /// ```
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<MapKey>,
        V: Into<Value>,
    {
        Value::Map(Arc::new(ValueMap::from_entries(
            entries.into_iter().map(|(k, v)| (k.into(), v.into())),
        )))
    }

    /// Create a list value from items.
    ///
    /// ```
    /// use cel_runtime::Value;
    ///
    /// let list = Value::list([1, 2, 3]);
    /// let strings = Value::list(["a", "b"]);
    /// ```
    pub fn list<T>(items: impl IntoIterator<Item = T>) -> Self
    where
        T: Into<Value>,
    {
        Value::List(Arc::from(
            items.into_iter().map(Into::into).collect::<Vec<_>>(),
        ))
    }

    /// Create a timestamp value.
    pub fn timestamp(seconds: i64, nanos: i32) -> Self {
        Value::Timestamp(Timestamp::new(seconds, nanos))
    }

    /// Create a duration value.
    pub fn duration(seconds: i64, nanos: i32) -> Self {
        Value::Duration(Duration::new(seconds, nanos))
    }

    /// Create an error value.
    pub fn error(err: impl Into<EvalError>) -> Self {
        Value::Error(Arc::new(err.into()))
    }
}

// ==================== From Implementations ====================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<i16> for Value {
    fn from(i: i16) -> Self {
        Value::Int(i as i64)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::UInt(u)
    }
}

impl From<u32> for Value {
    fn from(u: u32) -> Self {
        Value::UInt(u as u64)
    }
}

impl From<usize> for Value {
    fn from(u: usize) -> Self {
        Value::UInt(u as u64)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<Arc<str>> for Value {
    fn from(s: Arc<str>) -> Self {
        Value::String(s)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(Arc::from(b))
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(Arc::from(b))
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(Arc::from(v))
    }
}

impl From<Timestamp> for Value {
    fn from(t: Timestamp) -> Self {
        Value::Timestamp(t)
    }
}

impl From<Duration> for Value {
    fn from(d: Duration) -> Self {
        Value::Duration(d)
    }
}

impl From<EvalError> for Value {
    fn from(e: EvalError) -> Self {
        Value::Error(Arc::new(e))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

// ==================== TryFrom Implementations ====================

impl TryFrom<&Value> for bool {
    type Error = ValueError;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Bool(b) => Ok(*b),
            other => Err(ValueError {
                expected: "bool",
                found: other.kind_name(),
            }),
        }
    }
}

impl TryFrom<&Value> for i64 {
    type Error = ValueError;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Int(i) => Ok(*i),
            other => Err(ValueError {
                expected: "int",
                found: other.kind_name(),
            }),
        }
    }
}

impl TryFrom<&Value> for u64 {
    type Error = ValueError;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::UInt(u) => Ok(*u),
            other => Err(ValueError {
                expected: "uint",
                found: other.kind_name(),
            }),
        }
    }
}

impl TryFrom<&Value> for f64 {
    type Error = ValueError;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Double(d) => Ok(*d),
            other => Err(ValueError {
                expected: "double",
                found: other.kind_name(),
            }),
        }
    }
}

impl<'a> TryFrom<&'a Value> for &'a str {
    type Error = ValueError;
    fn try_from(v: &'a Value) -> Result<Self, Self::Error> {
        match v {
            Value::String(s) => Ok(s),
            other => Err(ValueError {
                expected: "string",
                found: other.kind_name(),
            }),
        }
    }
}

impl<'a> TryFrom<&'a Value> for &'a [u8] {
    type Error = ValueError;
    fn try_from(v: &'a Value) -> Result<Self, Self::Error> {
        match v {
            Value::Bytes(b) => Ok(b),
            other => Err(ValueError {
                expected: "bytes",
                found: other.kind_name(),
            }),
        }
    }
}

impl<'a> TryFrom<&'a Value> for &'a [Value] {
    type Error = ValueError;
    fn try_from(v: &'a Value) -> Result<Self, Self::Error> {
        match v {
            Value::List(l) => Ok(l),
            other => Err(ValueError {
                expected: "list",
                found: other.kind_name(),
            }),
        }
    }
}

impl<'a> TryFrom<&'a Value> for &'a ValueMap {
    type Error = ValueError;
    fn try_from(v: &'a Value) -> Result<Self, Self::Error> {
        match v {
            Value::Map(m) => Ok(m.as_ref()),
            other => Err(ValueError {
                expected: "map",
                found: other.kind_name(),
            }),
        }
    }
}

// ==================== Kind Information ====================

impl Value {
    /// Get the kind name of this value, as reported by `type()`.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Timestamp(_) => "timestamp",
            Value::Duration(_) => "duration",
            Value::Error(_) => "error",
        }
    }

    /// Check if this value is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Canonical text of this value, as produced by the `string()`
    /// conversion and by string concatenation. Bare strings render
    /// without quotes; strings nested in collections keep the quoted
    /// display form.
    pub fn to_text(&self) -> String {
        match self {
            Value::String(s) => s.to_string(),
            Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            other => other.to_string(),
        }
    }
}

// ==================== Equality ====================

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            // IEEE 754 semantics: NaN != NaN
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => {
                if a.len() != b.len() {
                    return false;
                }
                for (key, val_a) in a.iter() {
                    match b.get(key) {
                        Some(val_b) if val_a == val_b => continue,
                        _ => return false,
                    }
                }
                true
            }
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            // Cross-kind numeric equality: 42 == 42u == 42.0
            (Value::Int(a), Value::UInt(b)) => *a >= 0 && *a as u64 == *b,
            (Value::UInt(a), Value::Int(b)) => *b >= 0 && *a == *b as u64,
            (Value::Int(a), Value::Double(b)) => {
                if b.is_nan() {
                    return false;
                }
                let a_f64 = *a as f64;
                a_f64 == *b && a_f64 as i64 == *a
            }
            (Value::Double(a), Value::Int(b)) => {
                if a.is_nan() {
                    return false;
                }
                let b_f64 = *b as f64;
                *a == b_f64 && b_f64 as i64 == *b
            }
            (Value::UInt(a), Value::Double(b)) => {
                if b.is_nan() {
                    return false;
                }
                let a_f64 = *a as f64;
                a_f64 == *b && a_f64 as u64 == *a
            }
            (Value::Double(a), Value::UInt(b)) => {
                if a.is_nan() {
                    return false;
                }
                let b_f64 = *b as f64;
                *a == b_f64 && b_f64 as u64 == *b
            }
            _ => false,
        }
    }
}

// ==================== Comparison ====================

impl Value {
    /// Compare two values, returning an ordering if they are comparable.
    ///
    /// Comparable pairs: numeric pairs (including cross-kind), string
    /// pairs, bool pairs (false < true), bytes pairs, timestamp and
    /// duration pairs, and lists (element-wise lexicographic). Anything
    /// else returns None, which the comparison operators turn into an
    /// error.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::UInt(a), Value::UInt(b)) => Some(a.cmp(b)),
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => {
                Some((a.seconds, a.nanos).cmp(&(b.seconds, b.nanos)))
            }
            (Value::Duration(a), Value::Duration(b)) => {
                Some((a.seconds, a.nanos).cmp(&(b.seconds, b.nanos)))
            }
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.compare(y)? {
                        Ordering::Equal => continue,
                        ord => return Some(ord),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            // Cross-kind numeric comparisons
            (Value::Int(a), Value::UInt(b)) => {
                if *a < 0 {
                    Some(Ordering::Less)
                } else {
                    (*a as u64).partial_cmp(b)
                }
            }
            (Value::UInt(a), Value::Int(b)) => {
                if *b < 0 {
                    Some(Ordering::Greater)
                } else {
                    a.partial_cmp(&(*b as u64))
                }
            }
            (Value::Int(a), Value::Double(b)) => (*a as f64).partial_cmp(b),
            (Value::Double(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::UInt(a), Value::Double(b)) => (*a as f64).partial_cmp(b),
            (Value::Double(a), Value::UInt(b)) => a.partial_cmp(&(*b as f64)),
            _ => None,
        }
    }
}

/// Format a double according to CEL conventions: integral values keep a
/// trailing `.0`, non-finite values use `NaN`/`+infinity`/`-infinity`.
pub(crate) fn format_double(d: f64) -> String {
    if d.is_nan() {
        "NaN".to_string()
    } else if d.is_infinite() {
        if d.is_sign_positive() {
            "+infinity".to_string()
        } else {
            "-infinity".to_string()
        }
    } else if d.fract() == 0.0 && d.abs() < 1e15 {
        format!("{:.1}", d)
    } else {
        d.to_string()
    }
}

// ==================== Display ====================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", format_double(*v)),
            Value::String(v) => write!(f, "\"{}\"", v),
            Value::Bytes(v) => write!(f, "b\"{}\"", String::from_utf8_lossy(v)),
            Value::List(v) => {
                write!(f, "[")?;
                for (i, elem) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", elem)?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (key, value)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key.to_value(), value)?;
                }
                write!(f, "}}")
            }
            Value::Timestamp(t) => write!(f, "timestamp({})", t.seconds),
            Value::Duration(d) => write!(f, "duration({}s)", d.seconds),
            Value::Error(e) => write!(f, "error({})", e),
        }
    }
}
