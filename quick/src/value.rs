//! Dynamic values produced by generators and the argument mappings built from them.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;

use crate::error::PropertyError;

/// A generated value
///
/// Values are totally ordered so they can be sorted and used as mapping keys.
/// Integers and floats compare numerically, so `Int(1) == Float(1.0)`.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    Map(BTreeMap<Value, Value>),
}

impl Value {
    /// Build a map value with text keys
    pub fn record<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Map(
            fields
                .into_iter()
                .map(|(k, v)| (Value::Text(k.into()), v))
                .collect(),
        )
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of either number variant
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<Value, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a text key in a map value
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.as_map()
            .and_then(|entries| entries.get(&Value::Text(key.to_string())))
    }

    /// Length of a text (in characters), list, or map
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Text(s) => Some(s.chars().count()),
            Value::List(items) => Some(items.len()),
            Value::Map(entries) => Some(entries.len()),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::Text(_) => 3,
            Value::List(_) => 4,
            Value::Map(_) => 5,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Int(a), Value::Float(b)) => cmp_int_float(*a, *b),
            (Value::Float(a), Value::Int(b)) => cmp_int_float(*b, *a).reverse(),
            (Value::Float(a), Value::Float(b)) if a == b => Ordering::Equal,
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => a.cmp(b),
            (Value::Map(a), Value::Map(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Exact comparison of an integer with a float, without rounding the integer.
///
/// `-0.0` and `0.0` both equal `Int(0)`; NaNs sort by sign past every number.
fn cmp_int_float(i: i64, f: f64) -> Ordering {
    // 2^63, the first float above i64::MAX
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;

    if f.is_nan() {
        return if f.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if f >= LIMIT {
        return Ordering::Less;
    }
    if f < -LIMIT {
        return Ordering::Greater;
    }

    let whole = f.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal if f > whole => Ordering::Less,
        Ordering::Equal if f < whole => Ordering::Greater,
        ordering => ordering,
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(i: $t) -> Self {
                    Value::Int(i64::from(i))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

// Saturates at i64::MAX
macro_rules! impl_from_wide_uint {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(i: $t) -> Self {
                    Value::Int(i64::try_from(i).unwrap_or(i64::MAX))
                }
            }
        )*
    };
}

impl_from_wide_uint!(u64, usize);

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<Value, Value>> for Value {
    fn from(entries: BTreeMap<Value, Value>) -> Self {
        Value::Map(entries)
    }
}

/// Ordered mapping from parameter name to value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments {
    entries: Vec<(String, Value)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an argument, keeping declaration order
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.entries.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Values in declaration order
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Look up an argument, failing the evaluation if it is missing
    pub fn value(&self, name: &str) -> Result<&Value, PropertyError> {
        self.get(name)
            .ok_or_else(|| PropertyError::MissingArgument(name.to_string()))
    }

    pub fn boolean(&self, name: &str) -> Result<bool, PropertyError> {
        self.typed(name, "a boolean", Value::as_bool)
    }

    pub fn int(&self, name: &str) -> Result<i64, PropertyError> {
        self.typed(name, "an integer", Value::as_i64)
    }

    pub fn number(&self, name: &str) -> Result<f64, PropertyError> {
        self.typed(name, "a number", Value::as_f64)
    }

    pub fn text(&self, name: &str) -> Result<&str, PropertyError> {
        self.typed(name, "text", Value::as_str)
    }

    pub fn list(&self, name: &str) -> Result<&[Value], PropertyError> {
        self.typed(name, "a list", Value::as_list)
    }

    pub fn map(&self, name: &str) -> Result<&BTreeMap<Value, Value>, PropertyError> {
        self.typed(name, "a map", Value::as_map)
    }

    fn typed<'a, T>(
        &'a self,
        name: &str,
        expected: &'static str,
        view: impl Fn(&'a Value) -> Option<T>,
    ) -> Result<T, PropertyError> {
        view(self.value(name)?).ok_or_else(|| PropertyError::TypeMismatch {
            name: name.to_string(),
            expected,
        })
    }
}

impl Index<&str> for Arguments {
    type Output = Value;

    fn index(&self, name: &str) -> &Value {
        match self.get(name) {
            Some(value) => value,
            None => panic!("no argument named `{}`", name),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_compare_across_variants() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert!(Value::Int(1) < Value::Float(1.5));
        assert!(Value::Float(-2.5) < Value::Int(-2));
        assert_eq!(Value::Int(0), Value::Float(-0.0));
        assert_eq!(Value::Float(0.0), Value::Float(-0.0));
        assert!(Value::Int(-3) > Value::Float(-3.5));
        assert!(Value::Float(f64::NAN) > Value::Int(i64::MAX));
        assert!(Value::Float(f64::NEG_INFINITY) < Value::Int(i64::MIN));
    }

    #[test]
    fn test_large_integers_compare_exactly() {
        let two_pow_63 = Value::Float(9.223372036854776e18);
        assert!(Value::Int(i64::MAX) < two_pow_63);
        assert!(Value::Int(i64::MAX - 1) < two_pow_63);
        assert_ne!(Value::Int(i64::MAX), Value::Int(i64::MAX - 1));
        assert_eq!(Value::Int(i64::MIN), Value::Float(-9.223372036854776e18));
        assert!(Value::Int(i64::MIN + 1) > Value::Float(-9.223372036854776e18));

        let keys: BTreeMap<Value, Value> = [
            (Value::Int(i64::MAX), Value::Null),
            (Value::Int(i64::MAX - 1), Value::Null),
            (two_pow_63, Value::Null),
        ]
        .into_iter()
        .collect();
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn test_wide_unsigned_conversion_saturates() {
        assert_eq!(Value::from(u32::MAX), Value::Int(u32::MAX as i64));
        assert_eq!(Value::from(u64::MAX), Value::Int(i64::MAX));
        assert_eq!(Value::from(usize::MAX), Value::Int(i64::MAX));
        assert_eq!(Value::from(42usize), Value::Int(42));
    }

    #[test]
    fn test_variant_rank_ordering() {
        let mut values = vec![
            Value::from("a"),
            Value::Int(3),
            Value::Bool(true),
            Value::Null,
            Value::List(vec![]),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Int(3),
                Value::from("a"),
                Value::List(vec![]),
            ]
        );
    }

    #[test]
    fn test_record_and_field() {
        let user = Value::record([("id", Value::from(1)), ("name", Value::from("bob"))]);
        assert_eq!(user.field("id"), Some(&Value::Int(1)));
        assert_eq!(user.field("name").and_then(Value::as_str), Some("bob"));
        assert_eq!(user.field("missing"), None);
        assert_eq!(user.len(), Some(2));
    }

    #[test]
    fn test_text_length_counts_characters() {
        assert_eq!(Value::from("héllo").len(), Some(5));
        assert_eq!(Value::Int(5).len(), None);
    }

    #[test]
    fn test_display() {
        let value = Value::List(vec![Value::Int(1), Value::from("x"), Value::Float(0.5)]);
        assert_eq!(value.to_string(), "[1, \"x\", 0.5]");

        let args: Arguments = [("x", Value::Int(0)), ("y", Value::Bool(false))]
            .into_iter()
            .collect();
        assert_eq!(args.to_string(), "{x: 0, y: false}");
    }

    #[test]
    fn test_typed_accessors() {
        let args: Arguments = [
            ("n", Value::Int(4)),
            ("f", Value::Float(2.5)),
            ("s", Value::from("hi")),
        ]
        .into_iter()
        .collect();

        assert_eq!(args.int("n"), Ok(4));
        assert_eq!(args.number("n"), Ok(4.0));
        assert_eq!(args.number("f"), Ok(2.5));
        assert_eq!(args.text("s"), Ok("hi"));
        assert_eq!(
            args.int("s"),
            Err(PropertyError::TypeMismatch {
                name: "s".to_string(),
                expected: "an integer",
            })
        );
        assert_eq!(
            args.boolean("missing"),
            Err(PropertyError::MissingArgument("missing".to_string()))
        );
        assert_eq!(args["n"], Value::Int(4));
    }
}
