use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::host::{HostValue, RecordKey, Tensor};
use crate::Result;

/// The host value this crate ships: a dynamically typed tree mirroring the
/// value system of a small embedded language. Numbers are f64; integer
/// narrowing happens in the codec against the declared wire type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    #[serde(with = "serde_bytes")]
    Bytes(Vec<u8>),
    Seq(Vec<Value>),
    // BTreeMap for deterministic iteration; encode counts and emits pairs
    // in the same order.
    Map(BTreeMap<Value, Value>),
    Record(BTreeMap<RecordKey, Value>),
    Tensor(Tensor),
}

impl Value {
    /// Builds a record from `(key, value)` pairs.
    pub fn record<K, I>(pairs: I) -> Self
    where
        K: Into<RecordKey>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Record(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }

    /// Builds a map from `(key, value)` pairs.
    pub fn map<I: IntoIterator<Item = (Value, Value)>>(pairs: I) -> Self {
        Value::Map(pairs.into_iter().collect())
    }

    fn mismatch(&self, expected: &'static str) -> Error {
        Error::TypeMismatch {
            expected,
            found: self.kind().to_string(),
        }
    }

    fn variant_rank(&self) -> u8 {
        match self {
            Value::Nil => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Bytes(_) => 4,
            Value::Seq(_) => 5,
            Value::Map(_) => 6,
            Value::Record(_) => 7,
            Value::Tensor(_) => 8,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Seq(v)
    }
}

impl From<Tensor> for Value {
    fn from(t: Tensor) -> Self {
        Value::Tensor(t)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Seq(a), Value::Seq(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            (Value::Tensor(a), Value::Tensor(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    // Order by variant, then content; floats by bit pattern. Enough to use
    // Value as a BTreeMap key.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Nil, Value::Nil) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => a.to_bits().cmp(&b.to_bits()),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::Seq(a), Value::Seq(b)) => a.cmp(b),
            (Value::Map(a), Value::Map(b)) => a.cmp(b),
            (Value::Record(a), Value::Record(b)) => a.cmp(b),
            (Value::Tensor(a), Value::Tensor(b)) => a.cmp(b),
            (a, b) => a.variant_rank().cmp(&b.variant_rank()),
        }
    }
}

impl HostValue for Value {
    fn nil() -> Self {
        Value::Nil
    }

    fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Seq(_) => "seq",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
            Value::Tensor(t) => t.kind(),
        }
    }

    fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(v) => Ok(*v),
            _ => Err(self.mismatch("bool")),
        }
    }

    fn as_f64(&self) -> Result<f64> {
        match self {
            Value::Number(v) => Ok(*v),
            _ => Err(self.mismatch("number")),
        }
    }

    fn as_bytes(&self) -> Result<&[u8]> {
        match self {
            Value::String(s) => Ok(s.as_bytes()),
            Value::Bytes(b) => Ok(b),
            _ => Err(self.mismatch("string")),
        }
    }

    fn as_tensor(&self) -> Result<&Tensor> {
        match self {
            Value::Tensor(t) => Ok(t),
            _ => Err(self.mismatch("tensor")),
        }
    }

    fn seq_len(&self) -> Result<usize> {
        match self {
            Value::Seq(v) => Ok(v.len()),
            _ => Err(self.mismatch("seq")),
        }
    }

    fn seq_get(&self, index: usize) -> Result<&Self> {
        match self {
            Value::Seq(v) => v
                .get(index.wrapping_sub(1))
                .ok_or_else(|| self.mismatch("seq element")),
            _ => Err(self.mismatch("seq")),
        }
    }

    fn map_len(&self) -> Result<usize> {
        match self {
            Value::Map(m) => Ok(m.len()),
            _ => Err(self.mismatch("map")),
        }
    }

    fn map_visit<'a>(
        &'a self,
        visit: &mut dyn FnMut(&'a Self, &'a Self) -> Result<()>,
    ) -> Result<()> {
        match self {
            Value::Map(m) => {
                for (k, v) in m {
                    visit(k, v)?;
                }
                Ok(())
            }
            _ => Err(self.mismatch("map")),
        }
    }

    fn record_get(&self, key: &RecordKey) -> Result<Option<&Self>> {
        match self {
            Value::Record(m) => Ok(m.get(key)),
            _ => Err(self.mismatch("record")),
        }
    }

    fn from_bool(v: bool) -> Self {
        Value::Bool(v)
    }

    fn from_f64(v: f64) -> Self {
        Value::Number(v)
    }

    fn from_string(v: String) -> Self {
        Value::String(v)
    }

    fn from_text(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(s) => Value::String(s),
            Err(e) => Value::Bytes(e.into_bytes()),
        }
    }

    fn from_tensor(t: Tensor) -> Self {
        Value::Tensor(t)
    }

    fn new_record() -> Self {
        Value::Record(BTreeMap::new())
    }

    fn record_set(&mut self, key: RecordKey, value: Self) -> Result<()> {
        match self {
            Value::Record(m) => {
                m.insert(key, value);
                Ok(())
            }
            _ => Err(self.mismatch("record")),
        }
    }

    fn new_seq(capacity: usize) -> Self {
        Value::Seq(Vec::with_capacity(capacity))
    }

    fn seq_push(&mut self, value: Self) -> Result<()> {
        match self {
            Value::Seq(v) => {
                v.push(value);
                Ok(())
            }
            _ => Err(self.mismatch("seq")),
        }
    }

    fn new_map() -> Self {
        Value::Map(BTreeMap::new())
    }

    fn map_set(&mut self, key: Self, value: Self) -> Result<()> {
        match self {
            Value::Map(m) => {
                m.insert(key, value);
                Ok(())
            }
            _ => Err(self.mismatch("map")),
        }
    }
}
