//! # Runtime Value Representation
//!
//! `Value` is the decoded form of a column. Records own their values: every
//! variant is fully owned, so a `Value` stays valid after the page buffer it
//! was decoded from has been released.
//!
//! ## Variants
//!
//! | Variant | Rust type | Decoded from |
//! |---------|-----------|--------------|
//! | Null | - | null bitmap bit |
//! | Int | i64 | signed integer columns (sign-bit biased, big-endian) |
//! | UInt | u64 | unsigned integer columns (plain big-endian) |
//! | Float | f64 | FLOAT / DOUBLE columns |
//! | Text | String | character columns, decoded per the table charset |
//! | Bytes | Vec<u8> | binary and BLOB columns, raw |
//! | Min / Max | - | query-bound sentinels, never produced by decoding |
//!
//! ## Ordering
//!
//! `key_cmp` defines the total order used for key comparison: `Min` sorts
//! below everything, `Max` above everything, numeric variants compare
//! numerically across Int/UInt/Float, and mixed non-numeric variants fall
//! back to a fixed variant rank. NULL never appears inside a key (the query
//! layer rejects it), but the order still places it just above `Min` so the
//! comparison is total.

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    /// Sorts below every decodable value. Used to build open lower bounds.
    Min,
    /// Sorts above every decodable value. Used to build open upper bounds.
    Max,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for the `Min`/`Max` bound sentinels.
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Value::Min | Value::Max)
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Min => 0,
            Value::Null => 1,
            Value::Int(_) | Value::UInt(_) | Value::Float(_) => 2,
            Value::Text(_) => 3,
            Value::Bytes(_) => 4,
            Value::Max => 5,
        }
    }

    /// Total order for key comparison.
    pub fn key_cmp(&self, other: &Value) -> Ordering {
        use Value::*;
        match (self, other) {
            (Int(a), Int(b)) => a.cmp(b),
            (UInt(a), UInt(b)) => a.cmp(b),
            (Int(a), UInt(b)) => {
                if *a < 0 {
                    Ordering::Less
                } else {
                    (*a as u64).cmp(b)
                }
            }
            (UInt(a), Int(b)) => {
                if *b < 0 {
                    Ordering::Greater
                } else {
                    a.cmp(&(*b as u64))
                }
            }
            (Float(a), Float(b)) => a.total_cmp(b),
            (Int(a), Float(b)) => (*a as f64).total_cmp(b),
            (Float(a), Int(b)) => a.total_cmp(&(*b as f64)),
            (UInt(a), Float(b)) => (*a as f64).total_cmp(b),
            (Float(a), UInt(b)) => a.total_cmp(&(*b as f64)),
            (Text(a), Text(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Bytes(a), Bytes(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}
