use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single scalar value as it reaches the router: a sharding value extracted
/// from a predicate, or a bound SQL parameter carried by a rewritten unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Datum {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Text(String),
    Timestamp(i64), // microseconds since Unix epoch
    Date(i32),      // days since Unix epoch (1970-01-01)
}

impl Datum {
    /// Integral view used by modulo/range algorithms. Timestamps and dates
    /// shard on their raw epoch offsets.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Datum::Int32(v) => Some(*v as i64),
            Datum::Int64(v) => Some(*v),
            Datum::Timestamp(v) => Some(*v),
            Datum::Date(v) => Some(*v as i64),
            Datum::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Stable, type-tagged byte encoding for hash sharding.
    /// The tag keeps `Text("1")` and `Int64(1)` apart; Int32 and Int64 share a
    /// tag so equal integers land on the same shard.
    pub fn encode_for_hash(&self, buf: &mut Vec<u8>) {
        match self {
            Datum::Null => buf.push(0x00),
            Datum::Boolean(b) => {
                buf.push(0x01);
                buf.push(u8::from(*b));
            }
            Datum::Int32(v) => {
                buf.push(0x02);
                buf.extend_from_slice(&(*v as i64).to_le_bytes());
            }
            Datum::Int64(v) => {
                buf.push(0x02);
                buf.extend_from_slice(&v.to_le_bytes());
            }
            Datum::Float64(v) => {
                buf.push(0x04);
                buf.extend_from_slice(&v.to_le_bytes());
            }
            Datum::Text(s) => {
                buf.push(0x05);
                buf.extend_from_slice(s.as_bytes());
                buf.push(0x00); // null terminator to avoid prefix collisions
            }
            Datum::Timestamp(v) => {
                buf.push(0x06);
                buf.extend_from_slice(&v.to_le_bytes());
            }
            Datum::Date(v) => {
                buf.push(0x07);
                buf.extend_from_slice(&v.to_le_bytes());
            }
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => write!(f, "NULL"),
            Datum::Boolean(b) => write!(f, "{}", b),
            Datum::Int32(v) => write!(f, "{}", v),
            Datum::Int64(v) => write!(f, "{}", v),
            Datum::Float64(v) => write!(f, "{}", v),
            Datum::Text(s) => write!(f, "'{}'", s),
            Datum::Timestamp(us) => write!(f, "ts:{}", us),
            Datum::Date(days) => write!(f, "date:{}", days),
        }
    }
}

impl From<i32> for Datum {
    fn from(v: i32) -> Self {
        Datum::Int32(v)
    }
}

impl From<i64> for Datum {
    fn from(v: i64) -> Self {
        Datum::Int64(v)
    }
}

impl From<&str> for Datum {
    fn from(v: &str) -> Self {
        Datum::Text(v.to_string())
    }
}

impl From<String> for Datum {
    fn from(v: String) -> Self {
        Datum::Text(v)
    }
}

// Equality is identity, not SQL comparison: NULL equals NULL so that two
// parameter lists carrying NULL in the same slot compare equal.
impl PartialEq for Datum {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Datum::Null, Datum::Null) => true,
            (Datum::Boolean(a), Datum::Boolean(b)) => a == b,
            (Datum::Int32(a), Datum::Int32(b)) => a == b,
            (Datum::Int64(a), Datum::Int64(b)) => a == b,
            (Datum::Int32(a), Datum::Int64(b)) => (*a as i64) == *b,
            (Datum::Int64(a), Datum::Int32(b)) => *a == (*b as i64),
            (Datum::Float64(a), Datum::Float64(b)) => a.to_bits() == b.to_bits(),
            (Datum::Text(a), Datum::Text(b)) => a == b,
            (Datum::Timestamp(a), Datum::Timestamp(b)) => a == b,
            (Datum::Date(a), Datum::Date(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Datum {}

impl Hash for Datum {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Explicit tags (not mem::discriminant): Int32(x) == Int64(x) must hash alike.
        match self {
            Datum::Null => 0u8.hash(state),
            Datum::Boolean(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Datum::Int32(v) => {
                2u8.hash(state);
                (*v as i64).hash(state);
            }
            Datum::Int64(v) => {
                2u8.hash(state);
                v.hash(state);
            }
            Datum::Float64(v) => {
                3u8.hash(state);
                v.to_bits().hash(state);
            }
            Datum::Text(s) => {
                4u8.hash(state);
                s.hash(state);
            }
            Datum::Timestamp(us) => {
                5u8.hash(state);
                us.hash(state);
            }
            Datum::Date(days) => {
                6u8.hash(state);
                days.hash(state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(d: &Datum) -> u64 {
        let mut h = DefaultHasher::new();
        d.hash(&mut h);
        h.finish()
    }

    #[test]
    fn test_int_widths_are_interchangeable() {
        assert_eq!(Datum::Int32(7), Datum::Int64(7));
        assert_eq!(hash_of(&Datum::Int32(7)), hash_of(&Datum::Int64(7)));

        let mut a = Vec::new();
        let mut b = Vec::new();
        Datum::Int32(7).encode_for_hash(&mut a);
        Datum::Int64(7).encode_for_hash(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_null_is_identity_equal() {
        assert_eq!(Datum::Null, Datum::Null);
        assert_ne!(Datum::Null, Datum::Int64(0));
    }

    #[test]
    fn test_text_and_int_encodings_differ() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        Datum::Text("1".into()).encode_for_hash(&mut a);
        Datum::Int64(1).encode_for_hash(&mut b);
        assert_ne!(a, b);
    }

    #[test]
    fn test_as_i64_parses_numeric_text() {
        assert_eq!(Datum::Text(" 42 ".into()).as_i64(), Some(42));
        assert_eq!(Datum::Text("abc".into()).as_i64(), None);
        assert_eq!(Datum::Float64(1.5).as_i64(), None);
    }
}
