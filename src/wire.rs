//! JSON encodings used by the forum service gateway.
//!
//! Naturals may arrive as numbers or decimal strings, optionals as `[]`/`[x]`
//! or plain `null`/`x`. Decoders accept every shape; encoders always emit the
//! canonical one (numbers, `[]`/`[x]`).

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Interface schema version sent with every call.
pub const SCHEMA_VERSION: &str = "1";
pub const SCHEMA_HEADER: &str = "X-Forum-Schema";

fn nat_from_value(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Unsigned id, encoded as a JSON number.
pub mod nat {
    use super::*;

    pub fn serialize<S: Serializer>(v: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(*v)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        let v = Value::deserialize(d)?;
        nat_from_value(&v).ok_or_else(|| D::Error::custom(format!("expected natural number, got {v}")))
    }
}

/// Optional id, encoded as `[]` or `[n]`.
pub mod opt_nat {
    use super::*;

    pub fn serialize<S: Serializer>(v: &Option<u64>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(n) => [*n].serialize(s),
            None => <[u64; 0]>::default().serialize(s),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        let v = Value::deserialize(d)?;
        let inner = match &v {
            Value::Null => return Ok(None),
            Value::Array(items) if items.is_empty() => return Ok(None),
            Value::Array(items) if items.len() == 1 => &items[0],
            other => other,
        };
        nat_from_value(inner)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected optional natural, got {v}")))
    }
}

/// Encode an optional argument the way the service expects it.
pub fn opt_arg<T: Serialize>(v: Option<T>) -> Value {
    match v {
        Some(x) => Value::Array(vec![serde_json::to_value(x).unwrap_or(Value::Null)]),
        None => Value::Array(Vec::new()),
    }
}

/// Decode an optional return value (`null`, `[]`, `[x]` or `x`).
pub fn decode_opt<T: DeserializeOwned>(v: Value) -> Result<Option<T>, serde_json::Error> {
    match v {
        Value::Null => Ok(None),
        Value::Array(mut items) if items.len() <= 1 => match items.pop() {
            Some(x) => serde_json::from_value(x).map(Some),
            None => Ok(None),
        },
        other => serde_json::from_value(other).map(Some),
    }
}

/// Nanosecond timestamp as produced by the service clock.
///
/// Values that cannot be read as an integer decode to an invalid timestamp
/// rather than failing the surrounding record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timestamp(Option<i128>);

impl Timestamp {
    pub fn from_nanos(nanos: i128) -> Self {
        Self(Some(nanos))
    }

    pub fn invalid() -> Self {
        Self(None)
    }

    pub fn nanos(&self) -> Option<i128> {
        self.0
    }

    /// Millisecond resolution, truncating toward zero.
    pub fn millis(&self) -> Option<i64> {
        self.0.and_then(|n| i64::try_from(n / 1_000_000).ok())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Some(n) => match i64::try_from(n) {
                Ok(small) => s.serialize_i64(small),
                Err(_) => s.serialize_str(&n.to_string()),
            },
            None => s.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let v = Value::deserialize(d)?;
        let nanos = match &v {
            Value::Number(n) => n
                .as_i64()
                .map(i128::from)
                .or_else(|| n.as_u64().map(i128::from)),
            Value::String(s) => s.trim().parse::<i128>().ok(),
            _ => None,
        };
        Ok(Timestamp(nanos))
    }
}
