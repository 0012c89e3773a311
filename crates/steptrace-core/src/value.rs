//! Wire-safe runtime value representation.
//!
//! [`TraceValue`] is the tagged form every captured variable takes in
//! memory. The tags make the snapshot serializer's totality contract a type
//! system guarantee: a binding either maps onto one of the native tags, or it
//! is carried as `Text` (a printable rendering) or `Opaque` (a placeholder
//! naming the value's type). There is no variant for "failed to serialize".
//!
//! On the wire a value is plain JSON: scalars and containers serialize as
//! themselves, and the `Text` and `Opaque` tiers both appear as strings.

use indexmap::IndexMap;
use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A captured runtime value in wire-safe form.
///
/// - Native tags: `Null`, `Bool`, `Number`, `Text`, `Sequence`, `Mapping`.
/// - `Text` also serves as the printable-rendering tier for values with a
///   meaningful textual form but no native tag (function pointers, ranges,
///   non-finite floats).
/// - `Opaque` is the final tier: a fixed placeholder naming the declared type.
///
/// JSON form is the plain value (`1`, `"hi"`, `[1, 2]`, `{"a": 1}`); the
/// tags exist only in memory. A surrogate string therefore deserializes
/// back as `Text`, which is all the wire can say about it.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceValue {
    Null,
    Bool(bool),
    /// Integer or finite float. Non-finite floats have no JSON number form
    /// and land on the `Text` tier instead.
    Number(serde_json::Number),
    Text(String),
    Sequence(Vec<TraceValue>),
    /// Key order is preserved as recorded.
    Mapping(IndexMap<String, TraceValue>),
    /// Placeholder for values with no usable representation, in the fixed
    /// form `<unserializable: TypeName>`.
    Opaque(String),
}

impl TraceValue {
    /// Wraps an integer.
    pub fn int(n: i64) -> TraceValue {
        TraceValue::Number(serde_json::Number::from(n))
    }

    /// Wraps a float, or `None` if it has no JSON number form (NaN, infinity).
    pub fn float(f: f64) -> Option<TraceValue> {
        serde_json::Number::from_f64(f).map(TraceValue::Number)
    }

    /// Wraps a printable rendering.
    pub fn text(s: impl Into<String>) -> TraceValue {
        TraceValue::Text(s.into())
    }

    /// Builds the fixed placeholder for a value of the named type.
    pub fn opaque(type_name: &str) -> TraceValue {
        TraceValue::Opaque(format!("<unserializable: {type_name}>"))
    }

    /// Returns the tag name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            TraceValue::Null => "null",
            TraceValue::Bool(_) => "bool",
            TraceValue::Number(_) => "number",
            TraceValue::Text(_) => "text",
            TraceValue::Sequence(_) => "sequence",
            TraceValue::Mapping(_) => "mapping",
            TraceValue::Opaque(_) => "opaque",
        }
    }
}

impl Serialize for TraceValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TraceValue::Null => serializer.serialize_unit(),
            TraceValue::Bool(b) => serializer.serialize_bool(*b),
            TraceValue::Number(n) => n.serialize(serializer),
            TraceValue::Text(s) | TraceValue::Opaque(s) => serializer.serialize_str(s),
            TraceValue::Sequence(items) => items.serialize(serializer),
            TraceValue::Mapping(entries) => entries.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for TraceValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PlainVisitor;

        impl<'de> de::Visitor<'de> for PlainVisitor {
            type Value = TraceValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON value")
            }

            fn visit_unit<E: de::Error>(self) -> Result<TraceValue, E> {
                Ok(TraceValue::Null)
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<TraceValue, E> {
                Ok(TraceValue::Bool(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<TraceValue, E> {
                Ok(TraceValue::int(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<TraceValue, E> {
                Ok(TraceValue::Number(serde_json::Number::from(v)))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<TraceValue, E> {
                TraceValue::float(v).ok_or_else(|| E::custom("number is not finite"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<TraceValue, E> {
                Ok(TraceValue::Text(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<TraceValue, E> {
                Ok(TraceValue::Text(v))
            }

            fn visit_seq<A: de::SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> Result<TraceValue, A::Error> {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(TraceValue::Sequence(items))
            }

            fn visit_map<A: de::MapAccess<'de>>(
                self,
                mut map: A,
            ) -> Result<TraceValue, A::Error> {
                let mut entries = IndexMap::new();
                while let Some((key, value)) = map.next_entry::<String, TraceValue>()? {
                    entries.insert(key, value);
                }
                Ok(TraceValue::Mapping(entries))
            }
        }

        deserializer.deserialize_any(PlainVisitor)
    }
}

/// Literal-style rendering, used for return values and document text.
///
/// Text is quoted, sequences use `[..]`, mappings use `#{..}`. Opaque
/// placeholders print as-is.
impl fmt::Display for TraceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceValue::Null => f.write_str("()"),
            TraceValue::Bool(b) => write!(f, "{b}"),
            TraceValue::Number(n) => write!(f, "{n}"),
            TraceValue::Text(s) => write!(f, "{s:?}"),
            TraceValue::Sequence(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            TraceValue::Mapping(entries) => {
                f.write_str("#{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            TraceValue::Opaque(placeholder) => f.write_str(placeholder),
        }
    }
}
