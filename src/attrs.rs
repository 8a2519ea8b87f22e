//! Node identity and attribute bags.
//!
//! Supernodes are identified by a [`Key`] that is unique among siblings
//! within one decontractible graph; a node of key 1 may itself contain a
//! node of key 1. Keys minted by contraction schemes are integers equal to
//! the originating component-set id, while base-graph keys come from the
//! caller and may be strings.
//!
//! User-facing metadata lives in string-keyed [`Attributes`] bags of opaque
//! [`AttrValue`]s, kept apart from the fixed structural fields. Structural
//! equality and hashing of graphs ignore attribute bags entirely.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identity of a supernode within one decontractible graph.
///
/// Ordered and hashable; the ordering (integers before strings, then by
/// value) is what makes whole-crate iteration deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Integer key. Scheme-minted keys are always of this form.
    Int(i64),
    /// String key, as supplied for base-graph nodes.
    Str(String),
}

impl From<i64> for Key {
    fn from(raw: i64) -> Self {
        Key::Int(raw)
    }
}

impl From<i32> for Key {
    fn from(raw: i32) -> Self {
        Key::Int(raw as i64)
    }
}

impl From<&str> for Key {
    fn from(raw: &str) -> Self {
        Key::Str(raw.to_string())
    }
}

impl From<String> for Key {
    fn from(raw: String) -> Self {
        Key::Str(raw)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(v) => write!(f, "{}", v),
            Key::Str(v) => write!(f, "{}", v),
        }
    }
}

/// Identifier of a component set, unique within its contraction scheme.
pub type SetId = u64;

/// Identity of a superedge: `(tail key, head key)`.
pub type EdgeKey = (Key, Key);

/// An opaque attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl AttrValue {
    /// Returns the integer payload, if this value is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the float payload, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Float(v) => Some(*v),
            AttrValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Returns the string payload, if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the boolean payload, if this value is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<i64> for AttrValue {
    fn from(raw: i64) -> Self {
        AttrValue::Int(raw)
    }
}

impl From<i32> for AttrValue {
    fn from(raw: i32) -> Self {
        AttrValue::Int(raw as i64)
    }
}

impl From<f64> for AttrValue {
    fn from(raw: f64) -> Self {
        AttrValue::Float(raw)
    }
}

impl From<&str> for AttrValue {
    fn from(raw: &str) -> Self {
        AttrValue::Str(raw.to_string())
    }
}

impl From<bool> for AttrValue {
    fn from(raw: bool) -> Self {
        AttrValue::Bool(raw)
    }
}

/// String-keyed attribute bag attached to supernodes, superedges and
/// component sets.
pub type Attributes = BTreeMap<String, AttrValue>;

/// Builds a one-entry attribute bag. Convenience for tests and callers
/// attaching a single value.
pub fn attr(name: &str, value: impl Into<AttrValue>) -> Attributes {
    let mut bag = Attributes::new();
    bag.insert(name.to_string(), value.into());
    bag
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_ordering_is_total_and_stable() {
        let mut keys = vec![
            Key::Str("b".into()),
            Key::Int(2),
            Key::Str("a".into()),
            Key::Int(-1),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                Key::Int(-1),
                Key::Int(2),
                Key::Str("a".into()),
                Key::Str("b".into()),
            ]
        );
    }

    #[test]
    fn attr_value_accessors() {
        assert_eq!(AttrValue::Int(7).as_i64(), Some(7));
        assert_eq!(AttrValue::Int(7).as_f64(), Some(7.0));
        assert_eq!(AttrValue::Str("x".into()).as_str(), Some("x"));
        assert_eq!(AttrValue::Bool(true).as_bool(), Some(true));
        assert_eq!(AttrValue::Bool(true).as_i64(), None);
    }

    #[test]
    fn attr_builder() {
        let bag = attr("weight", 30);
        assert_eq!(bag.get("weight").and_then(AttrValue::as_i64), Some(30));
    }
}
