//! AMF0 value types
//!
//! Object properties are insertion-ordered: certain historical clients
//! (FMLE) hang if connect-response properties arrive in a different order
//! than the reference server emits them, so `Amf0Object` keeps a vector
//! of pairs with a side index instead of a plain hash map.

use std::collections::HashMap;

/// AMF0 value
///
/// `LongString` is decode-only: peers emit it but this library never
/// writes one. `ObjectEnd` is the decoder's sentinel for marker 0x09.
#[derive(Debug, Clone, PartialEq)]
pub enum Amf0Value {
    /// IEEE 754 double (marker 0x00)
    Number(f64),
    /// Boolean (marker 0x01, zero byte = false)
    Boolean(bool),
    /// UTF-8 string with 16-bit length prefix (marker 0x02)
    String(String),
    /// Key-value object (marker 0x03)
    Object(Amf0Object),
    /// Null (marker 0x05)
    Null,
    /// Undefined (marker 0x06)
    Undefined,
    /// Associative array with a count hint (marker 0x08)
    EcmaArray(Amf0Object),
    /// Object terminator sentinel (marker 0x09)
    ObjectEnd,
    /// String with 32-bit length prefix (marker 0x0C), decode-only
    LongString(String),
}

impl Amf0Value {
    /// Serialized size in bytes, marker included
    pub fn size(&self) -> usize {
        match self {
            Amf0Value::Number(_) => 9,
            Amf0Value::Boolean(_) => 2,
            Amf0Value::String(s) => 3 + s.len(),
            Amf0Value::Object(o) => 1 + o.body_size() + 3,
            Amf0Value::Null | Amf0Value::Undefined => 1,
            Amf0Value::EcmaArray(o) => 5 + o.body_size() + 3,
            // empty property name plus the end marker
            Amf0Value::ObjectEnd => 3,
            Amf0Value::LongString(s) => 5 + s.len(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Amf0Value::String(s) | Amf0Value::LongString(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Amf0Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Amf0Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Amf0Object> {
        match self {
            Amf0Value::Object(o) | Amf0Value::EcmaArray(o) => Some(o),
            _ => None,
        }
    }

    pub fn is_null_or_undefined(&self) -> bool {
        matches!(self, Amf0Value::Null | Amf0Value::Undefined)
    }
}

impl From<f64> for Amf0Value {
    fn from(v: f64) -> Self {
        Amf0Value::Number(v)
    }
}

impl From<bool> for Amf0Value {
    fn from(v: bool) -> Self {
        Amf0Value::Boolean(v)
    }
}

impl From<&str> for Amf0Value {
    fn from(v: &str) -> Self {
        Amf0Value::String(v.to_string())
    }
}

impl From<String> for Amf0Value {
    fn from(v: String) -> Self {
        Amf0Value::String(v)
    }
}

impl From<Amf0Object> for Amf0Value {
    fn from(v: Amf0Object) -> Self {
        Amf0Value::Object(v)
    }
}

/// Insertion-ordered property map
///
/// Lookups go through a name-to-slot index; overwrites replace the value
/// in place and keep the original ordering slot.
#[derive(Debug, Clone, Default)]
pub struct Amf0Object {
    properties: Vec<(String, Amf0Value)>,
    index: HashMap<String, usize>,
}

impl Amf0Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. Last write wins; the slot of the first
    /// insertion is preserved.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Amf0Value>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.index.get(&name) {
            Some(&slot) => self.properties[slot].1 = value,
            None => {
                self.index.insert(name.clone(), self.properties.len());
                self.properties.push((name, value));
            }
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Amf0Value> {
        self.index.get(name).map(|&slot| &self.properties[slot].1)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name)?.as_str()
    }

    pub fn get_number(&self, name: &str) -> Option<f64> {
        self.get(name)?.as_number()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Properties in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Amf0Value)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Encoded size of the property list, without marker or terminator
    pub fn body_size(&self) -> usize {
        self.properties
            .iter()
            .map(|(k, v)| 2 + k.len() + v.size())
            .sum()
    }
}

impl PartialEq for Amf0Object {
    fn eq(&self, other: &Self) -> bool {
        self.properties == other.properties
    }
}

impl<'a> IntoIterator for &'a Amf0Object {
    type Item = &'a (String, Amf0Value);
    type IntoIter = std::slice::Iter<'a, (String, Amf0Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.properties.iter()
    }
}
