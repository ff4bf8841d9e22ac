//! # Deep-Equality Map
//!
//! Instance keys are usually small plain values or plain records built at different call
//! sites. An identity-keyed map would never unify two logically equal keys, so keys are
//! canonicalised first:
//!
//! 1. The key is serialised into a [`serde_json::Value`]. Integral floats are folded
//!    into integers, so `1u32` and `1.0f64` are the same key.
//! 2. A canonical string is produced with object fields sorted by name.
//! 3. Lookups hash the canonical string and confirm the match with a structural
//!    comparison of the two values.
//!
//! Primitive keys (null, booleans, numbers, strings) and composite keys (arrays, objects)
//! are kept in two stores. Iteration visits primitives first, then composites, each in
//! insertion order.

use crate::error::ModelError;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A structurally compared key.
#[derive(Clone)]
pub struct ModelKey {
    value: Value,
    canonical: String,
}

impl ModelKey {
    /// Canonicalises any serialisable value.
    pub fn new<K: Serialize + ?Sized>(key: &K) -> Result<Self, ModelError> {
        let value = serde_json::to_value(key).map_err(ModelError::KeyEncoding)?;
        Ok(Self::from_value(value))
    }

    pub fn from_value(value: Value) -> Self {
        let value = normalize(value);
        let mut canonical = String::new();
        write_canonical(&value, &mut canonical);
        Self { value, canonical }
    }

    /// The default key (`null`), used when a model is requested without a key.
    pub fn unit() -> Self {
        Self::from_value(Value::Null)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self.value, Value::Array(_) | Value::Object(_))
    }
}

/// Largest magnitude below which every integral `f64` is exact.
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

fn normalize(value: Value) -> Value {
    match value {
        Value::Number(number) if !number.is_i64() && !number.is_u64() => match number.as_f64() {
            Some(float) if float.fract() == 0.0 && float.abs() < EXACT_INTEGER_LIMIT => {
                Value::from(float as i64)
            }
            _ => Value::Number(number),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(name, field)| (name, normalize(field)))
                .collect(),
        ),
        other => other,
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(fields) => {
            let mut sorted: Vec<_> = fields.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (name, field)) in sorted.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(name.clone()).to_string());
                out.push(':');
                write_canonical(field, out);
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

impl PartialEq for ModelKey {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical && self.value == other.value
    }
}

impl Eq for ModelKey {}

impl Hash for ModelKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl fmt::Debug for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModelKey({})", self.canonical)
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// An insertion-ordered map keyed by structural equality.
#[derive(Clone)]
pub struct DeepMap<V> {
    primitives: IndexMap<String, (ModelKey, V)>,
    composites: IndexMap<String, (ModelKey, V)>,
}

impl<V> Default for DeepMap<V> {
    fn default() -> Self {
        Self {
            primitives: IndexMap::new(),
            composites: IndexMap::new(),
        }
    }
}

impl<V> DeepMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self, key: &ModelKey) -> &IndexMap<String, (ModelKey, V)> {
        if key.is_primitive() {
            &self.primitives
        } else {
            &self.composites
        }
    }

    fn store_mut(&mut self, key: &ModelKey) -> &mut IndexMap<String, (ModelKey, V)> {
        if key.is_primitive() {
            &mut self.primitives
        } else {
            &mut self.composites
        }
    }

    pub fn get(&self, key: &ModelKey) -> Option<&V> {
        let (stored, value) = self.store(key).get(key.canonical())?;
        (stored.value() == key.value()).then_some(value)
    }

    pub fn contains_key(&self, key: &ModelKey) -> bool {
        self.get(key).is_some()
    }

    /// Inserts `value`, returning the value previously stored under an equal key.
    ///
    /// Replacing keeps the original insertion position.
    pub fn insert(&mut self, key: ModelKey, value: V) -> Option<V> {
        let canonical = key.canonical().to_string();
        self.store_mut(&key)
            .insert(canonical, (key, value))
            .map(|(_, previous)| previous)
    }

    pub fn remove(&mut self, key: &ModelKey) -> Option<V> {
        if !self.contains_key(key) {
            return None;
        }
        self.store_mut(key)
            .shift_remove(key.canonical())
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.primitives.len() + self.composites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.primitives.clear();
        self.composites.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModelKey, &V)> {
        self.primitives
            .values()
            .chain(self.composites.values())
            .map(|(key, value)| (key, value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &ModelKey> {
        self.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    pub fn for_each(&self, mut f: impl FnMut(&ModelKey, &V)) {
        for (key, value) in self.iter() {
            f(key, value);
        }
    }

    /// Removes and returns every entry, in iteration order.
    pub fn drain(&mut self) -> Vec<(ModelKey, V)> {
        let mut entries: Vec<_> = self.primitives.drain(..).map(|(_, entry)| entry).collect();
        entries.extend(self.composites.drain(..).map(|(_, entry)| entry));
        entries
    }
}

impl<V: fmt::Debug> fmt::Debug for DeepMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
