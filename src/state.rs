//! Key-value state shared by the host store and the sandboxed local mirror.
//!
//! Both sides of the trust boundary hold the same shape of data: a map from
//! string keys to arbitrary JSON values, where a deleted entry keeps its key
//! but holds an absent marker. [`StateMap`] applies a [`Mutation`] the same
//! way on either side so the optimistic mirror and the canonical store agree
//! whenever they see the same sequence of actions.

use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// A stored entry. `None` is the absent marker left behind by a delete.
pub type Slot = Option<Value>;

/// A single change to one key of a [`StateMap`].
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Set(Value),
    Delete,
    Increment,
    Decrement,
}

impl Mutation {
    /// Set and delete leave the same state however often they are applied.
    pub fn is_idempotent(&self) -> bool {
        matches!(self, Mutation::Set(_) | Mutation::Delete)
    }
}

/// Parse a stored value as a finite number, treating anything else as `0`.
///
/// Numbers and strings that read entirely as a finite decimal (surrounding
/// whitespace allowed) keep their value; absent entries, `null`, booleans,
/// objects, arrays and non-finite values coerce to `0`.
pub fn numeric_coerce(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            // "inf"/"nan" parse in Rust but are not numeric literals here
            let has_word = trimmed
                .chars()
                .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E');
            if trimmed.is_empty() || has_word {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    };
    match parsed {
        Some(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

/// Convert a computed number back into a JSON value, keeping integral
/// results as integers so `1` round-trips as `1` rather than `1.0`.
pub fn number_value(n: f64) -> Value {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Ordered map of state entries.
///
/// Keys are kept sorted so serialized snapshots are byte-for-byte stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateMap {
    entries: BTreeMap<String, Slot>,
}

impl StateMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The live value for `key`; `None` when missing or deleted.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).and_then(|slot| slot.as_ref())
    }

    /// The raw slot for `key`, distinguishing "never written" (`None`) from
    /// "deleted" (`Some(None)`).
    pub fn slot(&self, key: &str) -> Option<&Slot> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Slot)> {
        self.entries.iter()
    }

    /// Write `value` at `key`. Returns whether the stored slot changed.
    pub fn set(&mut self, key: &str, value: Value) -> bool {
        self.store(key, Some(value))
    }

    /// Leave an absent marker at `key`. Returns whether the stored slot changed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.store(key, None)
    }

    /// Apply one mutation to `key`. Returns whether the stored slot changed.
    pub fn apply(&mut self, key: &str, mutation: &Mutation) -> bool {
        match mutation {
            Mutation::Set(value) => self.set(key, value.clone()),
            Mutation::Delete => self.delete(key),
            Mutation::Increment => {
                let next = numeric_coerce(self.get(key)) + 1.0;
                self.set(key, number_value(next))
            }
            Mutation::Decrement => {
                let next = numeric_coerce(self.get(key)) - 1.0;
                self.set(key, number_value(next))
            }
        }
    }

    fn store(&mut self, key: &str, slot: Slot) -> bool {
        if self.entries.get(key) == Some(&slot) {
            return false;
        }
        self.entries.insert(key.to_string(), slot);
        true
    }

    /// Live entries as a JSON object. Deleted entries are omitted.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (key, slot) in &self.entries {
            if let Some(value) = slot {
                map.insert(key.clone(), value.clone());
            }
        }
        Value::Object(map)
    }

    /// Serialize the live entries as a compact JSON object.
    pub fn to_snapshot(&self) -> String {
        self.to_json().to_string()
    }

    /// Rebuild a map from a snapshot produced by [`StateMap::to_snapshot`].
    pub fn from_snapshot(snapshot: &str) -> Result<Self, serde_json::Error> {
        let map: BTreeMap<String, Value> = serde_json::from_str(snapshot)?;
        Ok(Self {
            entries: map.into_iter().map(|(k, v)| (k, Some(v))).collect(),
        })
    }
}

impl FromIterator<(String, Value)> for StateMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k, Some(v))).collect(),
        }
    }
}
