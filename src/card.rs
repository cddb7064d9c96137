use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields scraped from one listing tile or one detail page. Never persisted
/// as-is; it only feeds the merge step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRecord {
    pub name: String,
    pub number: Option<String>,
    pub set_name: Option<String>,
    pub set_code: Option<String>,
    pub image_url: Option<String>,
    pub card_type: Option<String>,
    pub rarity: Option<String>,
    pub text: Option<String>,
    pub keywords: Vec<String>,
    pub cost: Option<i64>,
    pub attack: Option<i64>,
    pub health: Option<i64>,
    /// Detail page this record came from or links to, if known.
    pub url: Option<String>,
}

impl SourceRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// One card of the on-disk dataset.
///
/// The JSON object is kept whole so keys this crate doesn't know about, and
/// their order, survive a rewrite untouched. Accessors cover the paths the
/// enrichment reads and fills; `id` has no setter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredRecord(Map<String, Value>);

impl StoredRecord {
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn as_json(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    /// `set.number`, stringified when stored as a JSON number.
    pub fn set_number(&self) -> Option<String> {
        match self.set_field("number")? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set_field(&self, key: &str) -> Option<&Value> {
        self.nested("set", key)
    }

    pub fn image_field(&self, key: &str) -> Option<&Value> {
        self.nested("image", key)
    }

    pub(crate) fn nested(&self, object: &str, key: &str) -> Option<&Value> {
        self.0.get(object)?.as_object()?.get(key)
    }

    pub(crate) fn put(&mut self, key: &str, value: Value) {
        debug_assert_ne!(key, "id");
        self.0.insert(key.to_string(), value);
    }

    /// Writes `object.key`, creating the object (or replacing a non-object
    /// placeholder such as `null`) when needed.
    pub(crate) fn put_nested(&mut self, object: &str, key: &str, value: Value) {
        let slot = self
            .0
            .entry(object.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        if let Value::Object(map) = slot {
            map.insert(key.to_string(), value);
        }
    }
}
