use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ID: &str = "id";
pub const NAME: &str = "name";
pub const ADDRESS: &str = "address";
pub const OPERATOR_NAME: &str = "operator_name";
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";
pub const LAST_SEEN_ACTIVE: &str = "last_seen_active";

/// An untyped station record as delivered by a source, with flat keys.
/// Nothing about its shape is trusted until it passes the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawStation(Map<String, Value>);

impl RawStation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.0.insert(key.into(), value.into());
    }

    /// Returns the value for `key`, treating JSON `null` as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|value| !value.is_null())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for RawStation {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}
