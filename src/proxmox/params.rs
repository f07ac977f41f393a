//! Request payloads.
//!
//! Proxmox endpoints disagree on how they want booleans: most take `1`/`0`,
//! some take a `disable` flag where the natural argument is `enable`, and a
//! few accept native JSON booleans. The encoding is chosen per field by the
//! operation that builds the payload.

use serde_json::{Map, Number, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Sent as a JSON array, or as repeated keys in a query string.
    List(Vec<String>),
}

impl ParamValue {
    fn to_json(&self) -> Value {
        match self {
            ParamValue::Str(s) => Value::String(s.clone()),
            ParamValue::Int(i) => Value::Number((*i).into()),
            ParamValue::Float(f) => Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(f.to_string())),
            ParamValue::Bool(b) => Value::Bool(*b),
            ParamValue::List(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }

    fn to_query(&self) -> Vec<String> {
        match self {
            ParamValue::Str(s) => vec![s.clone()],
            ParamValue::Int(i) => vec![i.to_string()],
            ParamValue::Float(f) => vec![f.to_string()],
            ParamValue::Bool(b) => vec![if *b { "1" } else { "0" }.to_string()],
            ParamValue::List(items) => items.clone(),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

impl From<&String> for ParamValue {
    fn from(v: &String) -> Self {
        ParamValue::Str(v.clone())
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Int(v.into())
    }
}

impl From<u64> for ParamValue {
    fn from(v: u64) -> Self {
        ParamValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(v: Vec<String>) -> Self {
        ParamValue::List(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

/// How a boolean field is put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolEncoding {
    /// `"1"` / `"0"`
    Numeric,
    /// `"0"` / `"1"`, for `disable` fields fed from an `enable` argument.
    Inverted,
    /// JSON `true` / `false`
    Native,
}

impl BoolEncoding {
    fn encode(self, value: bool) -> ParamValue {
        match self {
            BoolEncoding::Numeric => ParamValue::Str(if value { "1" } else { "0" }.into()),
            BoolEncoding::Inverted => ParamValue::Str(if value { "0" } else { "1" }.into()),
            BoolEncoding::Native => ParamValue::Bool(value),
        }
    }
}

/// Ordered key/value payload. Setting a key twice replaces the first value
/// in place, so serialization order only depends on first insertion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value.into());
        self
    }

    /// Like `set`, but leaves the key out when `value` is `None`.
    pub fn opt<V: Into<ParamValue>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(key, v),
            None => self,
        }
    }

    pub fn flag(self, key: &str, value: Option<bool>, encoding: BoolEncoding) -> Self {
        match value {
            Some(v) => self.set(key, encoding.encode(v)),
            None => self,
        }
    }

    pub fn merge(mut self, other: Params) -> Self {
        for (k, v) in other.entries {
            self.insert(&k, v);
        }
        self
    }

    /// Builds a payload from a free-form JSON object. Nulls are dropped and
    /// any nested value other than a string array is sent as JSON text.
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let mut params = Params::new();
        for (k, v) in object {
            let value = match v {
                Value::Null => continue,
                Value::String(s) => ParamValue::Str(s.clone()),
                Value::Bool(b) => ParamValue::Bool(*b),
                Value::Number(n) => match n.as_i64() {
                    Some(i) => ParamValue::Int(i),
                    None => ParamValue::Float(n.as_f64().unwrap_or_default()),
                },
                Value::Array(items) if items.iter().all(Value::is_string) => ParamValue::List(
                    items
                        .iter()
                        .filter_map(|i| i.as_str().map(String::from))
                        .collect(),
                ),
                other => ParamValue::Str(other.to_string()),
            };
            params.insert(k, value);
        }
        params
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (k, v) in &self.entries {
            map.insert(k.clone(), v.to_json());
        }
        Value::Object(map)
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .flat_map(|(k, v)| v.to_query().into_iter().map(move |q| (k.clone(), q)))
            .collect()
    }

    fn insert(&mut self, key: &str, value: ParamValue) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }
}

/// Options structs for individual operations serialize through this.
pub trait ToParams {
    fn to_params(&self) -> Params;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_optional_fields_are_omitted() {
        let p = Params::new()
            .set("vmid", 100u32)
            .opt::<&str>("name", None)
            .opt("target", Some("pve2"))
            .flag("full", None, BoolEncoding::Numeric);

        assert_eq!(p.to_json(), json!({ "vmid": 100, "target": "pve2" }));
    }

    #[test]
    fn test_bool_encodings() {
        let p = Params::new()
            .flag("online", Some(true), BoolEncoding::Numeric)
            .flag("disable", Some(true), BoolEncoding::Inverted)
            .flag("encode", Some(false), BoolEncoding::Native);

        assert_eq!(
            p.to_json(),
            json!({ "online": "1", "disable": "0", "encode": false })
        );
        assert_eq!(
            p.to_query(),
            vec![
                ("online".to_string(), "1".to_string()),
                ("disable".to_string(), "0".to_string()),
                ("encode".to_string(), "0".to_string()),
            ]
        );
    }

    #[test]
    fn test_set_replaces_in_place() {
        let p = Params::new()
            .set("a", "1")
            .set("b", "2")
            .set("a", "3");
        let keys: Vec<String> = p.to_query().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(p.get("a"), Some(&ParamValue::Str("3".into())));
    }

    #[test]
    fn test_list_values() {
        let p = Params::new().set("command", vec!["ls".to_string(), "-l".to_string()]);
        assert_eq!(p.to_json(), json!({ "command": ["ls", "-l"] }));
        assert_eq!(
            p.to_query(),
            vec![
                ("command".to_string(), "ls".to_string()),
                ("command".to_string(), "-l".to_string()),
            ]
        );
    }

    #[test]
    fn test_from_object_drops_nulls() {
        let obj = json!({ "cores": 2, "memory": null, "onboot": true, "rate": 1.5 });
        let p = Params::from_object(obj.as_object().unwrap());
        assert_eq!(p.len(), 3);
        assert_eq!(p.get("cores"), Some(&ParamValue::Int(2)));
        assert_eq!(p.get("rate"), Some(&ParamValue::Float(1.5)));
        assert!(p.get("memory").is_none());
    }
}
