//! Conversions between script values and the backend's JSON result encoding

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::*;

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                // u64 beyond i64::MAX and real numbers both land here
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            serde_json::Value::String(s) => Value::from(s),
            serde_json::Value::Array(items) => {
                Value::array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::record(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::from(*n),
            // Non-finite floats have no JSON encoding
            Value::Float(n) => serde_json::Number::from_f64(*n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Value::Record(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_json::Value::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_backend_rows() {
        let rows = json!([
            { "id": 1, "score": 0.5, "title": "a", "tags": null },
            { "id": 2, "score": 1.5, "title": "b", "tags": ["x"] }
        ]);
        let value = Value::from(rows);
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].get_field("id"), Some(&Value::Int(1)));
        assert_eq!(items[0].get_field("score"), Some(&Value::Float(0.5)));
        assert_eq!(items[0].get_field("tags"), Some(&Value::Null));
        assert_eq!(
            items[1].get_field("tags"),
            Some(&Value::array(vec![Value::string("x")]))
        );
    }

    #[test]
    fn test_record_field_order_preserved() {
        let value: Value = serde_json::from_str(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
        let names: Vec<&str> = value
            .as_record()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_nan_serializes_as_null() {
        let out = serde_json::to_string(&Value::Float(f64::NAN)).unwrap();
        assert_eq!(out, "null");
    }
}
