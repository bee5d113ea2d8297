use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stored parameters of a queued action: a JSON object, written once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OfflinePayload(Value);

impl OfflinePayload {
    pub fn new(value: Value) -> Result<Self, String> {
        Self::validate(&value)?;
        Ok(Self(value))
    }

    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| format!("Invalid JSON payload: {e}"))?;
        Self::new(value)
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// True when `key` is present with a non-null value.
    pub fn has_value(&self, key: &str) -> bool {
        self.get(key).is_some_and(|value| !value.is_null())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn into_inner(self) -> Value {
        self.0
    }

    fn validate(value: &Value) -> Result<(), String> {
        if !value.is_object() {
            return Err("Offline payload must be a JSON object".to_string());
        }
        Ok(())
    }
}

impl From<OfflinePayload> for Value {
    fn from(payload: OfflinePayload) -> Self {
        payload.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_non_object_payloads() {
        assert!(OfflinePayload::new(json!(null)).is_err());
        assert!(OfflinePayload::new(json!([1, 2])).is_err());
        assert!(OfflinePayload::from_json_str("not json").is_err());
    }

    #[test]
    fn reads_string_fields() {
        let payload = OfflinePayload::new(json!({"alertId": "alert-1", "radius": 5})).unwrap();
        assert_eq!(payload.get_str("alertId"), Some("alert-1"));
        assert_eq!(payload.get_str("radius"), None);
    }
}
