//! Pub/Sub resource shapes

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_settings: Option<SchemaSettings>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSettings {
    pub schema: String,
    /// `JSON` or `BINARY`
    #[serde(default)]
    pub encoding: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub name: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_config: Option<PushConfig>,
    #[serde(default)]
    pub ack_deadline_seconds: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub filter: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_letter_policy: Option<DeadLetterPolicy>,
    #[serde(default)]
    pub enable_message_ordering: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushConfig {
    #[serde(default)]
    pub push_endpoint: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterPolicy {
    pub dead_letter_topic: String,
    pub max_delivery_attempts: i32,
}

/// A message as sent on the wire; `data` is base64
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PubsubMessage {
    #[serde(default)]
    pub data: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_time: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ordering_key: String,
}

impl PubsubMessage {
    pub fn new(payload: &[u8]) -> Self {
        Self {
            data: STANDARD.encode(payload),
            ..Default::default()
        }
    }

    pub fn with_ordering_key(mut self, key: &str) -> Self {
        self.ordering_key = key.to_string();
        self
    }

    /// Decoded payload
    pub fn payload(&self) -> anyhow::Result<Vec<u8>> {
        Ok(STANDARD.decode(&self.data)?)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedMessage {
    pub ack_id: String,
    #[serde(default)]
    pub message: PubsubMessage,
    #[serde(default)]
    pub delivery_attempt: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(default)]
    pub name: String,
    /// `AVRO` or `PROTOCOL_BUFFER`
    #[serde(default, rename = "type")]
    pub schema_type: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_create_time: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_data_is_base64() {
        let msg = PubsubMessage::new(b"hello world!");
        assert_eq!(msg.data, "aGVsbG8gd29ybGQh");
        assert_eq!(msg.payload().unwrap(), b"hello world!");

        let value = serde_json::to_value(&msg).unwrap();
        assert!(value.get("orderingKey").is_none());
        assert!(value.get("attributes").is_none());
    }

    #[test]
    fn test_schema_type_field_name() {
        let schema: Schema = serde_json::from_value(serde_json::json!({
            "name": "projects/p/schemas/s",
            "type": "AVRO",
            "revisionId": "abc",
        }))
        .unwrap();
        assert_eq!(schema.schema_type, "AVRO");
        assert_eq!(schema.revision_id.as_deref(), Some("abc"));
    }
}
