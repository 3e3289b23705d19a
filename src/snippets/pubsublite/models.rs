//! Pub/Sub Lite admin resource shapes

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, with = "crate::gcp::int64")]
    pub throughput_capacity: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiteTopic {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_config: Option<PartitionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_config: Option<RetentionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_config: Option<ReservationConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionConfig {
    #[serde(default, with = "crate::gcp::int64")]
    pub count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<Capacity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capacity {
    pub publish_mib_per_sec: i32,
    pub subscribe_mib_per_sec: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionConfig {
    #[serde(default, with = "crate::gcp::int64")]
    pub per_partition_bytes: i64,
    /// Duration such as `86400s`; absent means retain until the byte limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationConfig {
    #[serde(default)]
    pub throughput_reservation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiteSubscription {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_config: Option<DeliveryConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_config: Option<ExportConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryConfig {
    /// `DELIVER_IMMEDIATELY` or `DELIVER_AFTER_STORED`
    pub delivery_requirement: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportConfig {
    pub desired_state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubsub_config: Option<PubSubExport>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PubSubExport {
    pub topic: String,
}

/// Where a seek moves the subscription cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekTarget {
    /// Oldest retained message
    Beginning,
    /// Skip the backlog
    End,
}

impl SeekTarget {
    /// `namedTarget` value of the seek request
    pub fn named_target(self) -> &'static str {
        match self {
            SeekTarget::Beginning => "TAIL",
            SeekTarget::End => "HEAD",
        }
    }
}

impl std::str::FromStr for SeekTarget {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "beginning" => Ok(SeekTarget::Beginning),
            "end" => Ok(SeekTarget::End),
            other => anyhow::bail!("unknown seek target: {} (expected beginning or end)", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_int64_fields_accept_strings_and_numbers() {
        let res: Reservation =
            serde_json::from_value(json!({ "name": "r", "throughputCapacity": "4" })).unwrap();
        assert_eq!(res.throughput_capacity, 4);

        let res: Reservation =
            serde_json::from_value(json!({ "name": "r", "throughputCapacity": 8 })).unwrap();
        assert_eq!(res.throughput_capacity, 8);
    }

    #[test]
    fn test_int64_fields_serialize_as_strings() {
        let cfg = PartitionConfig {
            count: 2,
            capacity: None,
        };
        assert_eq!(serde_json::to_value(&cfg).unwrap(), json!({ "count": "2" }));
    }

    #[test]
    fn test_seek_target() {
        assert_eq!("Beginning".parse::<SeekTarget>().unwrap().named_target(), "TAIL");
        assert_eq!("end".parse::<SeekTarget>().unwrap().named_target(), "HEAD");
        assert!("middle".parse::<SeekTarget>().is_err());
    }
}
