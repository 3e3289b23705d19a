//! Lite topics (zonal or regional)

use super::models::{Capacity, LiteTopic, PartitionConfig, ReservationConfig, RetentionConfig};
use crate::gcp::client::{with_query, GcpClient};
use crate::gcp::pager::{list_all, list_all_as};
use anyhow::{Context, Result};
use std::io::Write;

/// 30 GiB per partition
pub const DEFAULT_PER_PARTITION_BYTES: i64 = 30 * 1024 * 1024 * 1024;

fn topics_parent(project_id: &str, location: &str) -> String {
    format!("projects/{}/locations/{}/topics", project_id, location)
}

pub(crate) fn lite_topic_path(project_id: &str, location: &str, topic_id: &str) -> String {
    format!("{}/{}", topics_parent(project_id, location), topic_id)
}

/// Two partitions, 4 MiB/s publish and 8 MiB/s subscribe each, 30 GiB
/// retained per partition with no time limit.
fn default_topic(reservation: &str) -> LiteTopic {
    LiteTopic {
        partition_config: Some(PartitionConfig {
            count: 2,
            capacity: Some(Capacity {
                publish_mib_per_sec: 4,
                subscribe_mib_per_sec: 8,
            }),
        }),
        retention_config: Some(RetentionConfig {
            per_partition_bytes: DEFAULT_PER_PARTITION_BYTES,
            period: None,
        }),
        reservation_config: (!reservation.is_empty()).then(|| ReservationConfig {
            throughput_reservation: reservation.to_string(),
        }),
        ..Default::default()
    }
}

/// Create a topic in `location` (a region or a zone). `reservation` is the
/// full reservation path, or empty for none.
pub async fn create_lite_topic(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    location: &str,
    topic_id: &str,
    reservation: &str,
) -> Result<LiteTopic> {
    let url = with_query(
        &client.pubsublite_url(location, &topics_parent(project_id, location)),
        &[("topicId", topic_id)],
    )?;
    let body = serde_json::to_value(default_topic(reservation))?;
    let topic: LiteTopic = client
        .post_as(&url, Some(&body))
        .await
        .context("client.CreateTopic")?;

    writeln!(w, "Created topic: {}", topic.name)?;
    Ok(topic)
}

pub async fn get_lite_topic(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    location: &str,
    topic_id: &str,
) -> Result<LiteTopic> {
    let url = client.pubsublite_url(location, &lite_topic_path(project_id, location, topic_id));
    let topic: LiteTopic = client.get_as(&url).await.context("client.Topic")?;

    writeln!(w, "Got topic: {:?}", topic)?;
    Ok(topic)
}

pub async fn list_lite_topics(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    location: &str,
) -> Result<Vec<LiteTopic>> {
    let url = client.pubsublite_url(location, &topics_parent(project_id, location));
    let topics: Vec<LiteTopic> = list_all_as(client, &url, "topics")
        .await
        .context("client.Topics")?;

    for topic in &topics {
        writeln!(w, "Got topic: {}", topic.name)?;
    }
    Ok(topics)
}

/// Raise partition capacity, set one day of retention and switch reservation
pub async fn update_lite_topic(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    location: &str,
    topic_id: &str,
    reservation: &str,
) -> Result<LiteTopic> {
    let name = lite_topic_path(project_id, location, topic_id);
    let update = LiteTopic {
        name: name.clone(),
        partition_config: Some(PartitionConfig {
            count: 2,
            capacity: Some(Capacity {
                publish_mib_per_sec: 8,
                subscribe_mib_per_sec: 16,
            }),
        }),
        retention_config: Some(RetentionConfig {
            per_partition_bytes: 60 * 1024 * 1024 * 1024,
            period: Some("86400s".to_string()),
        }),
        reservation_config: Some(ReservationConfig {
            throughput_reservation: reservation.to_string(),
        }),
    };
    let url = with_query(
        &client.pubsublite_url(location, &name),
        &[(
            "updateMask",
            "partitionConfig.capacity,retentionConfig.perPartitionBytes,retentionConfig.period,reservationConfig.throughputReservation",
        )],
    )?;
    let topic: LiteTopic = client
        .patch_as(&url, &serde_json::to_value(&update)?)
        .await
        .context("client.UpdateTopic")?;

    writeln!(w, "Updated topic: {:?}", topic)?;
    Ok(topic)
}

pub async fn delete_lite_topic(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    location: &str,
    topic_id: &str,
) -> Result<()> {
    let url = client.pubsublite_url(location, &lite_topic_path(project_id, location, topic_id));
    client.delete(&url).await.context("client.DeleteTopic")?;

    writeln!(w, "Deleted topic")?;
    Ok(())
}

/// Names of the subscriptions attached to a topic
pub async fn list_subscriptions_in_topic(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    location: &str,
    topic_id: &str,
) -> Result<Vec<String>> {
    let url = client.pubsublite_url(
        location,
        &format!("{}/subscriptions", lite_topic_path(project_id, location, topic_id)),
    );
    let names: Vec<String> = list_all(client, &url, "subscriptions")
        .await
        .context("client.TopicSubscriptions")?
        .into_iter()
        .filter_map(|v| v.as_str().map(String::from))
        .collect();

    for name in &names {
        writeln!(w, "Got subscription: {}", name)?;
    }
    Ok(names)
}
