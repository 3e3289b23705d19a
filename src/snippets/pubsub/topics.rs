//! Topics: admin, publishing and topic IAM

use super::iam;
use super::models::{PubsubMessage, SchemaSettings, Topic};
use crate::gcp::client::GcpClient;
use crate::gcp::iam_policy::{Policy, ALL_USERS, EDITOR, VIEWER};
use crate::gcp::pager::{list_all, list_all_as};
use anyhow::{anyhow, Context, Result};
use futures::future::join_all;
use serde_json::{json, Value};
use std::io::Write;

pub(crate) fn topic_path(project_id: &str, topic_id: &str) -> String {
    format!("projects/{}/topics/{}", project_id, topic_id)
}

/// Outcome of a batch publish
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub message_ids: Vec<String>,
    pub failures: usize,
}

async fn put_topic(
    client: &GcpClient,
    project_id: &str,
    topic_id: &str,
    body: &Value,
) -> Result<Topic> {
    let url = client.pubsub_url(&topic_path(project_id, topic_id));
    let value = client.put(&url, body).await.context("CreateTopic")?;
    serde_json::from_value(value).context("Unexpected topic shape")
}

/// Create a topic
pub async fn create_topic(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    topic_id: &str,
) -> Result<Topic> {
    let topic = put_topic(client, project_id, topic_id, &json!({})).await?;
    writeln!(w, "Topic created: {}", topic.name)?;
    Ok(topic)
}

/// Create a topic whose messages are validated against a schema
pub async fn create_topic_with_schema(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    topic_id: &str,
    schema_id: &str,
    encoding: &str,
) -> Result<Topic> {
    let settings = SchemaSettings {
        schema: format!("projects/{}/schemas/{}", project_id, schema_id),
        encoding: encoding.to_string(),
    };
    let body = json!({ "schemaSettings": settings });
    let topic = put_topic(client, project_id, topic_id, &body).await?;

    writeln!(w, "Topic with schema created: {}", topic.name)?;
    Ok(topic)
}

/// List every topic of a project
pub async fn list_topics(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
) -> Result<Vec<Topic>> {
    let url = client.pubsub_url(&format!("projects/{}/topics", project_id));
    let topics: Vec<Topic> = list_all_as(client, &url, "topics")
        .await
        .context("Topics")?;

    for topic in &topics {
        writeln!(w, "{}", topic.name)?;
    }
    Ok(topics)
}

/// Names of the subscriptions attached to a topic
pub async fn list_topic_subscriptions(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    topic_id: &str,
) -> Result<Vec<String>> {
    let url = client.pubsub_url(&format!("{}/subscriptions", topic_path(project_id, topic_id)));
    let names: Vec<String> = list_all(client, &url, "subscriptions")
        .await
        .context("Topic.Subscriptions")?
        .into_iter()
        .filter_map(|v| v.as_str().map(String::from))
        .collect();

    for name in &names {
        writeln!(w, "{}", name)?;
    }
    Ok(names)
}

/// Delete a topic
pub async fn delete_topic(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    topic_id: &str,
) -> Result<()> {
    let name = topic_path(project_id, topic_id);
    client
        .delete(&client.pubsub_url(&name))
        .await
        .context("Topic.Delete")?;

    writeln!(w, "Deleted topic: {}", name)?;
    Ok(())
}

/// Publish messages in one request; returns the server-assigned IDs
async fn publish_messages(
    client: &GcpClient,
    project_id: &str,
    topic_id: &str,
    messages: &[PubsubMessage],
) -> Result<Vec<String>> {
    let url = client.pubsub_url(&format!("{}:publish", topic_path(project_id, topic_id)));
    let body = json!({ "messages": messages });
    let response = client.post(&url, Some(&body)).await.context("Publish")?;

    let ids: Vec<String> = response
        .get("messageIds")
        .and_then(|v| v.as_array())
        .map(|ids| ids.iter().filter_map(|id| id.as_str().map(String::from)).collect())
        .unwrap_or_default();

    if ids.len() != messages.len() {
        return Err(anyhow!(
            "publish returned {} message IDs for {} messages",
            ids.len(),
            messages.len()
        ));
    }
    Ok(ids)
}

/// Publish one message and block until the server acknowledges it
pub async fn publish(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    topic_id: &str,
    msg: &str,
) -> Result<String> {
    let ids = publish_messages(
        client,
        project_id,
        topic_id,
        &[PubsubMessage::new(msg.as_bytes())],
    )
    .await?;
    let id = ids.into_iter().next().unwrap_or_default();

    writeln!(w, "Published a message; msg ID: {}", id)?;
    Ok(id)
}

/// Publish a message with an ordering key. Messages sharing a key are
/// delivered in order to subscriptions with message ordering enabled.
pub async fn publish_with_ordering_key(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    topic_id: &str,
    msg: &str,
    ordering_key: &str,
) -> Result<String> {
    let message = PubsubMessage::new(msg.as_bytes()).with_ordering_key(ordering_key);
    let ids = publish_messages(client, project_id, topic_id, &[message]).await?;
    let id = ids.into_iter().next().unwrap_or_default();

    writeln!(w, "Published a message with ordering key {}; msg ID: {}", ordering_key, id)?;
    Ok(id)
}

/// Publish `count` messages concurrently and wait for all of them.
/// Individual failures are counted, not propagated.
pub async fn publish_batch(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    topic_id: &str,
    count: usize,
) -> Result<BatchResult> {
    let publishes = (0..count).map(|i| async move {
        let message = PubsubMessage::new(format!("Message {}", i).as_bytes());
        publish_messages(client, project_id, topic_id, &[message]).await
    });

    let mut result = BatchResult::default();
    for (i, outcome) in join_all(publishes).await.into_iter().enumerate() {
        match outcome {
            Ok(ids) => result.message_ids.extend(ids),
            Err(e) => {
                tracing::warn!("Failed to publish message {}: {:#}", i, e);
                writeln!(w, "Failed to publish: {}", e)?;
                result.failures += 1;
            }
        }
    }

    writeln!(
        w,
        "Published {} messages with {} failures",
        result.message_ids.len(),
        result.failures
    )?;
    Ok(result)
}

/// Print the role bindings of a topic
pub async fn get_topic_policy(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    topic_id: &str,
) -> Result<Policy> {
    let policy = iam::get_policy(client, &topic_path(project_id, topic_id)).await?;
    for role in policy.roles() {
        writeln!(w, "{}: {:?}", role, policy.members(role))?;
    }
    Ok(policy)
}

/// Let anyone view the topic and give the cloud-logs group edit access
pub async fn add_topic_users(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    topic_id: &str,
) -> Result<Policy> {
    let resource = topic_path(project_id, topic_id);
    let mut policy = iam::get_policy(client, &resource).await?;
    policy.add(ALL_USERS, VIEWER);
    policy.add("group:cloud-logs@google.com", EDITOR);
    let policy = iam::set_policy(client, &resource, &policy).await?;

    writeln!(w, "Added users to topic {}", topic_id)?;
    Ok(policy)
}

/// Which of publish/update the caller may do on the topic
pub async fn test_topic_permissions(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    topic_id: &str,
) -> Result<Vec<String>> {
    let perms = iam::test_permissions(
        client,
        &topic_path(project_id, topic_id),
        &["pubsub.topics.publish", "pubsub.topics.update"],
    )
    .await?;

    for perm in &perms {
        writeln!(w, "Allowed: {}", perm)?;
    }
    Ok(perms)
}
