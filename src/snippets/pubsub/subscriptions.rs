//! Subscriptions: admin, synchronous pull and subscription IAM

use super::iam;
use super::models::{DeadLetterPolicy, PushConfig, ReceivedMessage, Subscription};
use super::topics::topic_path;
use crate::gcp::client::GcpClient;
use crate::gcp::iam_policy::{Policy, ALL_USERS, EDITOR, VIEWER};
use crate::gcp::pager::list_all_as;
use anyhow::{Context, Result};
use serde_json::json;
use std::io::Write;

fn subscription_path(project_id: &str, sub_id: &str) -> String {
    format!("projects/{}/subscriptions/{}", project_id, sub_id)
}

async fn put_subscription(
    client: &GcpClient,
    project_id: &str,
    sub_id: &str,
    config: &Subscription,
) -> Result<Subscription> {
    let url = client.pubsub_url(&subscription_path(project_id, sub_id));
    let body = serde_json::to_value(config)?;
    let value = client.put(&url, &body).await.context("CreateSubscription")?;
    serde_json::from_value(value).context("Unexpected subscription shape")
}

fn base_config(
    project_id: &str,
    sub_id: &str,
    topic_id: &str,
    ack_deadline_seconds: i32,
) -> Subscription {
    Subscription {
        name: subscription_path(project_id, sub_id),
        topic: topic_path(project_id, topic_id),
        ack_deadline_seconds,
        ..Default::default()
    }
}

/// Create a pull subscription with a 20 second ack deadline
pub async fn create_pull_subscription(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    sub_id: &str,
    topic_id: &str,
) -> Result<Subscription> {
    let config = base_config(project_id, sub_id, topic_id, 20);
    let sub = put_subscription(client, project_id, sub_id, &config).await?;

    writeln!(w, "Created subscription: {}", sub.name)?;
    Ok(sub)
}

/// Create a push subscription delivering to `endpoint`, 10 second ack deadline
pub async fn create_push_subscription(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    sub_id: &str,
    topic_id: &str,
    endpoint: &str,
) -> Result<Subscription> {
    let config = Subscription {
        push_config: Some(PushConfig {
            push_endpoint: endpoint.to_string(),
        }),
        ..base_config(project_id, sub_id, topic_id, 10)
    };
    let sub = put_subscription(client, project_id, sub_id, &config).await?;

    writeln!(w, "Created push subscription: {}", sub.name)?;
    Ok(sub)
}

/// Create a subscription that only receives messages matching `filter`
/// (e.g. `attributes.author="unknown"`)
pub async fn create_subscription_with_filter(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    sub_id: &str,
    topic_id: &str,
    filter: &str,
) -> Result<Subscription> {
    let config = Subscription {
        filter: filter.to_string(),
        ..base_config(project_id, sub_id, topic_id, 20)
    };
    let sub = put_subscription(client, project_id, sub_id, &config).await?;

    writeln!(w, "Created subscription with filter: {}", sub.name)?;
    Ok(sub)
}

/// Create a subscription forwarding undeliverable messages to a dead letter topic
pub async fn create_subscription_with_dead_letter(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    sub_id: &str,
    topic_id: &str,
    dead_letter_topic_id: &str,
    max_delivery_attempts: i32,
) -> Result<Subscription> {
    let config = Subscription {
        dead_letter_policy: Some(DeadLetterPolicy {
            dead_letter_topic: topic_path(project_id, dead_letter_topic_id),
            max_delivery_attempts,
        }),
        ..base_config(project_id, sub_id, topic_id, 20)
    };
    let sub = put_subscription(client, project_id, sub_id, &config).await?;

    writeln!(w, "Created subscription with dead letter topic: {}", sub.name)?;
    Ok(sub)
}

/// Point a push subscription at a new endpoint
pub async fn update_push_endpoint(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    sub_id: &str,
    endpoint: &str,
) -> Result<Subscription> {
    let url = client.pubsub_url(&subscription_path(project_id, sub_id));
    let body = json!({
        "subscription": { "pushConfig": { "pushEndpoint": endpoint } },
        "updateMask": "pushConfig",
    });
    let sub: Subscription = client
        .patch_as(&url, &body)
        .await
        .context("Subscription.Update")?;

    let endpoint = sub
        .push_config
        .as_ref()
        .map(|c| c.push_endpoint.as_str())
        .unwrap_or_default();
    writeln!(w, "Updated subscription config: {} -> {}", sub.name, endpoint)?;
    Ok(sub)
}

/// List every subscription of a project
pub async fn list_subscriptions(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
) -> Result<Vec<Subscription>> {
    let url = client.pubsub_url(&format!("projects/{}/subscriptions", project_id));
    let subs: Vec<Subscription> = list_all_as(client, &url, "subscriptions")
        .await
        .context("Subscriptions")?;

    for sub in &subs {
        writeln!(w, "{}", sub.name)?;
    }
    Ok(subs)
}

/// Delete a subscription
pub async fn delete_subscription(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    sub_id: &str,
) -> Result<()> {
    client
        .delete(&client.pubsub_url(&subscription_path(project_id, sub_id)))
        .await
        .context("Subscription.Delete")?;

    writeln!(w, "Subscription deleted.")?;
    Ok(())
}

/// Pull up to `max_messages` once, print and acknowledge them
pub async fn pull_messages(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    sub_id: &str,
    max_messages: i32,
) -> Result<usize> {
    let name = subscription_path(project_id, sub_id);
    let response = client
        .post(
            &client.pubsub_url(&format!("{}:pull", name)),
            Some(&json!({ "maxMessages": max_messages })),
        )
        .await
        .context("Pull")?;

    let received: Vec<ReceivedMessage> = match response.get("receivedMessages") {
        Some(messages) => {
            serde_json::from_value(messages.clone()).context("Unexpected message shape")?
        }
        None => Vec::new(),
    };

    if received.is_empty() {
        writeln!(w, "No messages received")?;
        return Ok(0);
    }

    let mut ack_ids = Vec::with_capacity(received.len());
    for msg in &received {
        let payload = msg.message.payload()?;
        writeln!(w, "Got message: {:?}", String::from_utf8_lossy(&payload))?;
        ack_ids.push(msg.ack_id.as_str());
    }

    client
        .post(
            &client.pubsub_url(&format!("{}:acknowledge", name)),
            Some(&json!({ "ackIds": ack_ids })),
        )
        .await
        .context("Acknowledge")?;

    Ok(received.len())
}

/// Print the role bindings of a subscription
pub async fn get_subscription_policy(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    sub_id: &str,
) -> Result<Policy> {
    let policy = iam::get_policy(client, &subscription_path(project_id, sub_id)).await?;
    for role in policy.roles() {
        writeln!(w, "{:?}: {:?}", role, policy.members(role))?;
    }
    Ok(policy)
}

/// Let anyone view the subscription and give the cloud-logs group edit access
pub async fn add_subscription_users(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    sub_id: &str,
) -> Result<Policy> {
    let resource = subscription_path(project_id, sub_id);
    let mut policy = iam::get_policy(client, &resource).await?;
    policy.add(ALL_USERS, VIEWER);
    policy.add("group:cloud-logs@google.com", EDITOR);
    let policy = iam::set_policy(client, &resource, &policy).await?;

    writeln!(w, "Added users to subscription {}", sub_id)?;
    Ok(policy)
}

/// Which of consume/update the caller may do on the subscription
pub async fn test_subscription_permissions(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    sub_id: &str,
) -> Result<Vec<String>> {
    let perms = iam::test_permissions(
        client,
        &subscription_path(project_id, sub_id),
        &["pubsub.subscriptions.consume", "pubsub.subscriptions.update"],
    )
    .await?;

    for perm in &perms {
        writeln!(w, "Allowed: {}", perm)?;
    }
    Ok(perms)
}
