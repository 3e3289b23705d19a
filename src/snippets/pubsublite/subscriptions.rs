//! Lite subscriptions, export subscriptions and seek

use super::models::{DeliveryConfig, ExportConfig, LiteSubscription, PubSubExport, SeekTarget};
use super::topics::lite_topic_path;
use crate::gcp::client::{region_of, with_query, GcpClient};
use crate::gcp::operation::{wait_operation, Operation};
use crate::gcp::pager::list_all_as;
use anyhow::{Context, Result};
use serde_json::json;
use std::io::Write;

pub const DELIVER_IMMEDIATELY: &str = "DELIVER_IMMEDIATELY";
pub const DELIVER_AFTER_STORED: &str = "DELIVER_AFTER_STORED";

fn subscriptions_parent(project_id: &str, location: &str) -> String {
    format!("projects/{}/locations/{}/subscriptions", project_id, location)
}

fn lite_subscription_path(project_id: &str, location: &str, sub_id: &str) -> String {
    format!("{}/{}", subscriptions_parent(project_id, location), sub_id)
}

async fn post_subscription(
    client: &GcpClient,
    project_id: &str,
    location: &str,
    sub_id: &str,
    sub: &LiteSubscription,
) -> Result<LiteSubscription> {
    let url = with_query(
        &client.pubsublite_url(location, &subscriptions_parent(project_id, location)),
        &[("subscriptionId", sub_id)],
    )?;
    client
        .post_as(&url, Some(&serde_json::to_value(sub)?))
        .await
        .context("client.CreateSubscription")
}

/// Create a subscription that delivers messages before they are stored
pub async fn create_lite_subscription(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    location: &str,
    topic_id: &str,
    sub_id: &str,
) -> Result<LiteSubscription> {
    let sub = LiteSubscription {
        topic: lite_topic_path(project_id, location, topic_id),
        delivery_config: Some(DeliveryConfig {
            delivery_requirement: DELIVER_IMMEDIATELY.to_string(),
        }),
        ..Default::default()
    };
    let created = post_subscription(client, project_id, location, sub_id, &sub).await?;

    writeln!(w, "Created subscription: {}", created.name)?;
    Ok(created)
}

/// Create a subscription that exports every message to a Pub/Sub topic
pub async fn create_pubsub_export_subscription(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    location: &str,
    topic_id: &str,
    sub_id: &str,
    pubsub_topic_id: &str,
) -> Result<LiteSubscription> {
    let sub = LiteSubscription {
        topic: lite_topic_path(project_id, location, topic_id),
        delivery_config: Some(DeliveryConfig {
            delivery_requirement: DELIVER_IMMEDIATELY.to_string(),
        }),
        export_config: Some(ExportConfig {
            desired_state: "ACTIVE".to_string(),
            pubsub_config: Some(PubSubExport {
                topic: format!("projects/{}/topics/{}", project_id, pubsub_topic_id),
            }),
        }),
        ..Default::default()
    };
    let created = post_subscription(client, project_id, location, sub_id, &sub).await?;

    writeln!(w, "Created export subscription: {}", created.name)?;
    Ok(created)
}

pub async fn get_lite_subscription(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    location: &str,
    sub_id: &str,
) -> Result<LiteSubscription> {
    let url =
        client.pubsublite_url(location, &lite_subscription_path(project_id, location, sub_id));
    let sub: LiteSubscription = client.get_as(&url).await.context("client.Subscription")?;

    writeln!(w, "Got subscription: {:?}", sub)?;
    Ok(sub)
}

/// List every subscription in a location
pub async fn list_lite_subscriptions(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    location: &str,
) -> Result<Vec<LiteSubscription>> {
    let url = client.pubsublite_url(location, &subscriptions_parent(project_id, location));
    let subs: Vec<LiteSubscription> = list_all_as(client, &url, "subscriptions")
        .await
        .context("client.Subscriptions")?;

    for sub in &subs {
        writeln!(w, "Got subscription: {}", sub.name)?;
    }
    Ok(subs)
}

/// Switch a subscription to deliver only stored messages
pub async fn update_lite_subscription(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    location: &str,
    sub_id: &str,
) -> Result<LiteSubscription> {
    let name = lite_subscription_path(project_id, location, sub_id);
    let url = with_query(
        &client.pubsublite_url(location, &name),
        &[("updateMask", "deliveryConfig.deliveryRequirement")],
    )?;
    let body = json!({
        "name": name,
        "deliveryConfig": { "deliveryRequirement": DELIVER_AFTER_STORED },
    });
    let sub: LiteSubscription = client
        .patch_as(&url, &body)
        .await
        .context("client.UpdateSubscription")?;

    writeln!(w, "Updated subscription: {:?}", sub)?;
    Ok(sub)
}

pub async fn delete_lite_subscription(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    location: &str,
    sub_id: &str,
) -> Result<()> {
    let url =
        client.pubsublite_url(location, &lite_subscription_path(project_id, location, sub_id));
    client.delete(&url).await.context("client.DeleteSubscription")?;

    writeln!(w, "Deleted subscription")?;
    Ok(())
}

/// Move the subscription cursor. The seek completes asynchronously; with
/// `wait_for_operation` the call blocks until subscribers have been notified.
pub async fn seek_subscription(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    location: &str,
    sub_id: &str,
    target: SeekTarget,
    wait_for_operation: bool,
) -> Result<Operation> {
    let url = client.pubsublite_url(
        location,
        &format!("{}:seek", lite_subscription_path(project_id, location, sub_id)),
    );
    let op: Operation = client
        .post_as(&url, Some(&json!({ "namedTarget": target.named_target() })))
        .await
        .context("client.SeekSubscription")?;

    writeln!(w, "Seek operation initiated: {}", op.name)?;

    if wait_for_operation {
        let root = client.endpoints.pubsublite_admin(&region_of(location));
        wait_operation(client, &root, op.clone())
            .await
            .context("op.Wait")?;
        writeln!(w, "Seek completed")?;
    }
    Ok(op)
}
