//! Long-running operations
//!
//! Two flavours exist across the APIs used here:
//!
//! - Compute Engine operations (`compute#operation`), finished when
//!   `status == "DONE"`, waited on through the `.../operations/{op}/wait`
//!   endpoint.
//! - `google.longrunning.Operation`, finished when `done == true`, polled
//!   with `GET {root}/{operation.name}`.
//!
//! Both are bounded by a [`PollPolicy`].

use super::client::GcpClient;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// How long to keep waiting on an operation
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    /// Sleep between polls
    pub interval: Duration,
    /// Number of polls before giving up
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 300,
        }
    }
}

impl PollPolicy {
    /// Poll without sleeping (for emulators and tests)
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            interval: Duration::ZERO,
            max_attempts,
        }
    }
}

// =============================================================================
// Compute Engine operations
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeOperation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub operation_type: Option<String>,
    #[serde(default)]
    pub target_link: Option<String>,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub error: Option<ComputeOperationError>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComputeOperationError {
    #[serde(default)]
    pub errors: Vec<ComputeErrorItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComputeErrorItem {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl ComputeOperation {
    pub fn is_done(&self) -> bool {
        self.status == "DONE"
    }

    /// Turn `error.errors[]` of a finished operation into an error
    pub fn check_error(&self) -> Result<()> {
        if let Some(error) = &self.error {
            if !error.errors.is_empty() {
                let details: Vec<String> = error
                    .errors
                    .iter()
                    .map(|e| format!("{}: {}", e.code, e.message))
                    .collect();
                bail!("operation {} failed: {}", self.name, details.join("; "));
            }
        }
        Ok(())
    }

    /// URL of the `wait` endpoint, derived from the operation's scope
    pub fn wait_url(&self, client: &GcpClient, project: &str) -> String {
        let resource = format!("operations/{}/wait", self.name);
        if let Some(zone) = self.zone.as_deref() {
            client.compute_zonal_url(project, short_name(zone), &resource)
        } else if let Some(region) = self.region.as_deref() {
            client.compute_regional_url(project, short_name(region), &resource)
        } else {
            client.compute_global_url(project, &resource)
        }
    }
}

/// Block until a Compute Engine operation reports `DONE`
pub async fn wait_compute_operation(
    client: &GcpClient,
    project: &str,
    op: ComputeOperation,
) -> Result<ComputeOperation> {
    let mut op = op;

    for attempt in 0..client.poll.max_attempts {
        if op.is_done() {
            op.check_error()?;
            tracing::info!("Compute operation {} finished", op.name);
            return Ok(op);
        }

        if attempt > 0 && !client.poll.interval.is_zero() {
            tokio::time::sleep(client.poll.interval).await;
        }

        let url = op.wait_url(client, project);
        tracing::debug!("Waiting on compute operation {} ({})", op.name, op.status);
        op = client
            .post_as(&url, None)
            .await
            .with_context(|| format!("wait for operation {}", op.name))?;
    }

    if op.is_done() {
        op.check_error()?;
        return Ok(op);
    }

    bail!(
        "operation {} did not finish after {} polls",
        op.name,
        client.poll.max_attempts
    )
}

// =============================================================================
// google.longrunning.Operation
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub error: Option<Status>,
    #[serde(default)]
    pub response: Option<Value>,
}

/// `google.rpc.Status`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

impl Operation {
    /// Result of a finished operation: the response, or the error status
    pub fn into_result(self) -> Result<Value> {
        if let Some(status) = self.error {
            bail!(
                "operation {} failed: code {}: {}",
                self.name,
                status.code,
                status.message
            );
        }
        Ok(self.response.unwrap_or(Value::Null))
    }
}

/// Poll a long-running operation under `root` until it is done
pub async fn wait_operation(client: &GcpClient, root: &str, op: Operation) -> Result<Value> {
    let mut op = op;
    let url = format!("{}/{}", root, op.name);

    for attempt in 0..client.poll.max_attempts {
        if op.done {
            tracing::info!("Operation {} finished", op.name);
            return op.into_result();
        }

        if attempt > 0 && !client.poll.interval.is_zero() {
            tokio::time::sleep(client.poll.interval).await;
        }

        tracing::debug!("Polling operation {}", op.name);
        op = client
            .get_as(&url)
            .await
            .with_context(|| format!("get operation {}", op.name))?;
    }

    if op.done {
        return op.into_result();
    }

    bail!(
        "operation {} did not finish after {} polls",
        op.name,
        client.poll.max_attempts
    )
}

/// Last path segment of a resource URL or name
pub fn short_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compute_operation_error_is_surfaced() {
        let op: ComputeOperation = serde_json::from_value(json!({
            "name": "operation-1",
            "status": "DONE",
            "error": {"errors": [{"code": "QUOTA_EXCEEDED", "message": "CPUS quota"}]}
        }))
        .unwrap();

        assert!(op.is_done());
        let err = op.check_error().unwrap_err().to_string();
        assert!(err.contains("QUOTA_EXCEEDED: CPUS quota"));
    }

    #[test]
    fn test_lro_error_is_surfaced() {
        let op: Operation = serde_json::from_value(json!({
            "name": "operations/1",
            "done": true,
            "error": {"code": 9, "message": "failed precondition"}
        }))
        .unwrap();

        assert!(op.into_result().is_err());
    }

    #[test]
    fn test_short_name() {
        assert_eq!(
            short_name("https://www.googleapis.com/compute/v1/projects/p/zones/us-central1-a"),
            "us-central1-a"
        );
        assert_eq!(short_name("plain"), "plain");
    }
}
