//! Transfer operations

use super::models::TransferJob;
use crate::gcp::client::{with_query, GcpClient};
use crate::gcp::operation::Operation;
use anyhow::{Context, Result};
use std::io::Write;

/// Fetch the most recent operation of a job. Returns `None` if the job has
/// not run yet.
pub async fn check_latest_transfer_operation(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    job_name: &str,
) -> Result<Option<Operation>> {
    let url = with_query(
        &client.storagetransfer_url(job_name),
        &[("projectId", project_id)],
    )?;
    let job: TransferJob = client
        .get_as(&url)
        .await
        .context("failed to get transfer job")?;

    let Some(op_name) = job.latest_operation_name.filter(|n| !n.is_empty()) else {
        writeln!(
            w,
            "Transfer job {} hasn't run yet, try again once the job starts running.",
            job_name
        )?;
        return Ok(None);
    };

    let op: Operation = client
        .get_as(&client.storagetransfer_url(&op_name))
        .await
        .context("failed to get transfer operation")?;

    let status = op
        .metadata
        .as_ref()
        .and_then(|m| m.get("status"))
        .and_then(|s| s.as_str())
        .unwrap_or("UNKNOWN");
    writeln!(
        w,
        "The latest operation for transfer job {} is: {} ({})",
        job_name, op.name, status
    )?;
    Ok(Some(op))
}
