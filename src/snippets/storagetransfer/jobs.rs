//! Transfer jobs: create-and-run for each source kind, run, delete

use super::models::{Schedule, TransferJob};
use crate::gcp::client::GcpClient;
use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::{json, Value};
use std::io::Write;

pub const AWS_ACCESS_KEY_ID_ENV: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";
pub const AZURE_SAS_TOKEN_ENV: &str = "AZURE_SAS_TOKEN";

/// 30 days
const NEARLINE_MIN_AGE: &str = "2592000s";

async fn create_job(client: &GcpClient, job: &Value) -> Result<TransferJob> {
    client
        .post_as(&client.storagetransfer_url("transferJobs"), Some(job))
        .await
        .context("failed to create transfer job")
}

async fn start_job(client: &GcpClient, project_id: &str, job_name: &str) -> Result<()> {
    let url = client.storagetransfer_url(&format!("{}:run", job_name));
    client
        .post(&url, Some(&json!({ "projectId": project_id })))
        .await
        .context("failed to run transfer job")?;
    Ok(())
}

/// Create an enabled job, run it right away and report
async fn create_and_run(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    job: Value,
    source: &str,
    sink: &str,
) -> Result<TransferJob> {
    let created = create_job(client, &job).await?;
    start_job(client, project_id, &created.name).await?;

    writeln!(
        w,
        "Created and ran transfer job from {} to {} with name {}",
        source, sink, created.name
    )?;
    Ok(created)
}

fn job_body(
    project_id: &str,
    description: &str,
    transfer_spec: Value,
    schedule: Option<Schedule>,
) -> Value {
    let mut job = json!({
        "projectId": project_id,
        "description": description,
        "transferSpec": transfer_spec,
        "status": "ENABLED",
    });
    if let Some(schedule) = schedule {
        job["schedule"] = json!(schedule);
    }
    job
}

/// Copy one GCS bucket into another
pub async fn quickstart(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    gcs_source_bucket: &str,
    gcs_sink_bucket: &str,
) -> Result<TransferJob> {
    let spec = json!({
        "gcsDataSource": { "bucketName": gcs_source_bucket },
        "gcsDataSink": { "bucketName": gcs_sink_bucket },
    });
    let job = job_body(project_id, "", spec, None);
    create_and_run(w, client, project_id, job, gcs_source_bucket, gcs_sink_bucket).await
}

/// Copy an S3 bucket into GCS once, today. Credentials come from the
/// standard AWS environment variables.
pub async fn transfer_from_aws(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    aws_source_bucket: &str,
    gcs_sink_bucket: &str,
) -> Result<TransferJob> {
    let access_key_id = std::env::var(AWS_ACCESS_KEY_ID_ENV).unwrap_or_default();
    let secret_access_key = std::env::var(AWS_SECRET_ACCESS_KEY_ENV).unwrap_or_default();

    let spec = json!({
        "awsS3DataSource": {
            "bucketName": aws_source_bucket,
            "awsAccessKey": {
                "accessKeyId": access_key_id,
                "secretAccessKey": secret_access_key,
            },
        },
        "gcsDataSink": { "bucketName": gcs_sink_bucket },
    });
    let job = job_body(
        project_id,
        "Transfers objects from an AWS bucket to a GCS bucket",
        spec,
        Some(Schedule::once(Utc::now())),
    );
    create_and_run(w, client, project_id, job, aws_source_bucket, gcs_sink_bucket).await
}

/// Copy an Azure Blob Storage container into GCS. The SAS token is read
/// from `AZURE_SAS_TOKEN`.
pub async fn transfer_from_azure(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    azure_storage_account: &str,
    azure_source_container: &str,
    gcs_sink_bucket: &str,
) -> Result<TransferJob> {
    let sas_token = std::env::var(AZURE_SAS_TOKEN_ENV).unwrap_or_default();

    let spec = json!({
        "azureBlobStorageDataSource": {
            "storageAccount": azure_storage_account,
            "azureCredentials": { "sasToken": sas_token },
            "container": azure_source_container,
        },
        "gcsDataSink": { "bucketName": gcs_sink_bucket },
    });
    let job = job_body(
        project_id,
        "Transfers objects from an Azure Blob Storage container to a GCS bucket",
        spec,
        Some(Schedule::once(Utc::now())),
    );
    create_and_run(w, client, project_id, job, azure_source_container, gcs_sink_bucket).await
}

/// Copy from an S3-compatible store through a transfer agent pool
#[allow(clippy::too_many_arguments)]
pub async fn transfer_from_s3_compatible(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    source_agent_pool_name: &str,
    source_bucket: &str,
    source_path: &str,
    gcs_sink_bucket: &str,
    gcs_path: &str,
) -> Result<TransferJob> {
    let spec = json!({
        "sourceAgentPoolName": source_agent_pool_name,
        "awsS3CompatibleDataSource": {
            "bucketName": source_bucket,
            "path": source_path,
            "endpoint": "us-east-1.example.com",
            "region": "us-east-1",
            "s3Metadata": {
                "authMethod": "AUTH_METHOD_AWS_SIGNATURE_V4",
                "requestModel": "REQUEST_MODEL_VIRTUAL_HOSTED_STYLE",
                "protocol": "NETWORK_PROTOCOL_HTTPS",
            },
        },
        "gcsDataSink": { "bucketName": gcs_sink_bucket, "path": gcs_path },
    });
    let job = job_body(project_id, "", spec, None);
    create_and_run(w, client, project_id, job, source_bucket, gcs_sink_bucket).await
}

/// Move objects older than 30 days into a Nearline bucket, daily
pub async fn transfer_to_nearline(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    gcs_source_bucket: &str,
    gcs_nearline_sink_bucket: &str,
) -> Result<TransferJob> {
    let spec = json!({
        "gcsDataSource": { "bucketName": gcs_source_bucket },
        "gcsDataSink": { "bucketName": gcs_nearline_sink_bucket },
        "objectConditions": { "minTimeElapsedSinceLastModification": NEARLINE_MIN_AGE },
        "transferOptions": {
            "deleteObjectsFromSourceAfterTransfer": true,
            "metadataOptions": { "storageClass": "STORAGE_CLASS_NEARLINE" },
        },
    });
    let job = job_body(
        project_id,
        "Create a transfer job that moves objects older than 30 days to Nearline",
        spec,
        Some(Schedule::daily(Utc::now())),
    );
    create_and_run(w, client, project_id, job, gcs_source_bucket, gcs_nearline_sink_bucket).await
}

/// Start a new run of an existing job (`transferJobs/...`)
pub async fn run_transfer_job(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    job_name: &str,
) -> Result<()> {
    start_job(client, project_id, job_name).await?;
    writeln!(w, "Ran transfer job {}", job_name)?;
    Ok(())
}

/// Mark a job DELETED; it stops running and is garbage collected later
pub async fn delete_transfer_job(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    job_name: &str,
) -> Result<TransferJob> {
    let body = json!({
        "projectId": project_id,
        "transferJob": { "name": job_name, "status": "DELETED" },
        "updateTransferJobFieldMask": "status",
    });
    let job: TransferJob = client
        .patch_as(&client.storagetransfer_url(job_name), &body)
        .await
        .context("failed to delete transfer job")?;

    writeln!(w, "Deleted transfer job {}", job.name)?;
    Ok(job)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_job_body_omits_missing_schedule() {
        let job = job_body("p", "d", json!({}), None);
        assert_eq!(job["status"], "ENABLED");
        assert!(job.get("schedule").is_none());
    }

    #[test]
    fn test_job_body_embeds_schedule() {
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let job = job_body("p", "d", json!({}), Some(Schedule::daily(now)));
        assert_eq!(job["schedule"]["scheduleStartDate"]["day"], 2);
        assert_eq!(job["schedule"]["startTimeOfDay"]["seconds"], 5);
    }
}
