//! Schema registry: create, inspect, revise and roll back schemas

use super::models::Schema;
use crate::gcp::client::{with_query, GcpClient};
use crate::gcp::pager::list_all_as;
use anyhow::{Context, Result};
use serde_json::json;
use std::io::Write;
use std::path::Path;

pub const AVRO: &str = "AVRO";
pub const PROTOCOL_BUFFER: &str = "PROTOCOL_BUFFER";

fn schema_path(project_id: &str, schema_id: &str) -> String {
    format!("projects/{}/schemas/{}", project_id, schema_id)
}

fn read_definition(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("error reading from file: {}", path.display()))
}

async fn create_schema(
    client: &GcpClient,
    project_id: &str,
    schema_id: &str,
    schema_type: &str,
    definition: String,
) -> Result<Schema> {
    let url = with_query(
        &client.pubsub_url(&format!("projects/{}/schemas", project_id)),
        &[("schemaId", schema_id)],
    )?;
    let body = json!({ "type": schema_type, "definition": definition });
    client
        .post_as(&url, Some(&body))
        .await
        .context("CreateSchema")
}

/// Create an Avro schema from a `.avsc` file
pub async fn create_avro_schema(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    schema_id: &str,
    avsc_file: &Path,
) -> Result<Schema> {
    let definition = read_definition(avsc_file)?;
    let schema = create_schema(client, project_id, schema_id, AVRO, definition).await?;

    writeln!(w, "Schema created: {}", schema.name)?;
    Ok(schema)
}

/// Create a protocol buffer schema from a `.proto` file
pub async fn create_proto_schema(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    schema_id: &str,
    proto_file: &Path,
) -> Result<Schema> {
    let definition = read_definition(proto_file)?;
    let schema = create_schema(client, project_id, schema_id, PROTOCOL_BUFFER, definition).await?;

    writeln!(w, "Schema created: {}", schema.name)?;
    Ok(schema)
}

/// Fetch a schema with its definition
pub async fn get_schema(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    schema_id: &str,
) -> Result<Schema> {
    let url = with_query(
        &client.pubsub_url(&schema_path(project_id, schema_id)),
        &[("view", "FULL")],
    )?;
    let schema: Schema = client.get_as(&url).await.context("Schema")?;

    writeln!(w, "Got schema: {}", schema.name)?;
    Ok(schema)
}

/// List every schema of a project
pub async fn list_schemas(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
) -> Result<Vec<Schema>> {
    let url = client.pubsub_url(&format!("projects/{}/schemas", project_id));
    let schemas: Vec<Schema> = list_all_as(client, &url, "schemas")
        .await
        .context("Schemas")?;

    writeln!(w, "Got {} schemas", schemas.len())?;
    for schema in &schemas {
        writeln!(w, "{}", schema.name)?;
    }
    Ok(schemas)
}

/// Delete a schema and all of its revisions
pub async fn delete_schema(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    schema_id: &str,
) -> Result<()> {
    client
        .delete(&client.pubsub_url(&schema_path(project_id, schema_id)))
        .await
        .context("DeleteSchema")?;

    writeln!(w, "Deleted schema: {}", schema_id)?;
    Ok(())
}

/// Commit a new revision of an Avro schema
pub async fn commit_avro_schema(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    schema_id: &str,
    avsc_file: &Path,
) -> Result<Schema> {
    let definition = read_definition(avsc_file)?;
    let body = json!({ "schema": { "type": AVRO, "definition": definition } });
    let url = client.pubsub_url(&format!("{}:commit", schema_path(project_id, schema_id)));
    let schema: Schema = client
        .post_as(&url, Some(&body))
        .await
        .context("CommitSchema")?;

    writeln!(
        w,
        "Committed a schema using an Avro schema: {}",
        schema.revision_id.as_deref().unwrap_or_default()
    )?;
    Ok(schema)
}

/// List the revisions of a schema, newest first
pub async fn list_schema_revisions(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    schema_id: &str,
) -> Result<Vec<Schema>> {
    let url = client.pubsub_url(&format!("{}:listRevisions", schema_path(project_id, schema_id)));
    let revisions: Vec<Schema> = list_all_as(client, &url, "schemas")
        .await
        .context("ListSchemaRevisions")?;

    writeln!(w, "Got {} schema revisions", revisions.len())?;
    for revision in &revisions {
        writeln!(
            w,
            "{}@{}",
            revision.name,
            revision.revision_id.as_deref().unwrap_or_default()
        )?;
    }
    Ok(revisions)
}

/// Create a new revision equal to `revision_id`
pub async fn rollback_schema(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    schema_id: &str,
    revision_id: &str,
) -> Result<Schema> {
    let url = client.pubsub_url(&format!("{}:rollback", schema_path(project_id, schema_id)));
    let schema: Schema = client
        .post_as(&url, Some(&json!({ "revisionId": revision_id })))
        .await
        .context("RollbackSchema")?;

    writeln!(w, "Rolled back a schema: {}", schema.name)?;
    Ok(schema)
}
