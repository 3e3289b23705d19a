//! Pagination
//!
//! Google list calls return one page at a time with a `nextPageToken`.
//! These helpers follow the token until the list is exhausted.

use super::client::{with_query, GcpClient};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

/// Result of a single page fetch
pub struct Page {
    pub items: Vec<Value>,
    pub next_token: Option<String>,
}

/// Fetch one page and pull the array stored under `items_field`
pub async fn fetch_page(
    client: &GcpClient,
    url: &str,
    items_field: &str,
    page_token: Option<&str>,
) -> Result<Page> {
    let url = match page_token {
        Some(token) => with_query(url, &[("pageToken", token)])?,
        None => url.to_string(),
    };

    let response = client.get(&url).await?;

    let items = response
        .get(items_field)
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    let next_token = response
        .get("nextPageToken")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());

    Ok(Page { items, next_token })
}

/// Fetch all items (auto-paginate)
pub async fn list_all(client: &GcpClient, url: &str, items_field: &str) -> Result<Vec<Value>> {
    let mut all_items = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let page = fetch_page(client, url, items_field, page_token.as_deref()).await?;
        all_items.extend(page.items);

        match page.next_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    tracing::debug!("Listed {} {} from {}", all_items.len(), items_field, url);
    Ok(all_items)
}

/// Fetch all items and deserialize each one into `T`
pub async fn list_all_as<T: DeserializeOwned>(
    client: &GcpClient,
    url: &str,
    items_field: &str,
) -> Result<Vec<T>> {
    list_all(client, url, items_field)
        .await?
        .into_iter()
        .map(|item| serde_json::from_value(item).context("Unexpected list item shape"))
        .collect()
}

/// Fetch a Compute Engine aggregated list, keyed by scope (`zones/us-central1-a`).
/// Scopes that only carry a `warning` (no resources) are dropped.
pub async fn list_aggregated(
    client: &GcpClient,
    url: &str,
    items_field: &str,
) -> Result<BTreeMap<String, Vec<Value>>> {
    let mut grouped: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    let mut page_token: Option<String> = None;

    loop {
        let url = match page_token.as_deref() {
            Some(token) => with_query(url, &[("pageToken", token)])?,
            None => url.to_string(),
        };
        let response = client.get(&url).await?;

        for (scope, items) in flatten_aggregated_response(&response, items_field) {
            grouped.entry(scope).or_default().extend(items);
        }

        match response
            .get("nextPageToken")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
        {
            Some(token) => page_token = Some(token.to_string()),
            None => break,
        }
    }

    Ok(grouped)
}

/// Aggregated responses have format:
/// `{ "items": { "zones/us-central1-a": { "instances": [...] }, ... } }`
fn flatten_aggregated_response(response: &Value, items_field: &str) -> Vec<(String, Vec<Value>)> {
    let Some(items) = response.get("items").and_then(|v| v.as_object()) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|(scope, scoped)| {
            let arr = scoped.get(items_field)?.as_array()?;
            if arr.is_empty() {
                return None;
            }
            Some((scope.clone(), arr.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_aggregated_skips_warnings() {
        let response = json!({
            "items": {
                "zones/us-central1-a": {"instances": [{"name": "a"}, {"name": "b"}]},
                "zones/us-east1-b": {"warning": {"code": "NO_RESULTS_ON_PAGE"}},
                "zones/europe-west1-c": {"instances": [{"name": "c"}]}
            }
        });

        let flattened = flatten_aggregated_response(&response, "instances");
        assert_eq!(flattened.len(), 2);
        let total: usize = flattened.iter().map(|(_, v)| v.len()).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_flatten_aggregated_handles_missing_items() {
        assert!(flatten_aggregated_response(&json!({}), "instances").is_empty());
    }
}
