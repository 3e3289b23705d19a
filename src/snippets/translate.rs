//! Cloud Translation (v3, global location)

use crate::gcp::client::{with_query, GcpClient};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;
use std::io::Write;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    #[serde(default)]
    pub translated_text: String,
    #[serde(default)]
    pub detected_language_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedLanguage {
    pub language_code: String,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedLanguage {
    pub language_code: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub support_source: bool,
    #[serde(default)]
    pub support_target: bool,
}

#[derive(Debug, Default, Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Debug, Default, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    languages: Vec<DetectedLanguage>,
}

#[derive(Debug, Default, Deserialize)]
struct SupportedLanguagesResponse {
    #[serde(default)]
    languages: Vec<SupportedLanguage>,
}

fn global_parent(project_id: &str) -> String {
    format!("projects/{}/locations/global", project_id)
}

/// Translate `text` into `target_language`; the source language is
/// detected when `source_language` is empty.
pub async fn translate_text(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    source_language: &str,
    target_language: &str,
    text: &str,
) -> Result<Vec<Translation>> {
    let mut body = json!({
        "contents": [text],
        "mimeType": "text/plain",
        "targetLanguageCode": target_language,
    });
    if !source_language.is_empty() {
        body["sourceLanguageCode"] = json!(source_language);
    }

    let url = client.translate_url(&format!("{}:translateText", global_parent(project_id)));
    let response: TranslateResponse = client
        .post_as(&url, Some(&body))
        .await
        .context("TranslateText")?;

    for translation in &response.translations {
        writeln!(w, "Translated text: {}", translation.translated_text)?;
    }
    Ok(response.translations)
}

/// Detect the language of `text`, most likely first
pub async fn detect_language(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    text: &str,
) -> Result<Vec<DetectedLanguage>> {
    let url = client.translate_url(&format!("{}:detectLanguage", global_parent(project_id)));
    let body = json!({ "content": text, "mimeType": "text/plain" });
    let response: DetectResponse = client
        .post_as(&url, Some(&body))
        .await
        .context("DetectLanguage")?;

    for language in &response.languages {
        writeln!(w, "Language code: {}", language.language_code)?;
        writeln!(w, "Confidence: {}", language.confidence)?;
    }
    Ok(response.languages)
}

/// Languages the service supports, with names in `display_language`
pub async fn list_supported_languages(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    display_language: &str,
) -> Result<Vec<SupportedLanguage>> {
    let url = with_query(
        &client.translate_url(&format!("{}/supportedLanguages", global_parent(project_id))),
        &[("displayLanguageCode", display_language)],
    )?;
    let response: SupportedLanguagesResponse = client
        .get_as(&url)
        .await
        .context("GetSupportedLanguages")?;

    writeln!(w, "Supported languages:")?;
    for language in &response.languages {
        writeln!(
            w,
            "{} ({})",
            language.language_code,
            language.display_name.as_deref().unwrap_or_default()
        )?;
    }
    Ok(response.languages)
}
