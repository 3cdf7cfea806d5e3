use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::Form;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::constants::DEFAULT_UPLOAD_MIME;
use crate::media::{StagedUpload, UploadedFile};
use crate::types::{ObservedError, PrismError, Result};

/// Flat text fields from a JSON object, a url-encoded form, or a multipart form.
#[derive(Debug, Default, Clone)]
pub struct FormFields(pub HashMap<String, String>);

impl FormFields {
    /// The trimmed value, or None when missing or blank.
    pub fn non_empty(&self, key: &str) -> Option<String> {
        self.0
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

fn json_fields(value: Value) -> Result<HashMap<String, String>> {
    let map = match value {
        Value::Object(map) => map,
        Value::Null => return Ok(HashMap::new()),
        _ => {
            return Err(
                PrismError::InvalidIngress("Request body must be a JSON object".to_string()).into(),
            )
        }
    };
    Ok(map
        .into_iter()
        .filter_map(|(k, v)| match v {
            Value::String(s) => Some((k, s)),
            Value::Null => None,
            other => Some((k, other.to_string())),
        })
        .collect())
}

#[async_trait]
impl<S> FromRequest<S> for FormFields
where
    S: Send + Sync,
{
    type Rejection = ObservedError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| PrismError::InvalidIngress(e.body_text()))?;
            let mut fields = HashMap::new();
            while let Some(field) = multipart.next_field().await? {
                // File parts are ignored on text-only routes.
                if field.file_name().is_some() {
                    continue;
                }
                let name = match field.name() {
                    Some(n) => n.to_string(),
                    None => continue,
                };
                fields.insert(name, field.text().await?);
            }
            return Ok(Self(fields));
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| PrismError::InvalidIngress(e.body_text()))?;
            return Ok(Self(fields));
        }

        // Anything else is read as JSON; an empty body means no fields.
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| PrismError::InvalidIngress(e.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| PrismError::InvalidIngress(format!("Malformed JSON body: {}", e)))?;
        Ok(Self(json_fields(value)?))
    }
}

/// Where an uploaded file part ends up.
#[derive(Debug, Clone)]
pub enum UploadMode {
    Memory,
    /// Spooled to disk under the given directory.
    Staged(PathBuf),
}

#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub prompt: Option<String>,
}

/// Reads the named file part and the optional `prompt` field. Other fields are skipped.
pub async fn read_upload_form(
    mut multipart: Multipart,
    file_field: &str,
    mode: &UploadMode,
) -> Result<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == file_field {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let mime_type = field
                .content_type()
                .unwrap_or(DEFAULT_UPLOAD_MIME)
                .to_string();
            let file = match mode {
                UploadMode::Memory => UploadedFile::Memory {
                    file_name,
                    mime_type,
                    bytes: field.bytes().await?,
                },
                UploadMode::Staged(dir) => {
                    UploadedFile::Staged(StagedUpload::stage(dir, &file_name, &mime_type, field).await?)
                }
            };
            form.file = Some(file);
        } else if name == "prompt" {
            form.prompt = Some(field.text().await?);
        }
    }

    Ok(form)
}
