use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ClientError;
use crate::http::MultipartForm;

pub const DEFAULT_CV_CONTENT_TYPE: &str = "application/pdf";

/// Server-issued authorization for one direct-to-storage POST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPlan {
    pub target_url: String,
    /// Form fields in the order the storage service expects them. Names may repeat.
    pub form_fields: Vec<(String, String)>,
    /// Object key the upload will land under, when the documents service reports it.
    pub object_key: Option<String>,
}

impl UploadPlan {
    pub fn new(target_url: impl Into<String>, form_fields: Vec<(String, String)>) -> Self {
        Self {
            target_url: target_url.into(),
            form_fields,
            object_key: None,
        }
    }

    /// Reads `{url, fields, key}` from a presign response. `None` if there is no target URL.
    pub fn from_presign(body: &Value) -> Option<Self> {
        let target_url = body.get("url").and_then(Value::as_str)?.to_string();
        let form_fields = body
            .get("fields")
            .and_then(Value::as_object)
            .map(|fields| {
                fields
                    .iter()
                    .map(|(name, value)| {
                        let value = match value {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (name.clone(), value)
                    })
                    .collect()
            })
            .unwrap_or_default();
        Some(Self {
            target_url,
            form_fields,
            object_key: body.get("key").and_then(Value::as_str).map(String::from),
        })
    }

    /// Builds the storage form: plan fields, a `Content-Type` field if the plan
    /// lacks one, then the file under `file`. Fails unless exactly one `key` field results.
    pub fn build_form(&self, file: &CvFile) -> Result<MultipartForm, ClientError> {
        let mut form = self
            .form_fields
            .iter()
            .fold(MultipartForm::new(), |form, (name, value)| {
                form.text(name.clone(), value.clone())
            });
        if !form.contains("Content-Type") {
            form = form.text("Content-Type", file.content_type.clone());
        }
        form = form.file(
            "file",
            file.filename.clone(),
            file.content_type.clone(),
            file.bytes.clone(),
        );

        let found = form.count("key");
        if found != 1 {
            return Err(ClientError::InvalidUploadPlan { found });
        }
        Ok(form)
    }
}

/// A document picked for upload.
#[derive(Debug, Clone)]
pub struct CvFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl CvFile {
    pub fn new(filename: impl Into<String>, content_type: Option<&str>, bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type
                .filter(|ct| !ct.trim().is_empty())
                .unwrap_or(DEFAULT_CV_CONTENT_TYPE)
                .to_string(),
            bytes: bytes.into(),
        }
    }

    /// Loads a local file. Anything unreadable counts as "no file picked".
    pub async fn from_path(path: &Path) -> Result<Self, ClientError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ClientError::MissingFile(format!("{}: {e}", path.display())))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ClientError::MissingFile(path.display().to_string()))?;
        let content_type = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("pdf") => Some("application/pdf"),
            Some(ext) if ext.eq_ignore_ascii_case("docx") => {
                Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
            }
            Some(ext) if ext.eq_ignore_ascii_case("txt") => Some("text/plain"),
            _ => None,
        };
        Ok(Self::new(filename, content_type, bytes))
    }
}

/// Processing state of the operator's latest CV, as reported by the documents service.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CvStatus {
    pub cv_pdf_key: Option<String>,
    pub cv_keywords_key: Option<String>,
    pub keywords: Option<Vec<String>>,
    /// The full status object as received.
    pub raw: Value,
}

impl CvStatus {
    pub fn from_value(raw: Value) -> Self {
        let text = |field: &str| raw.get(field).and_then(Value::as_str).map(String::from);
        let keywords = raw.get("keywords").and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        });
        Self {
            cv_pdf_key: text("cv_pdf_key"),
            cv_keywords_key: text("cv_keywords_key"),
            keywords,
            raw,
        }
    }

    pub fn has_cv(&self) -> bool {
        self.cv_pdf_key.is_some()
    }
}
