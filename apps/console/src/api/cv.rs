use serde_json::json;
use tracing::info;
use url::Url;

use super::{protocol_failure, Notice, ServiceClient};
use crate::errors::ClientError;
use crate::http::OutboundRequest;
use crate::models::cv::{CvFile, CvStatus, UploadPlan};
use crate::settings::Service;

/// Longest slice of a storage error body quoted back to the operator.
const STORAGE_ERROR_EXCERPT: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uploaded {
    pub object_key: Option<String>,
}

impl Notice for Uploaded {
    fn notice(&self) -> String {
        "Uploaded. Processing may take ~30-60s. Check status.".to_string()
    }
}

impl Notice for CvStatus {
    fn notice(&self) -> String {
        match (&self.cv_pdf_key, &self.keywords) {
            (None, _) => "No CV uploaded yet".to_string(),
            (Some(key), Some(keywords)) => format!("CV {key}: {} keywords extracted", keywords.len()),
            (Some(key), None) => format!("CV {key}: keywords not extracted yet"),
        }
    }
}

impl ServiceClient {
    /// POST {documents}/me/cv/presign
    pub async fn presign_cv(&self, file: &CvFile) -> Result<UploadPlan, ClientError> {
        let authorization = self.authorization()?;
        let _busy = self.busy.enter();
        let url = self.endpoint(Service::Documents, "/me/cv/presign")?;

        let response = self
            .http
            .send(
                OutboundRequest::post(url)
                    .accept_json()
                    .bearer(Some(authorization))
                    .json(json!({
                        "filename": file.filename,
                        "content_type": file.content_type,
                    })),
            )
            .await?;

        let body = response.json_or(json!({}));
        if !response.is_success() {
            return Err(protocol_failure(
                response.status,
                &body,
                "detail",
                "Failed to presign".to_string(),
            ));
        }
        UploadPlan::from_presign(&body).ok_or_else(|| {
            ClientError::protocol(
                response.status.as_u16(),
                "Presign response did not include an upload URL",
            )
        })
    }

    /// POST the file straight to storage using a presigned plan.
    /// The form is validated before anything is sent.
    pub async fn upload_to_storage(
        &self,
        plan: &UploadPlan,
        file: &CvFile,
    ) -> Result<Uploaded, ClientError> {
        let form = plan.build_form(file)?;
        let url = Url::parse(&plan.target_url).map_err(|e| ClientError::InvalidEndpoint {
            service: Service::Documents,
            base: plan.target_url.clone(),
            reason: e.to_string(),
        })?;
        let _busy = self.busy.enter();

        info!("Uploading {} ({} bytes) to storage", file.filename, file.bytes.len());
        let response = self
            .http
            .send(OutboundRequest::post(url).multipart(form))
            .await?;

        if !response.is_success() {
            let status = response.status.as_u16();
            let excerpt: String = response
                .text()
                .unwrap_or_default()
                .chars()
                .take(STORAGE_ERROR_EXCERPT)
                .collect();
            let message = if excerpt.is_empty() {
                format!("Storage upload failed: {status}")
            } else {
                format!("Storage upload failed: {status}: {excerpt}")
            };
            return Err(ClientError::protocol(status, message));
        }

        Ok(Uploaded {
            object_key: plan.object_key.clone(),
        })
    }

    /// Presign, then upload. Refuses locally when logged out.
    pub async fn presign_and_upload_cv(&self, file: &CvFile) -> Result<Uploaded, ClientError> {
        self.authorization()?;
        let _busy = self.busy.enter();
        let plan = self.presign_cv(file).await?;
        self.upload_to_storage(&plan, file).await
    }

    /// GET {documents}/me/cv
    pub async fn cv_status(&self) -> Result<CvStatus, ClientError> {
        let authorization = self.authorization()?;
        let _busy = self.busy.enter();
        let url = self.endpoint(Service::Documents, "/me/cv")?;

        let response = self
            .http
            .send(
                OutboundRequest::get(url)
                    .accept_json()
                    .bearer(Some(authorization)),
            )
            .await?;

        let body = response.json_or(json!({}));
        if !response.is_success() {
            return Err(protocol_failure(
                response.status,
                &body,
                "detail",
                "CV status failed".to_string(),
            ));
        }
        Ok(CvStatus::from_value(body))
    }
}
