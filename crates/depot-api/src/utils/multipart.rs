//! Multipart form parsing for `POST /uploads`.

use axum::extract::Multipart;
use bytes::Bytes;
use depot_core::models::{Caller, UploadPurpose, UploadRequest, UploadSource};
use depot_core::AppError;

/// Fields of an upload form, before they become an `UploadRequest`.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<(String, Bytes)>,
    pub url: Option<String>,
    pub purpose: Option<String>,
    pub retain_hours: Option<String>,
    pub for_private_message: bool,
    pub for_site_setting: bool,
}

impl UploadForm {
    /// Read every field. Only one field named `file` is accepted.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
        {
            let name = field.name().map(|s| s.to_string()).unwrap_or_default();

            if name == "file" {
                if form.file.is_some() {
                    return Err(AppError::InvalidInput(
                        "Multiple file fields are not allowed; send exactly one field named 'file'"
                            .to_string(),
                    ));
                }
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read file data: {}", e))
                })?;
                form.file = Some((filename, data));
                continue;
            }

            let value = field.text().await.map_err(|e| {
                AppError::InvalidInput(format!("Failed to read field '{}': {}", name, e))
            })?;
            let value = value.trim().to_string();

            match name.as_str() {
                "url" => form.url = Some(value).filter(|v| !v.is_empty()),
                "type" | "upload_type" => form.purpose = Some(value),
                "retain_hours" => form.retain_hours = Some(value).filter(|v| !v.is_empty()),
                "for_private_message" => form.for_private_message = is_truthy(&value),
                "for_site_setting" => form.for_site_setting = is_truthy(&value),
                other => tracing::debug!(field = %other, "Ignoring unknown upload form field"),
            }
        }

        Ok(form)
    }

    /// Build the pipeline request. A file takes precedence over a URL.
    pub fn into_request(self, caller: Caller) -> Result<UploadRequest, AppError> {
        let purpose = self
            .purpose
            .as_deref()
            .unwrap_or_default()
            .parse::<UploadPurpose>()
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        let retain_hours = self
            .retain_hours
            .map(|value| {
                value.parse::<i32>().map_err(|_| {
                    AppError::InvalidInput(format!("retain_hours must be an integer: {}", value))
                })
            })
            .transpose()?;

        let source = match (self.file, self.url) {
            (Some((filename, data)), _) => Some(UploadSource::Bytes { filename, data }),
            (None, Some(url)) => Some(UploadSource::Url(url)),
            (None, None) => None,
        };

        Ok(UploadRequest::new(source, purpose, caller)
            .for_private_message(self.for_private_message)
            .for_site_setting(self.for_site_setting)
            .with_retain_hours(retain_hours))
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
