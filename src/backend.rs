//! Backend transport — multipart upload and predict calls.
//!
//! Speaks the inference backends' two-endpoint contract:
//! `POST {base}/upload-model` and `POST {base}/predict`. Error bodies are
//! validated with serde at this boundary; when the server sends no usable
//! message we fall back to a status-class default (502 not ready, 504
//! timeout, otherwise generic).

use crate::summary::Detection;
use serde::Deserialize;

/// What can go wrong talking to a backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Could not reach the backend: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response. `message` is the server-supplied detail when one
    /// was present, else the categorized default for the status.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// 2xx response whose body was not the JSON we expect. Treated with
    /// the same severity as a transport failure.
    #[error("The backend sent a malformed response, try again shortly")]
    MalformedBody,
}

/// Successful `upload-model` body.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub model_id: String,
    #[serde(default)]
    pub model_format: Option<String>,
    #[serde(default)]
    pub class_names: Option<Vec<String>>,
}

/// Successful `predict` body.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictResponse {
    /// Annotated result image, base64-encoded by the backend.
    pub image: String,
    #[serde(default)]
    pub detections: Option<Vec<Detection>>,
}

/// Failure body shape shared by both endpoints. Both fields optional; some
/// backends use `detail` (FastAPI), others `message`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.detail.or(self.message).filter(|m| !m.is_empty())
    }
}

fn default_status_message(status: u16, operation: &str) -> String {
    match status {
        502 => "Backend is not ready yet, try again shortly".to_string(),
        504 => "Request timed out, the model may be large or the server busy".to_string(),
        _ => format!("{} failed (HTTP {})", operation, status),
    }
}

/// Thin wrapper around a shared `reqwest::Client`.
pub struct BackendClient {
    http: reqwest::Client,
}

impl Default for BackendClient {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Upload a model artifact to `{base}/upload-model`.
    pub async fn upload_model(
        &self,
        base: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadResponse, BackendError> {
        let start = std::time::Instant::now();
        log::info!("[UPLOAD] {} ({} bytes) -> {}", filename, bytes.len(), base);

        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(format!("{}/upload-model", base))
            .multipart(form)
            .send()
            .await?;

        let response = Self::check_status(response, "Upload").await?;
        let parsed: UploadResponse = response.json().await.map_err(|e| {
            log::warn!("[UPLOAD] Malformed success body: {}", e);
            BackendError::MalformedBody
        })?;

        log::info!(
            "[UPLOAD] Ready: model_id={} classes={} in {}ms",
            parsed.model_id,
            parsed.class_names.as_ref().map_or(0, |c| c.len()),
            start.elapsed().as_millis()
        );
        Ok(parsed)
    }

    /// Run inference on `{base}/predict` against a previously uploaded model.
    pub async fn predict(
        &self,
        base: &str,
        model_id: &str,
        image_filename: &str,
        image_bytes: Vec<u8>,
    ) -> Result<PredictResponse, BackendError> {
        let start = std::time::Instant::now();
        log::info!(
            "[PREDICT] model_id={} image={} ({} bytes) -> {}",
            model_id,
            image_filename,
            image_bytes.len(),
            base
        );

        let part =
            reqwest::multipart::Part::bytes(image_bytes).file_name(image_filename.to_string());
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model_id", model_id.to_string());

        let response = self
            .http
            .post(format!("{}/predict", base))
            .multipart(form)
            .send()
            .await?;

        let response = Self::check_status(response, "Inference").await?;
        let parsed: PredictResponse = response.json().await.map_err(|e| {
            log::warn!("[PREDICT] Malformed success body: {}", e);
            BackendError::MalformedBody
        })?;

        log::info!(
            "[PREDICT] {} detections in {}ms",
            parsed.detections.as_ref().map_or(0, |d| d.len()),
            start.elapsed().as_millis()
        );
        Ok(parsed)
    }

    /// Pass 2xx responses through; turn anything else into a
    /// `BackendError::Server` with the best available message.
    async fn check_status(
        response: reqwest::Response,
        operation: &str,
    ) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let status = status.as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .unwrap_or_default()
            .into_message()
            .unwrap_or_else(|| default_status_message(status, operation));

        log::error!("[{}] HTTP {}: {}", operation.to_uppercase(), status, message);
        Err(BackendError::Server { status, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_prefers_detail_over_message() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"detail": "model busy", "message": "other"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("model busy"));
    }

    #[test]
    fn error_body_falls_back_to_message() {
        let body: ErrorBody = serde_json::from_str(r#"{"message": "boom"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("boom"));
    }

    #[test]
    fn empty_or_invalid_error_body_yields_none() {
        let body: ErrorBody = serde_json::from_str("{}").unwrap();
        assert!(body.into_message().is_none());
        let body = serde_json::from_str::<ErrorBody>("not json").unwrap_or_default();
        assert!(body.into_message().is_none());
    }

    #[test]
    fn status_defaults_cover_gateway_errors() {
        assert!(default_status_message(502, "Upload").contains("not ready"));
        assert!(default_status_message(504, "Upload").contains("timed out"));
        assert_eq!(
            default_status_message(500, "Upload"),
            "Upload failed (HTTP 500)"
        );
    }

    #[test]
    fn upload_response_tolerates_missing_optional_fields() {
        let parsed: UploadResponse = serde_json::from_str(r#"{"model_id": "m1"}"#).unwrap();
        assert_eq!(parsed.model_id, "m1");
        assert!(parsed.model_format.is_none());
        assert!(parsed.class_names.is_none());
    }

    #[test]
    fn predict_response_parses_detections() {
        let raw = r#"{"image": "aGVsbG8=", "detections": [{"cls": 0, "conf": 0.9}]}"#;
        let parsed: PredictResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.image, "aGVsbG8=");
        assert_eq!(parsed.detections.unwrap().len(), 1);
    }
}
