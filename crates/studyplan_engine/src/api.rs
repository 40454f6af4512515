use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use serde::Deserialize;

use crate::normalize::normalize_plan;
use crate::types::{AnalysisOutcome, ApiError, FailureKind, JobId, PlanOutcome};

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Timeout for quick calls (upload, status).
    pub request_timeout: Duration,
    /// Timeout for the analysis and generation calls, which block on the
    /// backend's model pipeline and routinely take minutes.
    pub long_timeout: Duration,
    /// Upper bound on the exported PDF body.
    pub max_export_bytes: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            long_timeout: Duration::from_secs(600),
            max_export_bytes: 20 * 1024 * 1024,
        }
    }
}

/// The remote study-plan service, as the engine sees it.
///
/// One implementation talks HTTP; tests script their own.
#[async_trait::async_trait]
pub trait StudyApi: Send + Sync {
    /// Uploads a document; the returned id keys every later call.
    async fn upload(&self, source: &Path) -> Result<JobId, ApiError>;

    /// Runs the full analysis. Blocks until the backend finishes; progress
    /// arrives separately through status polling.
    async fn request_analysis(&self, job_id: &str) -> Result<AnalysisOutcome, ApiError>;

    /// One status probe; returns the raw phase tag.
    async fn fetch_status(&self, job_id: &str) -> Result<String, ApiError>;

    /// Generates a study plan and normalizes the response shape.
    async fn generate_plan(
        &self,
        job_id: &str,
        days: u32,
        language: &str,
    ) -> Result<PlanOutcome, ApiError>;

    /// Renders the edited plan text to a PDF and returns the bytes.
    async fn export_pdf(&self, job_id: &str, text: &str, days: u32) -> Result<Vec<u8>, ApiError>;
}

#[derive(Debug, Clone)]
pub struct HttpStudyApi {
    settings: ApiSettings,
    client: reqwest::Client,
    long_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct UploadWire {
    file_id: String,
}

#[derive(Debug, Deserialize)]
struct StatusWire {
    status: String,
}

// The backend wraps analysis findings in an `analysis` object; siblings
// such as `status` are ignored, and a response without the object is
// undecodable.
#[derive(Debug, Deserialize)]
struct AnalysisEnvelope {
    analysis: AnalysisWire,
}

#[derive(Debug, Deserialize)]
struct AnalysisWire {
    #[serde(default)]
    document_type: Option<String>,
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    main_topics: Vec<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    recommended_days: Option<u32>,
    #[serde(default, alias = "document_language")]
    language: Option<String>,
}

impl HttpStudyApi {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        let long_client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.long_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            settings,
            client,
            long_client,
        })
    }

    fn endpoint(&self, path: &str) -> Result<reqwest::Url, ApiError> {
        let base = self.settings.base_url.trim_end_matches('/');
        reqwest::Url::parse(&format!("{base}{path}"))
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))
    }
}

#[async_trait::async_trait]
impl StudyApi for HttpStudyApi {
    async fn upload(&self, source: &Path) -> Result<JobId, ApiError> {
        let bytes = tokio::fs::read(source)
            .await
            .map_err(|err| ApiError::new(FailureKind::File, err.to_string()))?;
        let file_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint("/upload/")?)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_status(response).await?;
        let wire: UploadWire = decode_json(response).await?;
        Ok(wire.file_id)
    }

    async fn request_analysis(&self, job_id: &str) -> Result<AnalysisOutcome, ApiError> {
        let mut url = self.endpoint("/analyze/")?;
        url.query_pairs_mut().append_pair("file_id", job_id);

        let response = self
            .long_client
            .post(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_status(response).await?;
        let envelope: AnalysisEnvelope = decode_json(response).await?;
        let wire = envelope.analysis;
        Ok(AnalysisOutcome {
            document_type: wire.document_type.unwrap_or_else(|| "document".to_string()),
            level: wire.level,
            topics: wire.main_topics,
            summary: wire.summary,
            recommended_days: wire.recommended_days,
            language: wire.language,
        })
    }

    async fn fetch_status(&self, job_id: &str) -> Result<String, ApiError> {
        let response = self
            .client
            .get(self.endpoint(&format!("/analyze/status/{job_id}"))?)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_status(response).await?;
        let wire: StatusWire = decode_json(response).await?;
        Ok(wire.status.trim().to_string())
    }

    async fn generate_plan(
        &self,
        job_id: &str,
        days: u32,
        language: &str,
    ) -> Result<PlanOutcome, ApiError> {
        let mut url = self.endpoint("/studyplan/study")?;
        url.query_pairs_mut()
            .append_pair("file_id", job_id)
            .append_pair("days", &days.to_string())
            .append_pair("lang", language);

        let response = self
            .long_client
            .post(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_status(response).await?;
        let raw: serde_json::Value = decode_json(response).await?;
        normalize_plan(&raw, days, language)
    }

    async fn export_pdf(&self, job_id: &str, text: &str, days: u32) -> Result<Vec<u8>, ApiError> {
        let mut url = self.endpoint(&format!("/plan/pdf/{job_id}"))?;
        url.query_pairs_mut().append_pair("days", &days.to_string());

        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_status(response).await?;

        let max_bytes = self.settings.max_export_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(ApiError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        // Rendered PDFs can run large; accumulate the body chunkwise and
        // bail as soon as the cap is crossed.
        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(ApiError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

/// Non-2xx responses become errors carrying the backend's body text, which
/// is where this service puts its human-readable detail.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status.to_string()
    } else {
        body
    };
    Err(ApiError::new(
        FailureKind::HttpStatus(status.as_u16()),
        message,
    ))
}

async fn decode_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let bytes = response.bytes().await.map_err(map_reqwest_error)?;
    serde_json::from_slice(&bytes).map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ApiError::new(FailureKind::Decode, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
