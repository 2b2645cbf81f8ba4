//! HTTP client for the remote composition job API.
//!
//! Jobs are created with `POST /v1/jobs` carrying both images as data URIs
//! and observed with `GET /v1/jobs/{id}`. Authentication uses a bearer
//! token.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::CompositionConfig;
use super::error::CompositionError;
use super::traits::CompositionApi;
use super::types::{CompositionJob, JobHandle};
use crate::media::ImageRef;
use crate::metrics::{EXTERNAL_SERVICE_DURATION, EXTERNAL_SERVICE_REQUESTS};

const SERVICE: &str = "composition";

/// Composition API client.
pub struct HttpCompositionApi {
    client: Client,
    base_url: String,
    api_token: String,
}

#[derive(Debug, Serialize)]
struct SubmitJobRequest {
    target_image: String,
    source_image: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RemoteStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

#[derive(Debug, Deserialize)]
struct JobResponse {
    id: String,
    status: RemoteStatus,
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl JobResponse {
    fn into_job(self) -> Result<CompositionJob, CompositionError> {
        match self.status {
            RemoteStatus::Starting | RemoteStatus::Processing => {
                Ok(CompositionJob::pending(self.id))
            }
            RemoteStatus::Succeeded => match self.output {
                Some(url) => Ok(CompositionJob::succeeded(self.id, ImageRef::Remote(url))),
                None => Err(CompositionError::Parse(format!(
                    "job {} succeeded without output",
                    self.id
                ))),
            },
            RemoteStatus::Failed => Ok(CompositionJob::failed(
                self.id,
                self.error.unwrap_or_else(|| "unknown error".to_string()),
            )),
            RemoteStatus::Canceled => Ok(CompositionJob::failed(self.id, "canceled")),
        }
    }
}

impl HttpCompositionApi {
    /// Create a new client. Fails when the URL or token is missing.
    pub fn new(config: &CompositionConfig) -> Result<Self, CompositionError> {
        if config.base_url.is_empty() {
            return Err(CompositionError::NotConfigured(
                "composition.base_url is required".to_string(),
            ));
        }
        let api_token = match config.api_token.as_deref() {
            Some(token) if !token.is_empty() => token.to_string(),
            _ => {
                return Err(CompositionError::NotConfigured(
                    "composition.api_token is required".to_string(),
                ))
            }
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }

    /// Encode an image reference for transport: local files become data URIs.
    async fn encode_image(image: &ImageRef) -> Result<String, CompositionError> {
        match image {
            ImageRef::Remote(url) => Ok(url.clone()),
            ImageRef::Local(path) => {
                let bytes = tokio::fs::read(path).await?;
                Ok(format!(
                    "data:{};base64,{}",
                    mime_for(path),
                    STANDARD.encode(bytes)
                ))
            }
        }
    }

    async fn check(response: Response) -> Result<Response, CompositionError> {
        let status = response.status();
        if status == 401 || status == 403 {
            return Err(CompositionError::NotConfigured(
                "composition API rejected the credential".to_string(),
            ));
        }
        if status == 429 {
            return Err(CompositionError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompositionError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(response)
    }

    fn record(operation: &str, started: Instant, ok: bool) {
        EXTERNAL_SERVICE_DURATION
            .with_label_values(&[SERVICE, operation])
            .observe(started.elapsed().as_secs_f64());
        EXTERNAL_SERVICE_REQUESTS
            .with_label_values(&[SERVICE, operation, if ok { "success" } else { "error" }])
            .inc();
    }

    async fn send_submit(
        &self,
        target: &ImageRef,
        source: &ImageRef,
    ) -> Result<JobHandle, CompositionError> {
        let body = SubmitJobRequest {
            target_image: Self::encode_image(target).await?,
            source_image: Self::encode_image(source).await?,
        };

        let response = self
            .client
            .post(format!("{}/v1/jobs", self.base_url))
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await?;

        let job: JobResponse = Self::check(response).await?.json().await.map_err(|e| {
            CompositionError::Parse(format!("Failed to parse submit response: {}", e))
        })?;

        debug!(job_id = %job.id, "Composition job submitted");
        Ok(JobHandle::new(job.id))
    }

    async fn send_status(&self, job_id: &str) -> Result<CompositionJob, CompositionError> {
        let response = self
            .client
            .get(format!("{}/v1/jobs/{}", self.base_url, job_id))
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        let job: JobResponse = Self::check(response).await?.json().await.map_err(|e| {
            CompositionError::Parse(format!("Failed to parse status response: {}", e))
        })?;

        job.into_job()
    }
}

#[async_trait]
impl CompositionApi for HttpCompositionApi {
    fn name(&self) -> &str {
        "http"
    }

    async fn submit(
        &self,
        target: &ImageRef,
        source: &ImageRef,
    ) -> Result<JobHandle, CompositionError> {
        let started = Instant::now();
        let result = self.send_submit(target, source).await;
        Self::record("submit", started, result.is_ok());
        result
    }

    async fn status(&self, job_id: &str) -> Result<CompositionJob, CompositionError> {
        let started = Instant::now();
        let result = self.send_status(job_id).await;
        Self::record("status", started, result.is_ok());
        result
    }

    async fn cancel(&self, job_id: &str) -> Result<(), CompositionError> {
        let started = Instant::now();
        let result = async {
            let response = self
                .client
                .post(format!("{}/v1/jobs/{}/cancel", self.base_url, job_id))
                .bearer_auth(&self.api_token)
                .send()
                .await?;
            Self::check(response).await.map(|_| ())
        }
        .await;
        Self::record("cancel", started, result.is_ok());
        result
    }

    async fn download(&self, result: &ImageRef, dest: &Path) -> Result<(), CompositionError> {
        let started = Instant::now();
        let outcome = async {
            match result {
                ImageRef::Local(path) => {
                    tokio::fs::copy(path, dest).await?;
                }
                ImageRef::Remote(url) => {
                    let response = self.client.get(url).send().await?;
                    let bytes = Self::check(response).await?.bytes().await?;
                    tokio::fs::write(dest, &bytes).await?;
                }
            }
            Ok(())
        }
        .await;
        Self::record("download", started, outcome.is_ok());
        outcome
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::JobStatus;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> CompositionConfig {
        CompositionConfig {
            base_url: base_url.to_string(),
            api_token: Some("test-token".to_string()),
            request_timeout_secs: 5,
        }
    }

    #[test]
    fn test_new_requires_token() {
        let err = HttpCompositionApi::new(&CompositionConfig {
            base_url: "http://localhost".to_string(),
            api_token: None,
            request_timeout_secs: 5,
        })
        .err()
        .unwrap();
        assert!(matches!(err, CompositionError::NotConfigured(_)));
    }

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(mime_for(Path::new("a.webp")), "image/webp");
        assert_eq!(mime_for(Path::new("a.png")), "image/png");
    }

    #[tokio::test]
    async fn test_submit_sends_data_uris_with_bearer() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("template.png");
        let source = dir.path().join("face.jpg");
        std::fs::write(&target, b"tpl").unwrap();
        std::fs::write(&source, b"face").unwrap();

        Mock::given(method("POST"))
            .and(path("/v1/jobs"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_partial_json(json!({
                "target_image": format!("data:image/png;base64,{}", STANDARD.encode(b"tpl")),
                "source_image": format!("data:image/jpeg;base64,{}", STANDARD.encode(b"face")),
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"id": "job-42", "status": "starting"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = HttpCompositionApi::new(&config(&server.uri())).unwrap();
        let handle = api
            .submit(&ImageRef::Local(target), &ImageRef::Local(source))
            .await
            .unwrap();
        assert_eq!(handle.id, "job-42");
    }

    #[tokio::test]
    async fn test_status_maps_remote_states() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/jobs/p"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "p", "status": "processing"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/jobs/s"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"id": "s", "status": "succeeded", "output": "https://cdn/x.png"}),
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/jobs/f"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"id": "f", "status": "failed", "error": "no face detected"}),
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/jobs/c"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "c", "status": "canceled"})),
            )
            .mount(&server)
            .await;

        let api = HttpCompositionApi::new(&config(&server.uri())).unwrap();

        assert_eq!(api.status("p").await.unwrap().status, JobStatus::Pending);

        let done = api.status("s").await.unwrap();
        assert_eq!(done.status, JobStatus::Succeeded);
        assert_eq!(
            done.result_ref,
            Some(ImageRef::Remote("https://cdn/x.png".to_string()))
        );

        let failed = api.status("f").await.unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("no face detected"));

        assert_eq!(api.status("c").await.unwrap().status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_succeeded_without_output_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/jobs/s"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "s", "status": "succeeded"})),
            )
            .mount(&server)
            .await;

        let api = HttpCompositionApi::new(&config(&server.uri())).unwrap();
        let err = api.status("s").await.unwrap_err();
        assert!(matches!(err, CompositionError::Parse(_)));
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/jobs/auth"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/jobs/busy"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/jobs/boom"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let api = HttpCompositionApi::new(&config(&server.uri())).unwrap();
        assert!(matches!(
            api.status("auth").await.unwrap_err(),
            CompositionError::NotConfigured(_)
        ));
        assert!(matches!(
            api.status("busy").await.unwrap_err(),
            CompositionError::RateLimited
        ));
        let err = api.status("boom").await.unwrap_err();
        assert!(matches!(err, CompositionError::Api { status: 502, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_download_remote_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/results/x.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png-bytes".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.png");
        let api = HttpCompositionApi::new(&config(&server.uri())).unwrap();
        api.download(
            &ImageRef::Remote(format!("{}/results/x.png", server.uri())),
            &dest,
        )
        .await
        .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"png-bytes");
    }

    #[tokio::test]
    async fn test_cancel_posts_to_job() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/jobs/job-9/cancel"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let api = HttpCompositionApi::new(&config(&server.uri())).unwrap();
        api.cancel("job-9").await.unwrap();
    }
}
