//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process router
//! backed by the core test harness, enabling API testing without a
//! composition service, a screen or a database file.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use luckyticket_core::quota::{QuotaGate, QuotaPolicy};
use luckyticket_core::Config;
use luckyticket_server::{api::create_router, AppState};

/// Re-export fixtures for test convenience
pub use luckyticket_core::testing::{fixtures, Harness};

/// Test fixture for API testing with mock dependencies.
///
/// Provides an in-process router whose pipeline runs on the core
/// [`Harness`]: mock composition API, mock presenter and capture,
/// in-memory profile store and a fixed clock.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_generate() {
///     let fixture = TestFixture::new();
///     let photo = fixture.photo("face.png");
///
///     fixture.post("/api/v1/users/alice/media", json!({ "path": photo })).await;
///     let response = fixture.post("/api/v1/users/alice/tickets/generate", json!({})).await;
///
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Test doubles behind the pipeline
    pub harness: Harness,
    /// Temporary directory for photos and rendered tickets
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub bytes: Vec<u8>,
}

impl TestFixture {
    /// Create a new test fixture with default settings.
    pub fn new() -> Self {
        Self::with_config(TestConfig::default())
    }

    /// Create a test fixture with custom configuration.
    pub fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut harness = Harness::new(temp_dir.path());

        let mut config = Config::default();
        config.database.path = temp_dir.path().join("unused.db");
        config.storage.data_dir = temp_dir.path().to_path_buf();
        config.media.camera_enabled = test_config.camera_enabled;
        config.media.upload_dir = temp_dir.path().join("uploads");
        std::fs::create_dir_all(&config.media.upload_dir).expect("Failed to create upload dir");
        if test_config.enforce_quota {
            config.quota = QuotaPolicy::enforced();
            harness.services.gate = QuotaGate::new(config.quota.clone());
        }

        let state = Arc::new(AppState::new(config, harness.services.clone()));
        let router = create_router(state);

        Self {
            router,
            harness,
            temp_dir,
        }
    }

    /// Directory media selections are confined to.
    pub fn upload_dir(&self) -> PathBuf {
        self.temp_dir.path().join("uploads")
    }

    /// Write a PNG photo into the upload directory and return its path.
    pub fn photo(&self, name: &str) -> PathBuf {
        fixtures::write_png(&self.upload_dir().join(name), 120, 90)
            .expect("Failed to write photo")
    }

    /// Select a fresh photo for `user_id`.
    pub async fn select_photo(&self, user_id: &str) -> TestResponse {
        let photo = self.photo(&format!("{}.png", user_id));
        self.post(
            &format!("/api/v1/users/{}/media", user_id),
            serde_json::json!({ "path": photo }),
        )
        .await
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        let body: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
            bytes,
        }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Enforce the daily quota (free 1, premium 3)
    pub enforce_quota: bool,
    /// Allow the camera origin
    pub camera_enabled: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            enforce_quota: false,
            camera_enabled: true,
        }
    }
}

impl TestConfig {
    /// Create config with the quota enforced.
    pub fn with_quota() -> Self {
        Self {
            enforce_quota: true,
            ..Self::default()
        }
    }

    /// Create config for a host without a camera.
    pub fn without_camera() -> Self {
        Self {
            camera_enabled: false,
            ..Self::default()
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
