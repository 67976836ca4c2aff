//! HTTP client for the Test Ledger API.
//!
//! All ledger calls are single-attempt JSON requests authenticated with a
//! bearer token. Presigned uploads go straight to object storage and carry no
//! ledger credentials.

use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LedgerSettings;
use crate::error::{AppError, AppResult};
use crate::models::artifact::ArtifactDescriptor;
use crate::models::{Artifact, LedgerId, RunReport, RunResult, UploadTarget};

/// Ledger API routes, relative to the base URL.
pub mod routes {
    pub const RUNS: &str = "/runs";
    pub const PRESIGNED_UPLOAD: &str = "/artifacts/presigned-upload";
    pub const CONFIRM: &str = "/artifacts/confirm";
}

/// Body of `POST /artifacts/presigned-upload`.
#[derive(Debug, Serialize)]
struct PresignedUploadRequest<'a> {
    artifacts: Vec<ArtifactDescriptor<'a>>,
}

/// Response of `POST /artifacts/presigned-upload`.
#[derive(Debug, Deserialize)]
struct PresignedUploadResponse {
    #[serde(default)]
    uploads: Option<Vec<UploadTarget>>,
}

/// Body of `POST /artifacts/confirm`.
#[derive(Debug, Serialize)]
struct ConfirmRequest<'a> {
    artifact_ids: &'a [LedgerId],
}

/// Test Ledger API client.
#[derive(Clone)]
pub struct LedgerClient {
    http: reqwest::Client,
    api_url: String,
    api_token: SecretString,
}

impl std::fmt::Debug for LedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl LedgerClient {
    /// Create a client from settings. Requests use the transport's default timeouts.
    pub fn new(settings: &LedgerSettings) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("testledger-reporter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(LedgerClient {
            http,
            api_url: settings.api_url.clone(),
            api_token: settings.api_token.clone(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.api_url, route)
    }

    /// POST a JSON body and return the response once its status is checked.
    async fn post<B>(&self, route: &str, body: &B) -> AppResult<reqwest::Response>
    where
        B: Serialize + ?Sized,
    {
        debug!("POST {}", route);
        let response = self
            .http
            .post(self.url(route))
            .bearer_auth(self.api_token.expose_secret())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::LedgerStatus {
                route: route.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    async fn post_json<B, R>(&self, route: &str, body: &B) -> AppResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.post(route, body)
            .await?
            .json::<R>()
            .await
            .map_err(|e| AppError::InvalidResponse(format!("{}: {}", route, e)))
    }

    /// Submit a run report (`POST /runs`).
    pub async fn submit_run(&self, report: &RunReport) -> AppResult<RunResult> {
        self.post_json(routes::RUNS, report).await
    }

    /// Request one presigned upload target per artifact.
    ///
    /// A response without an `uploads` list yields an empty vector.
    pub async fn request_upload_targets(&self, artifacts: &[Artifact]) -> AppResult<Vec<UploadTarget>> {
        let body = PresignedUploadRequest {
            artifacts: artifacts.iter().map(Artifact::descriptor).collect(),
        };
        let response: PresignedUploadResponse =
            self.post_json(routes::PRESIGNED_UPLOAD, &body).await?;
        Ok(response.uploads.unwrap_or_default())
    }

    /// PUT raw bytes to a presigned object-storage URL.
    pub async fn put_object(&self, presigned_url: &str, data: Vec<u8>, mime_type: &str) -> AppResult<()> {
        let response = self
            .http
            .put(presigned_url)
            .header(CONTENT_TYPE, mime_type)
            .body(data)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::StorageStatus(status.as_u16()));
        }

        Ok(())
    }

    /// Mark transferred artifacts as uploaded (`POST /artifacts/confirm`).
    pub async fn confirm_uploads(&self, artifact_ids: &[LedgerId]) -> AppResult<()> {
        self.post(routes::CONFIRM, &ConfirmRequest { artifact_ids })
            .await
            .map(|_| ())
    }
}
