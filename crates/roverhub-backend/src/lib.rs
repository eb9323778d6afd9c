//! `roverhub-backend` – HTTP client for the planning/vision backend.
//!
//! The backend owns all of the heavy thinking (path search, image
//! recognition, mosaic stitching); this crate only moves JSON and image
//! bytes over HTTP. The coordination core depends on the [`Planner`]
//! trait so tests can substitute a scripted backend.
//!
//! Endpoints (see the backend's own documentation):
//!
//! | Call | Endpoint |
//! |---|---|
//! | [`Planner::request_path`] | `POST /path` |
//! | [`Planner::request_navigate`] | `POST /navigate` |
//! | [`Planner::recognize_image`] | `POST /image` (multipart) |
//! | [`Planner::request_stitch`] | `GET /stitch` |
//! | [`PlannerClient::check_alive`] | `GET /status` |

use async_trait::async_trait;
use roverhub_types::{Obstacle, Waypoint};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors from backend calls.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The HTTP request failed or returned a non-success status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The response body did not match the expected shape.
    #[error("unexpected response: {0}")]
    BadResponse(String),
}

/// A planned path: controller command tokens plus the pose after each
/// motion command. `path` includes the starting pose as its first element.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlanResponse {
    pub commands: Vec<String>,
    pub path: Vec<Waypoint>,
}

/// Image-recognition verdict for one frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Recognition {
    pub label: String,
    /// `true` when the recognized symbol means the run must end.
    #[serde(default)]
    pub stop: bool,
}

/// The backend surface the coordination core consumes.
#[async_trait]
pub trait Planner: Send + Sync {
    /// Plan a path visiting the submitted obstacles.
    async fn request_path(&self, obstacles: &[Obstacle]) -> Result<PlanResponse, BackendError>;

    /// Plan an arc around a single obstacle.
    async fn request_navigate(&self, obstacle: &Obstacle) -> Result<PlanResponse, BackendError>;

    /// Run image recognition on an encoded frame.
    async fn recognize_image(
        &self,
        image: Vec<u8>,
        filename: &str,
    ) -> Result<Recognition, BackendError>;

    /// Stitch all frames recognized so far into a mosaic.
    async fn request_stitch(&self) -> Result<(), BackendError>;
}

#[derive(Serialize)]
struct PathRequest<'a> {
    obstacles: &'a [Obstacle],
}

/// Reqwest-backed [`Planner`].
///
/// Construct once and reuse; the inner client pools connections.
pub struct PlannerClient {
    base_url: String,
    client: reqwest::Client,
}

impl PlannerClient {
    /// Create a client for `base_url` (e.g. `"http://192.168.2.10:5000"`)
    /// with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Http`] if the client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    /// `true` when `GET /status` answers with a success code.
    pub async fn check_alive(&self) -> bool {
        let url = format!("{}/status", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl Planner for PlannerClient {
    async fn request_path(&self, obstacles: &[Obstacle]) -> Result<PlanResponse, BackendError> {
        let url = format!("{}/path", self.base_url);
        let plan: PlanResponse = self
            .client
            .post(&url)
            .json(&PathRequest { obstacles })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(commands = plan.commands.len(), "path planned");
        Ok(plan)
    }

    async fn request_navigate(&self, obstacle: &Obstacle) -> Result<PlanResponse, BackendError> {
        let url = format!("{}/navigate", self.base_url);
        let plan: PlanResponse = self
            .client
            .post(&url)
            .json(obstacle)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(plan)
    }

    async fn recognize_image(
        &self,
        image: Vec<u8>,
        filename: &str,
    ) -> Result<Recognition, BackendError> {
        let url = format!("{}/image", self.base_url);
        let part = reqwest::multipart::Part::bytes(image)
            .file_name(filename.to_string())
            .mime_str("image/jpeg")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let recognition: Recognition = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(label = %recognition.label, stop = recognition.stop, "image recognized");
        Ok(recognition)
    }

    async fn request_stitch(&self) -> Result<(), BackendError> {
        let url = format!("{}/stitch", self.base_url);
        self.client
            .get(&url)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
