//! REST client for the console backend.
//!
//! [`ProjectBackend`] is the seam the project directory and the console write
//! path depend on; [`HttpBackend`] implements it over HTTP. Per-project
//! sub-resources are reached through [`ProjectResources`].

mod http;
mod resources;

pub use http::*;
pub use resources::*;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::ConsoleResult;
use crate::models::{CreateNetworkRequest, Network, Project};

/// Project endpoints of the backend REST API.
///
/// Records are passed through as the backend sends them; status codes are
/// not reinterpreted beyond what [`crate::errors::ConsoleError::from_response`] does.
#[async_trait]
pub trait ProjectBackend: Send + Sync + 'static {
    /// `GET /projects`
    async fn list_projects(&self) -> ConsoleResult<Vec<Project>>;

    /// `POST /projects`
    async fn create_project(&self, draft: &Project) -> ConsoleResult<Project>;

    /// `PUT /projects/{id}` with a full or partial record.
    async fn update_project(&self, resource_name: &str, body: &Value) -> ConsoleResult<Project>;

    /// `DELETE /projects/{id}`
    async fn delete_project(&self, resource_name: &str) -> ConsoleResult<()>;

    /// `POST /projects/{id}/defaultProject`
    async fn set_default_project(&self, resource_name: &str) -> ConsoleResult<Project>;

    /// `DELETE /projects/{id}/authorized`
    async fn revoke_authorization(&self, resource_name: &str) -> ConsoleResult<Project>;

    /// `POST /projects/{id}/authorized`; `false` when the backend answers 401.
    async fn verify_authorization(&self, resource_name: &str) -> ConsoleResult<bool>;

    /// `POST /projects/{id}/networks`
    async fn create_network(
        &self,
        resource_name: &str,
        request: &CreateNetworkRequest,
    ) -> ConsoleResult<Network>;
}
