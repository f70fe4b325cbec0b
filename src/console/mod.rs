//! Project write path: every mutation is confirmed by the backend first and
//! only then applied to the [`ProjectDirectory`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::client::{HttpBackend, ProjectBackend, ProjectResources};
use crate::config::Config;
use crate::directory::ProjectDirectory;
use crate::errors::{ConsoleError, ConsoleResult};
use crate::models::{CreateNetworkRequest, Project, ProjectUpdate};
use crate::notices::NoticeQueue;

pub struct ProjectConsole<B: ProjectBackend = HttpBackend> {
    backend: Arc<B>,
    directory: Arc<ProjectDirectory>,
    notices: Option<Arc<NoticeQueue>>,
    network_setup: Mutex<HashSet<String>>,
}

impl<B: ProjectBackend> ProjectConsole<B> {
    pub fn new(backend: Arc<B>, directory: Arc<ProjectDirectory>) -> Self {
        Self {
            backend,
            directory,
            notices: None,
            network_setup: Mutex::new(HashSet::new()),
        }
    }

    /// Report failures to `notices` before returning them.
    pub fn with_notices(mut self, notices: Arc<NoticeQueue>) -> Self {
        self.notices = Some(notices);
        self
    }

    pub fn directory(&self) -> &Arc<ProjectDirectory> {
        &self.directory
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn notices(&self) -> Option<&Arc<NoticeQueue>> {
        self.notices.as_ref()
    }

    fn reported<T>(&self, result: ConsoleResult<T>) -> ConsoleResult<T> {
        result.map_err(|err| {
            if let Some(notices) = &self.notices {
                notices.report(&err);
            }
            err
        })
    }

    /// Create the project and make it the cached default.
    pub async fn create(&self, draft: &Project) -> ConsoleResult<Project> {
        let created = self.reported(self.backend.create_project(draft).await)?;
        tracing::info!("Created project {}", created.resource_name);
        Ok(self.directory.insert(created))
    }

    /// Send the whole record or one attribute group, then cache the answer.
    pub async fn update(&self, project: &Project, kind: ProjectUpdate) -> ConsoleResult<Project> {
        let body = self.reported(kind.request_body(project))?;
        let updated = self.reported(
            self.backend
                .update_project(&project.resource_name, &body)
                .await,
        )?;
        tracing::info!("Updated project {} ({:?})", updated.resource_name, kind);
        Ok(self.directory.update(updated, kind.fields()))
    }

    pub async fn set_default(&self, project: &Project) -> ConsoleResult<Project> {
        let updated = self.reported(
            self.backend
                .set_default_project(&project.resource_name)
                .await,
        )?;
        Ok(self.directory.set_default(updated))
    }

    /// Delete the project; the removed value is handed back.
    pub async fn delete(&self, project: Project) -> ConsoleResult<Project> {
        self.reported(self.backend.delete_project(&project.resource_name).await)?;
        tracing::info!("Deleted project {}", project.resource_name);
        Ok(self.directory.remove(project))
    }

    pub async fn revoke_authorization(&self, project: &Project) -> ConsoleResult<Project> {
        let mut revoked = self.reported(
            self.backend
                .revoke_authorization(&project.resource_name)
                .await,
        )?;
        revoked.authorized = false;
        Ok(self.directory.update(revoked, None))
    }

    /// Whether the backend still holds valid OAuth tokens for the project.
    pub async fn verify_authorization(&self, project: &Project) -> ConsoleResult<bool> {
        self.reported(
            self.backend
                .verify_authorization(&project.resource_name)
                .await,
        )
    }

    /// Provision the project network and record it on the cached project.
    ///
    /// A project that already has a network, or whose setup is in progress,
    /// is returned as is without a request.
    pub async fn configure_network(
        &self,
        project: &Project,
        request: &CreateNetworkRequest,
    ) -> ConsoleResult<Project> {
        if project.has_network() || !self.begin_network_setup(&project.resource_name) {
            return Ok(project.clone());
        }

        let created = self
            .backend
            .create_network(&project.resource_name, request)
            .await;
        self.end_network_setup(&project.resource_name);
        let network = match self.reported(created) {
            Ok(network) => network,
            Err(err) => {
                self.directory.notify_changed();
                return Err(err);
            }
        };
        tracing::info!(
            "Configured network {} for project {}",
            network.resource_name,
            project.resource_name
        );

        let mut updated = match self.directory.get(&project.resource_name).await {
            Ok(cached) => cached,
            Err(ConsoleError::NotFound(_)) => project.clone(),
            Err(err) => {
                tracing::warn!("Using caller's copy of project {}: {}", project.resource_name, err);
                project.clone()
            }
        };
        updated.network = Some(network.id);
        Ok(self.directory.update(updated, None))
    }

    fn begin_network_setup(&self, resource_name: &str) -> bool {
        self.network_setup
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(resource_name.to_string())
    }

    fn end_network_setup(&self, resource_name: &str) {
        self.network_setup
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(resource_name);
    }
}

impl ProjectConsole<HttpBackend> {
    /// HTTP console whose directory starts loading right away.
    pub fn from_config(config: &Config) -> ConsoleResult<Self> {
        let backend = Arc::new(HttpBackend::from_config(config)?);
        let directory = Arc::new(ProjectDirectory::from_config(backend.clone(), config));
        Ok(Self::new(backend, directory))
    }

    pub fn resources(&self, project: &Project) -> ProjectResources {
        self.backend.resources(project)
    }
}
