//! In-memory directory of the projects visible to the current user.
//!
//! The directory holds one shared future of the latest snapshot. Readers clone
//! that future and all see the same `Arc`. Writers never touch an installed
//! snapshot: they build a new one, swap it in and publish it to subscribers
//! while holding the single writer lock.
//!
//! Futures are installed in call order and every write is chained on whatever
//! future is current. A write made while a reload is in flight is therefore
//! applied on top of the reload's result instead of being overwritten by it.

mod changes;

pub use changes::ProjectChanges;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{self, BoxFuture, FutureExt, Shared};
use tokio::runtime::Handle;
use tokio::sync::broadcast;

use crate::client::ProjectBackend;
use crate::config::Config;
use crate::errors::{ConsoleError, ConsoleResult};
use crate::models::{Project, ProjectFields};

/// Immutable project list as installed by one load or write.
pub type Snapshot = Arc<Vec<Project>>;

/// Pending or resolved snapshot, shared by every reader.
pub type SnapshotFuture = Shared<BoxFuture<'static, ConsoleResult<Snapshot>>>;

pub struct ProjectDirectory {
    backend: Arc<dyn ProjectBackend>,
    current: Mutex<SnapshotFuture>,
    changes: broadcast::Sender<Snapshot>,
}

impl ProjectDirectory {
    /// Empty directory; nothing is fetched until [`reload`](Self::reload).
    pub fn new(backend: Arc<dyn ProjectBackend>, change_buffer: usize) -> Self {
        let (changes, _) = broadcast::channel(change_buffer.max(1));
        Self {
            backend,
            current: Mutex::new(resolved(Arc::new(Vec::new()))),
            changes,
        }
    }

    /// Directory that starts loading the project list right away.
    pub fn connect(backend: Arc<dyn ProjectBackend>, change_buffer: usize) -> Self {
        let directory = Self::new(backend, change_buffer);
        directory.reload();
        directory
    }

    pub fn from_config(backend: Arc<dyn ProjectBackend>, config: &Config) -> Self {
        Self::connect(backend, config.change_buffer)
    }

    /// Fetch the full list from the backend and install it as the current snapshot.
    ///
    /// The returned future is installed before the fetch completes, so later
    /// reads and writes queue up behind it. A failed fetch becomes the current
    /// state until the next reload succeeds.
    pub fn reload(&self) -> SnapshotFuture {
        let backend = Arc::clone(&self.backend);
        let fetch = async move {
            let projects = backend.list_projects().await?;
            tracing::debug!("Loaded {} projects", projects.len());
            Ok(Arc::new(unique_by_name(projects)))
        }
        .boxed()
        .shared();

        *self.current() = fetch.clone();
        drive(fetch.clone());
        fetch
    }

    /// The installed snapshot future; never fetches.
    pub fn list(&self) -> SnapshotFuture {
        self.current().clone()
    }

    /// Look up one project in the latest snapshot.
    pub async fn get(&self, resource_name: &str) -> ConsoleResult<Project> {
        let snapshot = self.list().await?;
        snapshot
            .iter()
            .find(|p| p.resource_name == resource_name)
            .cloned()
            .ok_or_else(|| ConsoleError::NotFound(format!("Project {} not found", resource_name)))
    }

    /// Add a project and make it the default.
    ///
    /// An entry with the same resource name is replaced in place.
    pub fn insert(&self, mut project: Project) -> Project {
        project.default_project = true;
        let inserted = project.clone();
        self.apply("insert", move |projects| with_inserted(projects, inserted));
        project
    }

    /// Replace the cached entry, or merge only `fields` onto it.
    pub fn update(&self, project: Project, fields: Option<ProjectFields>) -> Project {
        let updated = project.clone();
        self.apply("update", move |projects| with_updated(projects, &updated, fields));
        project
    }

    /// Drop the project from the directory; the caller keeps its value.
    pub fn remove(&self, project: Project) -> Project {
        let resource_name = project.resource_name.clone();
        self.apply("remove", move |projects| without(projects, &resource_name));
        project
    }

    pub fn set_default(&self, project: Project) -> Project {
        let resource_name = project.resource_name.clone();
        self.apply("default", move |projects| with_default(projects, &resource_name));
        project
    }

    /// Publish the current entries again without changing them, so views
    /// can drop state they keep for an operation that did not complete.
    pub fn notify_changed(&self) {
        self.apply("refresh", |projects| projects.to_vec());
    }

    /// Subscribe to every snapshot installed by a write from now on.
    pub fn subscribe(&self) -> ProjectChanges {
        ProjectChanges::new(self.changes.subscribe())
    }

    fn current(&self) -> MutexGuard<'_, SnapshotFuture> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply<F>(&self, label: &'static str, edit: F)
    where
        F: FnOnce(&[Project]) -> Vec<Project> + Send + 'static,
    {
        let mut current = self.current();
        let settled = current.peek().cloned();
        match settled {
            Some(Ok(snapshot)) => {
                let next: Snapshot = Arc::new(edit(&snapshot));
                *current = resolved(Arc::clone(&next));
                publish(&self.changes, label, next);
            }
            Some(Err(err)) => {
                tracing::warn!("Skipping project {}, directory is not loaded: {}", label, err);
            }
            None => {
                let base = current.clone();
                let changes = self.changes.clone();
                let chained = async move {
                    let snapshot = base.await.map_err(|err| {
                        tracing::warn!("Skipping project {}, directory failed to load: {}", label, err);
                        err
                    })?;
                    let next: Snapshot = Arc::new(edit(&snapshot));
                    publish(&changes, label, Arc::clone(&next));
                    Ok(next)
                }
                .boxed()
                .shared();
                *current = chained.clone();
                drop(current);
                drive(chained);
            }
        }
    }
}

impl std::fmt::Debug for ProjectDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectDirectory")
            .field("subscribers", &self.changes.receiver_count())
            .finish_non_exhaustive()
    }
}

fn resolved(snapshot: Snapshot) -> SnapshotFuture {
    future::ready(Ok(snapshot)).boxed().shared()
}

fn publish(changes: &broadcast::Sender<Snapshot>, label: &str, snapshot: Snapshot) {
    tracing::debug!("Project {} installed {} entries", label, snapshot.len());
    // No subscribers is fine.
    let _ = changes.send(snapshot);
}

/// Poll the future to completion in the background when inside a runtime.
fn drive(future: SnapshotFuture) {
    if let Ok(handle) = Handle::try_current() {
        handle.spawn(async move {
            let _ = future.await;
        });
    }
}

fn unique_by_name(projects: Vec<Project>) -> Vec<Project> {
    let mut unique: Vec<Project> = Vec::with_capacity(projects.len());
    for project in projects {
        if unique.iter().any(|p| p.resource_name == project.resource_name) {
            tracing::warn!("Dropping duplicate project {}", project.resource_name);
            continue;
        }
        unique.push(project);
    }
    unique
}

fn with_inserted(projects: &[Project], inserted: Project) -> Vec<Project> {
    let mut next: Vec<Project> = projects.to_vec();
    match next.iter_mut().find(|p| p.resource_name == inserted.resource_name) {
        Some(existing) => *existing = inserted.clone(),
        None => next.push(inserted.clone()),
    }
    for p in next.iter_mut() {
        p.default_project = p.resource_name == inserted.resource_name;
    }
    next
}

fn with_updated(projects: &[Project], updated: &Project, fields: Option<ProjectFields>) -> Vec<Project> {
    let mut next: Vec<Project> = projects.to_vec();
    let mut became_default = false;
    if let Some(existing) = next.iter_mut().find(|p| p.resource_name == updated.resource_name) {
        match fields {
            Some(fields) => fields.copy(updated, existing),
            None => {
                *existing = updated.clone();
                became_default = updated.default_project;
            }
        }
    }
    if became_default {
        for p in next.iter_mut() {
            p.default_project = p.resource_name == updated.resource_name;
        }
    }
    next
}

fn without(projects: &[Project], resource_name: &str) -> Vec<Project> {
    projects
        .iter()
        .filter(|p| p.resource_name != resource_name)
        .cloned()
        .collect()
}

fn with_default(projects: &[Project], resource_name: &str) -> Vec<Project> {
    projects
        .iter()
        .map(|p| Project {
            default_project: p.resource_name == resource_name,
            ..p.clone()
        })
        .collect()
}
