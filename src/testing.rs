//! In-memory [`ProjectBackend`] for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::client::ProjectBackend;
use crate::errors::{ConsoleError, ConsoleResult};
use crate::models::{CreateNetworkRequest, Network, Project, ProjectRole};

pub fn project(name: &str) -> Project {
    Project {
        resource_name: name.to_string(),
        id: format!("/projects/{}", name),
        project_role: Some(ProjectRole::Owner),
        description: Some(format!("Project {}", name)),
        ..Default::default()
    }
}

#[derive(Default)]
pub struct FakeBackend {
    projects: Mutex<Vec<Project>>,
    fail_list: AtomicBool,
    list_calls: AtomicUsize,
    list_gate: Mutex<Option<oneshot::Receiver<()>>>,
    next_id: AtomicUsize,
}

impl FakeBackend {
    pub fn with_projects(names: &[&str]) -> Self {
        let backend = Self::default();
        backend.store().extend(names.iter().map(|n| project(n)));
        backend.next_id.store(100, Ordering::SeqCst);
        backend
    }

    fn store(&self) -> MutexGuard<'_, Vec<Project>> {
        self.projects.lock().unwrap()
    }

    pub fn stored(&self) -> Vec<Project> {
        self.store().clone()
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Hold the next `list_projects` call until the returned sender fires.
    pub fn hold_next_list(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.list_gate.lock().unwrap() = Some(rx);
        tx
    }

    fn not_found(resource_name: &str) -> ConsoleError {
        ConsoleError::NotFound(format!("Project {} not found", resource_name))
    }
}

#[async_trait]
impl ProjectBackend for FakeBackend {
    async fn list_projects(&self) -> ConsoleResult<Vec<Project>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.list_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(ConsoleError::Backend {
                status: 500,
                message: "list failed".to_string(),
                messages: vec!["Datastore unavailable".to_string()],
            });
        }
        Ok(self.stored())
    }

    async fn create_project(&self, draft: &Project) -> ConsoleResult<Project> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut created = draft.clone();
        created.resource_name = n.to_string();
        created.id = format!("/projects/{}", n);
        created.project_role = Some(ProjectRole::Owner);
        created.default_project = true;
        let mut store = self.store();
        for p in store.iter_mut() {
            p.default_project = false;
        }
        store.push(created.clone());
        Ok(created)
    }

    async fn update_project(&self, resource_name: &str, body: &Value) -> ConsoleResult<Project> {
        let mut store = self.store();
        let entry = store
            .iter_mut()
            .find(|p| p.resource_name == resource_name)
            .ok_or_else(|| Self::not_found(resource_name))?;
        let mut merged = serde_json::to_value(&*entry)?;
        if let (Value::Object(target), Value::Object(changes)) = (&mut merged, body) {
            for (key, value) in changes {
                target.insert(key.clone(), value.clone());
            }
        }
        *entry = serde_json::from_value(merged)?;
        Ok(entry.clone())
    }

    async fn delete_project(&self, resource_name: &str) -> ConsoleResult<()> {
        let mut store = self.store();
        let before = store.len();
        store.retain(|p| p.resource_name != resource_name);
        if store.len() == before {
            return Err(Self::not_found(resource_name));
        }
        Ok(())
    }

    async fn set_default_project(&self, resource_name: &str) -> ConsoleResult<Project> {
        let mut store = self.store();
        if !store.iter().any(|p| p.resource_name == resource_name) {
            return Err(Self::not_found(resource_name));
        }
        for p in store.iter_mut() {
            p.default_project = p.resource_name == resource_name;
        }
        store
            .iter()
            .find(|p| p.resource_name == resource_name)
            .cloned()
            .ok_or_else(|| Self::not_found(resource_name))
    }

    async fn revoke_authorization(&self, resource_name: &str) -> ConsoleResult<Project> {
        let mut store = self.store();
        let entry = store
            .iter_mut()
            .find(|p| p.resource_name == resource_name)
            .ok_or_else(|| Self::not_found(resource_name))?;
        entry.authorized = false;
        Ok(entry.clone())
    }

    async fn verify_authorization(&self, resource_name: &str) -> ConsoleResult<bool> {
        self.store()
            .iter()
            .find(|p| p.resource_name == resource_name)
            .map(|p| p.authorized)
            .ok_or_else(|| Self::not_found(resource_name))
    }

    async fn create_network(
        &self,
        resource_name: &str,
        request: &CreateNetworkRequest,
    ) -> ConsoleResult<Network> {
        let mut store = self.store();
        let entry = store
            .iter_mut()
            .find(|p| p.resource_name == resource_name)
            .ok_or_else(|| Self::not_found(resource_name))?;
        if entry.has_network() {
            return Err(ConsoleError::Backend {
                status: 409,
                message: "Network already configured".to_string(),
                messages: Vec::new(),
            });
        }
        let name = format!("network-{}", resource_name);
        let id = format!("/projects/{}/networks/{}", resource_name, name);
        entry.network = Some(id.clone());
        Ok(Network {
            id,
            resource_name: name,
            description: request.description.clone(),
            ipv4_range: request.ipv4_range.clone(),
            created_at: None,
            extra: Default::default(),
        })
    }
}
