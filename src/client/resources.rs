use serde::de::DeserializeOwned;
use serde_json::Value;

use super::HttpClient;
use crate::errors::{ConsoleError, ConsoleResult};
use crate::models::{
    Account, AddUserRequest, CreateInstanceRequest, Firewall, Image, Instance, MachineType,
    Network, Project, ProjectRole, ProjectUser, Quota, Region, RemarketingAction, Report, Zone,
    ZoneRegistration,
};

/// REST wrappers for the sub-resources of one project.
///
/// Compute resources only exist once the project network is configured.
/// Without one, list calls answer an empty list and single-item calls fail
/// with [`ConsoleError::NetworkNotConfigured`], without touching the backend.
#[derive(Clone, Debug)]
pub struct ProjectResources {
    http: HttpClient,
    resource_name: String,
    has_network: bool,
}

impl ProjectResources {
    pub fn new(http: HttpClient, project: &Project) -> Self {
        Self {
            http,
            resource_name: project.resource_name.clone(),
            has_network: project.has_network(),
        }
    }

    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    fn not_configured(&self) -> ConsoleError {
        ConsoleError::NetworkNotConfigured(format!(
            "Project {} has no network",
            self.resource_name
        ))
    }

    async fn get<T: DeserializeOwned>(&self, rest: &[&str]) -> ConsoleResult<T> {
        let segments = self.segments(rest);
        self.http.get_json(&segments).await
    }

    async fn gated_list<T: DeserializeOwned>(&self, rest: &[&str]) -> ConsoleResult<Vec<T>> {
        if !self.has_network {
            return Ok(Vec::new());
        }
        self.get(rest).await
    }

    async fn gated_get<T: DeserializeOwned>(&self, rest: &[&str]) -> ConsoleResult<T> {
        if !self.has_network {
            return Err(self.not_configured());
        }
        self.get(rest).await
    }

    fn segments<'a>(&'a self, rest: &[&'a str]) -> Vec<&'a str> {
        let mut segments = Vec::with_capacity(rest.len() + 2);
        segments.push("projects");
        segments.push(self.resource_name.as_str());
        segments.extend_from_slice(rest);
        segments
    }

    // Always available

    pub async fn users(&self) -> ConsoleResult<Vec<ProjectUser>> {
        self.get(&["users"]).await
    }

    pub async fn add_user(&self, user_email: &str, project_role: ProjectRole) -> ConsoleResult<ProjectUser> {
        let request = AddUserRequest {
            user_email: user_email.to_string(),
            project_role,
        };
        self.http.post_json(&self.segments(&["users"]), &request).await
    }

    pub async fn reports(&self) -> ConsoleResult<Vec<Report>> {
        self.get(&["reports"]).await
    }

    pub async fn accounts(&self) -> ConsoleResult<Vec<Account>> {
        self.get(&["accounts"]).await
    }

    pub async fn upload_preferred_deals(&self) -> ConsoleResult<()> {
        self.http
            .post_no_content(&self.segments(&["preferredDeals", "upload"]))
            .await
    }

    pub async fn remarketing_actions(&self) -> ConsoleResult<Vec<RemarketingAction>> {
        self.get(&["remarketing", "actions"]).await
    }

    pub async fn add_remarketing_action(&self, action: &Value) -> ConsoleResult<RemarketingAction> {
        self.http
            .post_json(&self.segments(&["remarketing", "actions"]), action)
            .await
    }

    pub async fn update_remarketing_action(
        &self,
        action_id: &str,
        action: &Value,
    ) -> ConsoleResult<RemarketingAction> {
        self.http
            .put_json(&self.segments(&["remarketing", "actions", action_id]), action)
            .await
    }

    pub async fn delete_remarketing_action(&self, action_id: &str) -> ConsoleResult<()> {
        self.http
            .delete(&self.segments(&["remarketing", "actions", action_id]))
            .await
    }

    // Network gated

    pub async fn quotas(&self) -> ConsoleResult<Vec<Quota>> {
        self.gated_list(&["quotas"]).await
    }

    pub async fn regions(&self) -> ConsoleResult<Vec<Region>> {
        self.gated_list(&["regions"]).await
    }

    pub async fn networks(&self) -> ConsoleResult<Vec<Network>> {
        self.gated_list(&["networks"]).await
    }

    pub async fn firewalls(&self) -> ConsoleResult<Vec<Firewall>> {
        self.gated_list(&["firewalls"]).await
    }

    pub async fn zones(&self) -> ConsoleResult<Vec<Zone>> {
        self.gated_list(&["zones"]).await
    }

    pub async fn zone(&self, zone_id: &str) -> ConsoleResult<Zone> {
        self.gated_get(&["zones", zone_id]).await
    }

    pub async fn register_zone(&self, zone_id: &str, registration: &ZoneRegistration) -> ConsoleResult<()> {
        if !self.has_network {
            return Err(self.not_configured());
        }
        let segments = self.segments(&["zones", zone_id, "register"]);
        let _: Value = self.http.post_json(&segments, registration).await?;
        Ok(())
    }

    pub async fn unregister_zone(&self, zone_id: &str) -> ConsoleResult<Zone> {
        if !self.has_network {
            return Err(self.not_configured());
        }
        self.http
            .delete_json(&self.segments(&["zones", zone_id, "register"]))
            .await
    }

    pub async fn instances(&self, zone_id: &str) -> ConsoleResult<Vec<Instance>> {
        self.gated_list(&["zones", zone_id, "instances"]).await
    }

    pub async fn instance(&self, zone_id: &str, instance_id: &str) -> ConsoleResult<Instance> {
        self.gated_get(&["zones", zone_id, "instances", instance_id]).await
    }

    pub async fn create_instance(
        &self,
        zone_id: &str,
        request: &CreateInstanceRequest,
    ) -> ConsoleResult<Instance> {
        if !self.has_network {
            return Err(self.not_configured());
        }
        self.http
            .post_json(&self.segments(&["zones", zone_id, "instances"]), request)
            .await
    }

    pub async fn machine_types(&self, zone_id: &str) -> ConsoleResult<Vec<MachineType>> {
        self.gated_list(&["zones", zone_id, "machinetypes"]).await
    }

    /// Default and custom images together, defaults first.
    pub async fn images(&self) -> ConsoleResult<Vec<Image>> {
        if !self.has_network {
            return Ok(Vec::new());
        }
        let (mut defaults, custom): (Vec<Image>, Vec<Image>) =
            futures::try_join!(self.get(&["defaultimages"]), self.get(&["customimages"]))?;
        defaults.extend(custom);
        Ok(defaults)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    // Nothing listens here; gated calls must answer without connecting.
    const UNREACHABLE: &str = "http://127.0.0.1:9";

    fn resources(network: Option<&str>) -> ProjectResources {
        let http = HttpClient::new(UNREACHABLE, None, Duration::from_millis(200)).unwrap();
        let project = Project {
            resource_name: "5".to_string(),
            network: network.map(str::to_string),
            ..Default::default()
        };
        ProjectResources::new(http, &project)
    }

    #[tokio::test]
    async fn test_gated_lists_are_empty_without_network() {
        let resources = resources(None);
        assert!(resources.quotas().await.unwrap().is_empty());
        assert!(resources.regions().await.unwrap().is_empty());
        assert!(resources.networks().await.unwrap().is_empty());
        assert!(resources.firewalls().await.unwrap().is_empty());
        assert!(resources.zones().await.unwrap().is_empty());
        assert!(resources.instances("us-central1-a").await.unwrap().is_empty());
        assert!(resources.machine_types("us-central1-a").await.unwrap().is_empty());
        assert!(resources.images().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_gated_items_fail_without_network() {
        let resources = resources(Some(""));
        assert!(matches!(
            resources.zone("us-central1-a").await,
            Err(ConsoleError::NetworkNotConfigured(_))
        ));
        assert!(matches!(
            resources.instance("us-central1-a", "bidder-1").await,
            Err(ConsoleError::NetworkNotConfigured(_))
        ));
        assert!(matches!(
            resources.unregister_zone("us-central1-a").await,
            Err(ConsoleError::NetworkNotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_ungated_calls_reach_backend() {
        let resources = resources(None);
        assert!(matches!(
            resources.users().await,
            Err(ConsoleError::Transport(_))
        ));
    }

    #[test]
    fn test_segments_are_rooted_at_project() {
        let resources = resources(Some("network-1"));
        assert_eq!(
            resources.segments(&["zones", "z 1", "instances"]),
            vec!["projects", "5", "zones", "z 1", "instances"]
        );
    }
}
