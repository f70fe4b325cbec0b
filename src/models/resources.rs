//! Per-project sub-resources: users, networks, firewalls and the pass-through
//! compute / ad exchange records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ProjectRole;

/// A user attached to a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUser {
    pub id: String,
    pub resource_name: String,
    pub user_email: String,
    pub project_role: ProjectRole,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Request body for adding a user to a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddUserRequest {
    pub user_email: String,
    pub project_role: ProjectRole,
}

/// The single network a project's bidders and load balancers run in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub id: String,
    pub resource_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Request body for creating a project network.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNetworkRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_range: Option<String>,
}

/// Ports allowed by a firewall for one protocol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FirewallAllowed {
    pub ip_protocol: String,
    #[serde(default)]
    pub ports: Vec<String>,
}

/// A firewall rule on the project network.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Firewall {
    pub id: String,
    pub resource_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default)]
    pub source_ranges: Vec<String>,
    #[serde(default)]
    pub target_tags: Vec<String>,
    #[serde(default)]
    pub allowed: Vec<FirewallAllowed>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Role of a compute instance in the bidding setup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InstanceType {
    Balancer,
    Bidder,
}

/// Request body for starting an instance in a zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceRequest {
    pub instance_type: InstanceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_bidder_resource: Option<Value>,
}

/// Request body registering a zone's bidders with the ad exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneRegistration {
    pub id: String,
    pub host_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bid_request_qps: Option<u32>,
}

/// A backend record the console only displays.
///
/// Quotas, regions, zones, instances, machine types, images, reports, ad
/// exchange accounts and remarketing actions all share this shape: an
/// identifier plus whatever attributes the backend sends.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Resource {
    /// String attribute by wire name.
    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }
}

pub type Quota = Resource;
pub type Region = Resource;
pub type Zone = Resource;
pub type Instance = Resource;
pub type MachineType = Resource;
pub type Image = Resource;
pub type Report = Resource;
pub type Account = Resource;
pub type RemarketingAction = Resource;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_keeps_attributes() {
        let account: Account = serde_json::from_value(json!({
            "id": "/projects/3/accounts/99",
            "resourceName": "99",
            "cookieMatchUrl": "https://match.example.com",
            "bidderLocations": [{"url": "https://bid.example.com"}]
        }))
        .unwrap();

        assert_eq!(account.resource_name.as_deref(), Some("99"));
        assert_eq!(
            account.attribute_str("cookieMatchUrl"),
            Some("https://match.example.com")
        );
        assert!(account.attributes["bidderLocations"].is_array());
    }

    #[test]
    fn test_add_user_request_wire_format() {
        let body = serde_json::to_value(AddUserRequest {
            user_email: "ops@example.com".to_string(),
            project_role: ProjectRole::ReadWrite,
        })
        .unwrap();
        assert_eq!(
            body,
            json!({ "userEmail": "ops@example.com", "projectRole": "read_write" })
        );
    }

    #[test]
    fn test_create_instance_request_skips_unset() {
        let body = serde_json::to_value(CreateInstanceRequest {
            instance_type: InstanceType::Balancer,
            machine_type: Some("n1-standard-1".to_string()),
            image: None,
            zone: None,
            custom_bidder_resource: None,
        })
        .unwrap();
        assert_eq!(
            body,
            json!({ "instanceType": "balancer", "machineType": "n1-standard-1" })
        );
    }
}
