//! Project model and the statically declared partial-update field groups.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{ConsoleError, ConsoleResult};

/// Base URL for links to report objects in cloud storage.
const STORAGE_BROWSER_URL: &str = "https://storage.cloud.google.com/";

/// Access level of the current user on a project.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
    Owner,
    ReadWrite,
    Read,
}

impl ProjectRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Owner => "owner",
            ProjectRole::ReadWrite => "read_write",
            ProjectRole::Read => "read",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(ProjectRole::Owner),
            "read_write" => Some(ProjectRole::ReadWrite),
            "read" => Some(ProjectRole::Read),
            _ => None,
        }
    }

    pub fn is_owner(&self) -> bool {
        matches!(self, ProjectRole::Owner)
    }

    pub fn is_writable(&self) -> bool {
        matches!(self, ProjectRole::Owner | ProjectRole::ReadWrite)
    }
}

/// Ad exchange keys and the bucket DoubleClick delivers reports to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DoubleClickSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub double_click_reporting_bucket: Option<String>,
}

/// A tenant workspace grouping network, compute and ad exchange configuration.
///
/// Attributes the console does not know about are kept in `extra` so a record
/// read from the backend can be written back without losing anything.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_role: Option<ProjectRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default)]
    pub default_project: bool,
    #[serde(default)]
    pub authorized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_project_authorized: Option<bool>,

    // General config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth2_client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth2_client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_project_number: Option<i64>,

    // Ad exchange
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_exchange_buyer_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub double_click_project_resource: Option<DoubleClickSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_match_nid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_match_url: Option<String>,

    // Load balancer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancer_oauth2_scopes: Option<Vec<String>>,

    // Bidder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_dist_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_parameters: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_parameters: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bidder_oauth2_scopes: Option<Vec<String>>,

    // Interceptors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid_interceptors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impression_interceptors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click_interceptors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_interceptors: Option<Vec<String>>,

    // Preferred deals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub double_click_preferred_deals_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auction_type: Option<i32>,

    // Infrastructure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub white_listed_ip_ranges: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bidder_request_port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bidder_admin_port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancer_request_port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancer_stat_port: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Project {
    pub fn is_owner(&self) -> bool {
        self.project_role.is_some_and(|r| r.is_owner())
    }

    pub fn is_writable(&self) -> bool {
        self.project_role.is_some_and(|r| r.is_writable())
    }

    /// Whether the network and firewalls have been provisioned.
    pub fn has_network(&self) -> bool {
        self.network.as_deref().is_some_and(|n| !n.is_empty())
    }

    /// Whether enough OAuth settings are present to start the authorization flow.
    pub fn can_authorize(&self) -> bool {
        [
            &self.api_project_id,
            &self.oauth2_client_id,
            &self.oauth2_client_secret,
        ]
        .iter()
        .all(|v| v.as_deref().is_some_and(|s| !s.is_empty()))
    }

    /// Browser link to a report object, or `None` when either part is empty.
    pub fn report_link(&self, bucket_name: &str, report_name: &str) -> Option<String> {
        if bucket_name.is_empty() || report_name.is_empty() {
            return None;
        }
        let mut url = Url::parse(STORAGE_BROWSER_URL).ok()?;
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .push(bucket_name)
            .push(report_name);
        Some(url.to_string())
    }
}

/// A group of project attributes that can be updated on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectFields {
    Config,
    DoubleClick,
    LoadBalancer,
    Bidder,
    Interceptors,
    Reporting,
    PreferredDeals,
}

impl ProjectFields {
    pub const ALL: [ProjectFields; 7] = [
        ProjectFields::Config,
        ProjectFields::DoubleClick,
        ProjectFields::LoadBalancer,
        ProjectFields::Bidder,
        ProjectFields::Interceptors,
        ProjectFields::Reporting,
        ProjectFields::PreferredDeals,
    ];

    /// Wire names of the attributes in this group.
    pub fn keys(self) -> &'static [&'static str] {
        match self {
            ProjectFields::Config => &["description", "oauth2ClientSecret", "oauth2ClientId"],
            ProjectFields::DoubleClick => &[
                "adExchangeBuyerAccount",
                "doubleClickProjectResource",
                "cookieMatchNid",
                "cookieMatchUrl",
            ],
            ProjectFields::LoadBalancer => &["loadBalancerOauth2Scopes"],
            ProjectFields::Bidder => &[
                "userDistUri",
                "vmParameters",
                "mainParameters",
                "bidderOauth2Scopes",
            ],
            ProjectFields::Interceptors => &[
                "bidInterceptors",
                "impressionInterceptors",
                "clickInterceptors",
                "matchInterceptors",
            ],
            ProjectFields::Reporting => &["doubleClickProjectResource"],
            ProjectFields::PreferredDeals => &["doubleClickPreferredDealsBucket", "auctionType"],
        }
    }

    /// Copy this group's attributes from `source` onto `target`, leaving the rest alone.
    pub fn copy(self, source: &Project, target: &mut Project) {
        match self {
            ProjectFields::Config => {
                target.description = source.description.clone();
                target.oauth2_client_secret = source.oauth2_client_secret.clone();
                target.oauth2_client_id = source.oauth2_client_id.clone();
            }
            ProjectFields::DoubleClick => {
                target.ad_exchange_buyer_account = source.ad_exchange_buyer_account.clone();
                target.double_click_project_resource =
                    source.double_click_project_resource.clone();
                target.cookie_match_nid = source.cookie_match_nid.clone();
                target.cookie_match_url = source.cookie_match_url.clone();
            }
            ProjectFields::LoadBalancer => {
                target.load_balancer_oauth2_scopes = source.load_balancer_oauth2_scopes.clone();
            }
            ProjectFields::Bidder => {
                target.user_dist_uri = source.user_dist_uri.clone();
                target.vm_parameters = source.vm_parameters.clone();
                target.main_parameters = source.main_parameters.clone();
                target.bidder_oauth2_scopes = source.bidder_oauth2_scopes.clone();
            }
            ProjectFields::Interceptors => {
                target.bid_interceptors = source.bid_interceptors.clone();
                target.impression_interceptors = source.impression_interceptors.clone();
                target.click_interceptors = source.click_interceptors.clone();
                target.match_interceptors = source.match_interceptors.clone();
            }
            ProjectFields::Reporting => {
                target.double_click_project_resource =
                    source.double_click_project_resource.clone();
            }
            ProjectFields::PreferredDeals => {
                target.double_click_preferred_deals_bucket =
                    source.double_click_preferred_deals_bucket.clone();
                target.auction_type = source.auction_type;
            }
        }
    }

    /// JSON body holding exactly this group's attributes; unset ones are `null`
    /// so the backend clears them.
    pub fn request_body(self, project: &Project) -> ConsoleResult<Value> {
        let mut all = project_object(project)?;
        let picked: Map<String, Value> = self
            .keys()
            .iter()
            .map(|key| (key.to_string(), all.remove(*key).unwrap_or(Value::Null)))
            .collect();
        Ok(Value::Object(picked))
    }
}

/// Kind of update the console sends for a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectUpdate {
    /// The whole record replaces the stored one
    Full,
    /// Only one attribute group is sent and merged
    Partial(ProjectFields),
}

impl ProjectUpdate {
    pub fn fields(self) -> Option<ProjectFields> {
        match self {
            ProjectUpdate::Full => None,
            ProjectUpdate::Partial(fields) => Some(fields),
        }
    }

    pub fn request_body(self, project: &Project) -> ConsoleResult<Value> {
        match self {
            ProjectUpdate::Full => {
                let mut all = project_object(project)?;
                for key in ProjectFields::ALL.iter().flat_map(|f| f.keys()) {
                    all.entry(key.to_string()).or_insert(Value::Null);
                }
                Ok(Value::Object(all))
            }
            ProjectUpdate::Partial(fields) => fields.request_body(project),
        }
    }
}

fn project_object(project: &Project) -> ConsoleResult<Map<String, Value>> {
    match serde_json::to_value(project)? {
        Value::Object(all) => Ok(all),
        _ => Err(ConsoleError::Internal(
            "Project did not serialize to an object".to_string(),
        )),
    }
}
