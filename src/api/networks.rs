//! Project network and firewall endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Map;

use super::{load_project, require_writable};
use crate::db::network_id;
use crate::errors::ConsoleResult;
use crate::models::{CreateNetworkRequest, Firewall, FirewallAllowed, Network, Project};
use crate::AppState;

/// Instance tag carried by load balancers.
pub const LOAD_BALANCER_TAG: &str = "load-balancer";
/// Instance tag carried by bidders.
pub const BIDDER_TAG: &str = "bidder";

const WORLD: &str = "0.0.0.0/0";
const SSH_PORT: &str = "22";

/// GET /projects/{id}/networks
pub async fn list_networks(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ConsoleResult<Json<Vec<Network>>> {
    let (project_id, _) = load_project(&state, &id).await?;
    Ok(Json(state.repo.list_networks(project_id).await?))
}

/// POST /projects/{id}/networks - creates the project's only network.
pub async fn create_network(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<CreateNetworkRequest>,
) -> ConsoleResult<(StatusCode, Json<Network>)> {
    let (project_id, project) = load_project(&state, &id).await?;
    require_writable(&project)?;

    let name = format!("network-{}", project_uuid(&project));
    let network = Network {
        id: network_id(project_id, &name),
        resource_name: name,
        description: request.description,
        ipv4_range: request.ipv4_range,
        created_at: None,
        extra: Map::new(),
    };
    let firewalls = build_firewalls(&project, &network.id);

    let created = state
        .repo
        .create_network(project_id, &network, &firewalls)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /projects/{id}/firewalls
pub async fn list_firewalls(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ConsoleResult<Json<Vec<Firewall>>> {
    let (project_id, _) = load_project(&state, &id).await?;
    Ok(Json(state.repo.list_firewalls(project_id).await?))
}

fn project_uuid(project: &Project) -> &str {
    project
        .project_uuid
        .as_deref()
        .unwrap_or(&project.resource_name)
}

/// Firewall rules a freshly created network needs.
///
/// Request ports are open to the world; admin ports and SSH only to the
/// whitelisted ranges. Load balancers and bidders share a rule whenever
/// their ports match.
pub fn build_firewalls(project: &Project, network_link: &str) -> Vec<Firewall> {
    let rule = |suffix: &str, description: &str, sources: Vec<String>, tags: Vec<&str>, ports: Vec<String>| {
        let name = format!("firewall-{}-{}", project_uuid(project), suffix);
        Firewall {
            id: format!("{}/firewalls/{}", project.id, name),
            resource_name: name,
            description: Some(description.to_string()),
            network: Some(network_link.to_string()),
            source_ranges: sources,
            target_tags: tags.iter().map(|t| t.to_string()).collect(),
            allowed: vec![FirewallAllowed {
                ip_protocol: "tcp".to_string(),
                ports,
            }],
            extra: Map::new(),
        }
    };
    let port = |p: &Option<String>| p.iter().cloned().collect::<Vec<String>>();
    let admin = |p: &Option<String>| {
        let mut ports = port(p);
        ports.push(SSH_PORT.to_string());
        ports
    };
    let world = || vec![WORLD.to_string()];

    let mut firewalls = Vec::new();

    if project.bidder_request_port == project.load_balancer_request_port {
        firewalls.push(rule(
            "world-lb-bidders",
            "World to load balancers or bidders",
            world(),
            vec![LOAD_BALANCER_TAG, BIDDER_TAG],
            port(&project.bidder_request_port),
        ));
    } else {
        firewalls.push(rule(
            "world-lb",
            "World to load balancers",
            world(),
            vec![LOAD_BALANCER_TAG],
            port(&project.load_balancer_request_port),
        ));
        firewalls.push(rule(
            "world-bidders",
            "World to bidders",
            world(),
            vec![BIDDER_TAG],
            port(&project.bidder_request_port),
        ));
    }

    let whitelist = project.white_listed_ip_ranges.clone().unwrap_or_default();
    if whitelist.is_empty() {
        return firewalls;
    }

    if project.bidder_admin_port == project.load_balancer_stat_port {
        firewalls.push(rule(
            "wl-lb-bidders",
            "Whitelisted IPs to load balancers or bidders (admin)",
            whitelist,
            vec![LOAD_BALANCER_TAG, BIDDER_TAG],
            admin(&project.bidder_admin_port),
        ));
    } else {
        firewalls.push(rule(
            "wl-bidders",
            "Whitelisted IPs to bidders (admin)",
            whitelist.clone(),
            vec![BIDDER_TAG],
            admin(&project.bidder_admin_port),
        ));
        firewalls.push(rule(
            "wl-lb",
            "Whitelisted IPs to load balancers (admin)",
            whitelist,
            vec![LOAD_BALANCER_TAG],
            admin(&project.load_balancer_stat_port),
        ));
    }

    firewalls
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(request: (&str, &str), admin: (&str, &str), whitelist: &[&str]) -> Project {
        Project {
            resource_name: "3".to_string(),
            id: "/projects/3".to_string(),
            project_uuid: Some("abc".to_string()),
            bidder_request_port: Some(request.0.to_string()),
            load_balancer_request_port: Some(request.1.to_string()),
            bidder_admin_port: Some(admin.0.to_string()),
            load_balancer_stat_port: Some(admin.1.to_string()),
            white_listed_ip_ranges: Some(whitelist.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        }
    }

    fn names(firewalls: &[Firewall]) -> Vec<&str> {
        firewalls.iter().map(|f| f.resource_name.as_str()).collect()
    }

    #[test]
    fn test_shared_request_port_uses_one_world_rule() {
        let firewalls = build_firewalls(&project(("80", "80"), ("18082", "8081"), &[]), "net");
        assert_eq!(names(&firewalls), vec!["firewall-abc-world-lb-bidders"]);
        let rule = &firewalls[0];
        assert_eq!(rule.source_ranges, vec!["0.0.0.0/0"]);
        assert_eq!(rule.target_tags, vec![LOAD_BALANCER_TAG, BIDDER_TAG]);
        assert_eq!(rule.allowed[0].ports, vec!["80"]);
        assert_eq!(rule.network.as_deref(), Some("net"));
    }

    #[test]
    fn test_separate_request_ports() {
        let firewalls = build_firewalls(&project(("18081", "80"), ("18082", "8081"), &[]), "net");
        assert_eq!(
            names(&firewalls),
            vec!["firewall-abc-world-lb", "firewall-abc-world-bidders"]
        );
        assert_eq!(firewalls[0].allowed[0].ports, vec!["80"]);
        assert_eq!(firewalls[1].allowed[0].ports, vec!["18081"]);
    }

    #[test]
    fn test_whitelist_opens_admin_and_ssh() {
        let shared = build_firewalls(
            &project(("80", "80"), ("8081", "8081"), &["10.0.0.0/8"]),
            "net",
        );
        assert_eq!(
            names(&shared),
            vec!["firewall-abc-world-lb-bidders", "firewall-abc-wl-lb-bidders"]
        );
        assert_eq!(shared[1].allowed[0].ports, vec!["8081", "22"]);
        assert_eq!(shared[1].source_ranges, vec!["10.0.0.0/8"]);

        let split = build_firewalls(
            &project(("80", "80"), ("18082", "8081"), &["10.0.0.0/8"]),
            "net",
        );
        assert_eq!(
            names(&split)[1..],
            ["firewall-abc-wl-bidders", "firewall-abc-wl-lb"]
        );
        assert_eq!(split[2].allowed[0].ports, vec!["8081", "22"]);
    }
}
