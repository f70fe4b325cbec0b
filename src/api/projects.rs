//! Project endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{Map, Value};

use super::{load_project, require_owner, require_writable};
use crate::config::BidderDefaults;
use crate::errors::{ConsoleError, ConsoleResult};
use crate::models::Project;
use crate::AppState;

/// Attributes the backend owns; clients cannot set them through create or update.
const READ_ONLY_KEYS: &[&str] = &[
    "id",
    "resourceName",
    "projectUuid",
    "projectRole",
    "defaultProject",
    "authorized",
    "network",
];

const MAX_TEXT_LEN: usize = 200;

/// GET /projects
pub async fn list_projects(State(state): State<AppState>) -> ConsoleResult<Json<Vec<Project>>> {
    let projects = state.repo.list_projects(&state.config.operator_email).await?;
    Ok(Json(projects))
}

/// GET /projects/{id}
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ConsoleResult<Json<Project>> {
    let (_, project) = load_project(&state, &id).await?;
    Ok(Json(project))
}

/// POST /projects
pub async fn create_project(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ConsoleResult<(StatusCode, Json<Project>)> {
    let mut settings = writable_settings(body)?;
    validate_settings(&settings, true)?;
    apply_bidder_defaults(&mut settings, &state.config.bidder_defaults);

    let project = state
        .repo
        .create_project(&state.config.operator_email, &settings)
        .await?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// PUT /projects/{id} - merges exactly the keys present in the body.
pub async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ConsoleResult<Json<Project>> {
    let (project_id, project) = load_project(&state, &id).await?;
    require_writable(&project)?;

    let changes = writable_settings(body)?;
    validate_settings(&changes, false)?;
    state.repo.merge_settings(project_id, &changes).await?;

    let (_, updated) = load_project(&state, &id).await?;
    Ok(Json(updated))
}

/// DELETE /projects/{id}
pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ConsoleResult<StatusCode> {
    let (project_id, project) = load_project(&state, &id).await?;
    require_owner(&project)?;
    state.repo.delete_project(project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /projects/{id}/defaultProject
pub async fn set_default_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ConsoleResult<Json<Project>> {
    let (project_id, _) = load_project(&state, &id).await?;
    let project = state
        .repo
        .set_default_project(project_id, &state.config.operator_email)
        .await?;
    Ok(Json(project))
}

/// DELETE /projects/{id}/authorized
pub async fn revoke_authorization(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ConsoleResult<Json<Project>> {
    let (project_id, _) = load_project(&state, &id).await?;
    let project = state
        .repo
        .set_authorized(project_id, &state.config.operator_email, false)
        .await?;
    Ok(Json(project))
}

/// POST /projects/{id}/authorized - 200 while tokens are valid, 401 otherwise.
pub async fn verify_authorization(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ConsoleResult<StatusCode> {
    let (_, project) = load_project(&state, &id).await?;
    if project.authorized {
        Ok(StatusCode::OK)
    } else {
        Err(ConsoleError::Unauthorized(format!(
            "Project {} is not authorized",
            project.resource_name
        )))
    }
}

/// Body as an object, minus the attributes the backend owns.
fn writable_settings(body: Value) -> ConsoleResult<Map<String, Value>> {
    let Value::Object(mut settings) = body else {
        return Err(ConsoleError::BadRequest(
            "Project body must be a JSON object".to_string(),
        ));
    };
    for key in READ_ONLY_KEYS {
        settings.remove(*key);
    }
    Ok(settings)
}

fn validate_settings(settings: &Map<String, Value>, creating: bool) -> ConsoleResult<()> {
    let text = |key: &str| settings.get(key).and_then(Value::as_str);

    match text("description") {
        Some(description) => {
            let len = description.trim().chars().count();
            if !(5..=MAX_TEXT_LEN).contains(&len) {
                return Err(ConsoleError::Validation(
                    "Description must be between 5 and 200 characters".to_string(),
                ));
            }
        }
        None if creating || settings.get("description").is_some_and(Value::is_null) => {
            return Err(ConsoleError::Validation("Description is required".to_string()));
        }
        None => {}
    }

    if creating && text("apiProjectId").map_or(true, |id| id.trim().is_empty()) {
        return Err(ConsoleError::Validation("apiProjectId is required".to_string()));
    }

    for key in ["apiProjectId", "oauth2ClientId", "oauth2ClientSecret"] {
        if text(key).is_some_and(|v| v.chars().count() > MAX_TEXT_LEN) {
            return Err(ConsoleError::Validation(format!(
                "{} must be at most 200 characters",
                key
            )));
        }
    }

    if let Some(uri) = text("userDistUri") {
        if !uri.is_empty() && !uri.starts_with("gs://") {
            return Err(ConsoleError::Validation(
                "userDistUri must start with 'gs://'".to_string(),
            ));
        }
    }

    Ok(())
}

/// Fill in bidder settings the client did not send.
fn apply_bidder_defaults(settings: &mut Map<String, Value>, defaults: &BidderDefaults) {
    let mut fill = |key: &str, value: Value| {
        settings.entry(key.to_string()).or_insert(value);
    };

    fill("vmParameters", Value::from(defaults.vm_parameters.clone()));
    fill("mainParameters", Value::from(defaults.main_parameters.clone()));
    fill("bidInterceptors", Value::from(defaults.bid_interceptors.clone()));
    fill(
        "impressionInterceptors",
        Value::from(defaults.impression_interceptors.clone()),
    );
    fill("clickInterceptors", Value::from(defaults.click_interceptors.clone()));
    fill("matchInterceptors", Value::from(defaults.match_interceptors.clone()));
    fill("bidderRequestPort", Value::from(defaults.bidder_request_port.clone()));
    fill("bidderAdminPort", Value::from(defaults.bidder_admin_port.clone()));
    fill(
        "loadBalancerRequestPort",
        Value::from(defaults.load_balancer_request_port.clone()),
    );
    fill(
        "loadBalancerStatPort",
        Value::from(defaults.load_balancer_stat_port.clone()),
    );
    fill("whiteListedIpRanges", Value::Array(Vec::new()));
    if let Some(url) = &defaults.cookie_match_url {
        fill("cookieMatchUrl", Value::from(url.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        writable_settings(value).unwrap()
    }

    #[test]
    fn test_read_only_keys_are_dropped() {
        let settings = object(json!({
            "id": "/projects/9",
            "resourceName": "9",
            "network": "/projects/9/networks/n",
            "defaultProject": true,
            "description": "Kept as sent"
        }));
        assert_eq!(settings.len(), 1);
        assert!(settings.contains_key("description"));
        assert!(writable_settings(json!([1, 2])).is_err());
    }

    #[test]
    fn test_create_validation() {
        let ok = object(json!({"description": "Bidding", "apiProjectId": "api-1"}));
        assert!(validate_settings(&ok, true).is_ok());

        let short = object(json!({"description": "Bid", "apiProjectId": "api-1"}));
        assert!(matches!(
            validate_settings(&short, true),
            Err(ConsoleError::Validation(_))
        ));

        let missing_api = object(json!({"description": "Bidding"}));
        assert!(validate_settings(&missing_api, true).is_err());
        // Updates may leave both out.
        assert!(validate_settings(&object(json!({})), false).is_ok());
    }

    #[test]
    fn test_user_dist_uri_needs_gs_scheme() {
        let bad = object(json!({"userDistUri": "https://example.com/bidder.tar"}));
        assert!(validate_settings(&bad, false).is_err());
        let good = object(json!({"userDistUri": "gs://bucket/bidder.tar"}));
        assert!(validate_settings(&good, false).is_ok());
    }

    #[test]
    fn test_bidder_defaults_do_not_override_sent_values() {
        let mut settings = object(json!({"vmParameters": "-Xmx8g"}));
        apply_bidder_defaults(&mut settings, &BidderDefaults::default());
        assert_eq!(settings["vmParameters"], "-Xmx8g");
        assert_eq!(settings["bidderRequestPort"], "18081");
        assert_eq!(settings["whiteListedIpRanges"], json!([]));
    }
}
