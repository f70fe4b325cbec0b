//! Project user endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{load_project, require_owner};
use crate::errors::{ConsoleError, ConsoleResult};
use crate::models::{AddUserRequest, ProjectUser};
use crate::AppState;

/// GET /projects/{id}/users
pub async fn list_users(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ConsoleResult<Json<Vec<ProjectUser>>> {
    let (project_id, _) = load_project(&state, &id).await?;
    Ok(Json(state.repo.list_users(project_id).await?))
}

/// POST /projects/{id}/users - adds a user or changes their role.
pub async fn add_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AddUserRequest>,
) -> ConsoleResult<(StatusCode, Json<ProjectUser>)> {
    let (project_id, project) = load_project(&state, &id).await?;
    require_owner(&project)?;

    let email = request.user_email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ConsoleError::Validation(format!(
            "{} is not an e-mail address",
            request.user_email
        )));
    }
    if email.eq_ignore_ascii_case(&state.config.operator_email) {
        return Err(ConsoleError::Conflict(
            "The owner's own role cannot be changed".to_string(),
        ));
    }

    let request = AddUserRequest {
        user_email: email.to_string(),
        ..request
    };
    let user = state.repo.add_user(project_id, &request).await?;
    tracing::info!(
        "Added {} to project {} as {}",
        user.user_email,
        project_id,
        user.project_role.as_str()
    );
    Ok((StatusCode::CREATED, Json(user)))
}
