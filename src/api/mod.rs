//! REST API of the reference backend.
//!
//! Success bodies are the raw records the console client decodes; failures go
//! through [`ConsoleError`]'s error envelope.

mod networks;
mod projects;
mod users;

pub use networks::*;
pub use projects::*;
pub use users::*;

use crate::errors::{ConsoleError, ConsoleResult};
use crate::models::Project;
use crate::AppState;

/// Numeric project id from a path segment; anything else is an unknown project.
fn parse_project_id(raw: &str) -> ConsoleResult<i64> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ConsoleError::NotFound(format!("Project {} not found", raw)))
}

/// The project as seen by the operator, or `NotFound`.
async fn load_project(state: &AppState, raw_id: &str) -> ConsoleResult<(i64, Project)> {
    let id = parse_project_id(raw_id)?;
    let project = state
        .repo
        .get_project(id, &state.config.operator_email)
        .await?
        .ok_or_else(|| ConsoleError::NotFound(format!("Project {} not found", raw_id)))?;
    Ok((id, project))
}

fn require_writable(project: &Project) -> ConsoleResult<()> {
    if project.is_writable() {
        Ok(())
    } else {
        Err(ConsoleError::Forbidden(format!(
            "No write access to project {}",
            project.resource_name
        )))
    }
}

fn require_owner(project: &Project) -> ConsoleResult<()> {
    if project.is_owner() {
        Ok(())
    } else {
        Err(ConsoleError::Forbidden(format!(
            "Only the owner can do this on project {}",
            project.resource_name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProjectRole;

    #[test]
    fn test_parse_project_id() {
        assert_eq!(parse_project_id("12").unwrap(), 12);
        assert!(parse_project_id("abc").unwrap_err().is_not_found());
        assert!(parse_project_id("0").unwrap_err().is_not_found());
        assert!(parse_project_id("-3").unwrap_err().is_not_found());
    }

    #[test]
    fn test_role_checks() {
        let mut project = Project {
            project_role: Some(ProjectRole::Read),
            ..Default::default()
        };
        assert!(matches!(require_writable(&project), Err(ConsoleError::Forbidden(_))));

        project.project_role = Some(ProjectRole::ReadWrite);
        assert!(require_writable(&project).is_ok());
        assert!(require_owner(&project).is_err());

        project.project_role = Some(ProjectRole::Owner);
        assert!(require_owner(&project).is_ok());
    }
}
