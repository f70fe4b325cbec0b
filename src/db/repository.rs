//! Database repository for projects and their sub-resources.
//!
//! Role checks belong to the API layer; the repository only keeps rows
//! consistent. Multi-row changes run in transactions.

use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::{Row, SqlitePool};

use crate::errors::{ConsoleError, ConsoleResult};
use crate::models::{AddUserRequest, Firewall, Network, Project, ProjectRole, ProjectUser};

const PROJECT_COLUMNS: &str = r#"
    p.id, p.project_uuid, p.network, p.authorized, p.settings, u.project_role,
    COALESCE(pr.default_project = p.id, 0) AS is_default
    FROM projects p
    JOIN project_users u ON u.project_id = p.id AND u.user_email = ?
    LEFT JOIN preferences pr ON pr.user_email = u.user_email"#;

#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== PROJECTS ====================

    /// Projects `user_email` is a member of, oldest first.
    pub async fn list_projects(&self, user_email: &str) -> ConsoleResult<Vec<Project>> {
        let rows = sqlx::query(&format!("SELECT {} ORDER BY p.id", PROJECT_COLUMNS))
            .bind(user_email)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(project_from_row).collect()
    }

    /// A project as seen by `user_email`; `None` for non-members.
    pub async fn get_project(&self, id: i64, user_email: &str) -> ConsoleResult<Option<Project>> {
        let row = sqlx::query(&format!("SELECT {} WHERE p.id = ?", PROJECT_COLUMNS))
            .bind(user_email)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(project_from_row).transpose()
    }

    /// Create a project owned by `user_email` and make it their default.
    pub async fn create_project(
        &self,
        user_email: &str,
        settings: &Map<String, Value>,
    ) -> ConsoleResult<Project> {
        check_settings(settings)?;
        let project_uuid = uuid::Uuid::new_v4().simple().to_string();
        let now = Utc::now().to_rfc3339();
        let settings_json = serde_json::to_string(settings)?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO projects (project_uuid, network, authorized, settings, created_at, updated_at) VALUES (?, NULL, 0, ?, ?, ?)",
        )
        .bind(&project_uuid)
        .bind(&settings_json)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_rowid();

        sqlx::query("INSERT INTO project_users (project_id, user_email, project_role) VALUES (?, ?, ?)")
            .bind(id)
            .bind(user_email)
            .bind(ProjectRole::Owner.as_str())
            .execute(&mut *tx)
            .await?;

        upsert_default(&mut tx, user_email, id).await?;

        tx.commit().await?;

        tracing::info!("Created project {} for {}", id, user_email);
        self.require_project(id, user_email).await
    }

    /// Merge `changes` into the stored settings; keys not in `changes` are kept
    /// and keys set to `null` are removed.
    ///
    /// Nothing is written unless the merged settings still form a valid project.
    pub async fn merge_settings(&self, id: i64, changes: &Map<String, Value>) -> ConsoleResult<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT settings FROM projects WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| project_not_found(id))?;
        let mut settings = parse_settings(row.get("settings"))?;
        for (key, value) in changes {
            if value.is_null() {
                settings.remove(key);
            } else {
                settings.insert(key.clone(), value.clone());
            }
        }
        check_settings(&settings)?;

        sqlx::query("UPDATE projects SET settings = ?, updated_at = ? WHERE id = ?")
            .bind(serde_json::to_string(&settings)?)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Delete a project; users, network, firewalls and default references go with it.
    pub async fn delete_project(&self, id: i64) -> ConsoleResult<()> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(project_not_found(id));
        }
        tracing::info!("Deleted project {}", id);
        Ok(())
    }

    pub async fn set_default_project(&self, id: i64, user_email: &str) -> ConsoleResult<Project> {
        let mut tx = self.pool.begin().await?;
        upsert_default(&mut tx, user_email, id).await?;
        tx.commit().await?;
        self.require_project(id, user_email).await
    }

    pub async fn set_authorized(
        &self,
        id: i64,
        user_email: &str,
        authorized: bool,
    ) -> ConsoleResult<Project> {
        let result = sqlx::query("UPDATE projects SET authorized = ?, updated_at = ? WHERE id = ?")
            .bind(authorized)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(project_not_found(id));
        }
        self.require_project(id, user_email).await
    }

    async fn require_project(&self, id: i64, user_email: &str) -> ConsoleResult<Project> {
        self.get_project(id, user_email)
            .await?
            .ok_or_else(|| project_not_found(id))
    }

    // ==================== NETWORK ====================

    /// Store the project's network and its firewall rules.
    ///
    /// Fails with `Conflict` when the project already has a network.
    pub async fn create_network(
        &self,
        project_id: i64,
        network: &Network,
        firewalls: &[Firewall],
    ) -> ConsoleResult<Network> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT name FROM networks WHERE project_id = ?")
            .bind(project_id)
            .fetch_optional(&mut *tx)
            .await?;
        if let Some(row) = existing {
            let name: String = row.get("name");
            return Err(ConsoleError::Conflict(format!(
                "Project {} already has network {}",
                project_id, name
            )));
        }

        sqlx::query(
            "INSERT INTO networks (project_id, name, description, ipv4_range, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(project_id)
        .bind(&network.resource_name)
        .bind(&network.description)
        .bind(&network.ipv4_range)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        for firewall in firewalls {
            sqlx::query(
                "INSERT INTO firewalls (project_id, name, description, network, source_ranges, target_tags, allowed) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(project_id)
            .bind(&firewall.resource_name)
            .bind(&firewall.description)
            .bind(firewall.network.as_deref().unwrap_or(&network.id))
            .bind(serde_json::to_string(&firewall.source_ranges)?)
            .bind(serde_json::to_string(&firewall.target_tags)?)
            .bind(serde_json::to_string(&firewall.allowed)?)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE projects SET network = ?, updated_at = ? WHERE id = ?")
            .bind(&network.id)
            .bind(&now)
            .bind(project_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Created network {} with {} firewalls for project {}",
            network.resource_name,
            firewalls.len(),
            project_id
        );

        Ok(Network {
            created_at: Some(now),
            ..network.clone()
        })
    }

    pub async fn list_networks(&self, project_id: i64) -> ConsoleResult<Vec<Network>> {
        let rows = sqlx::query(
            "SELECT name, description, ipv4_range, created_at FROM networks WHERE project_id = ?",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let name: String = row.get("name");
                Network {
                    id: network_id(project_id, &name),
                    resource_name: name,
                    description: row.get("description"),
                    ipv4_range: row.get("ipv4_range"),
                    created_at: row.get("created_at"),
                    extra: Map::new(),
                }
            })
            .collect())
    }

    pub async fn list_firewalls(&self, project_id: i64) -> ConsoleResult<Vec<Firewall>> {
        let rows = sqlx::query(
            "SELECT name, description, network, source_ranges, target_tags, allowed FROM firewalls WHERE project_id = ? ORDER BY name",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let name: String = row.get("name");
                Ok(Firewall {
                    id: format!("/projects/{}/firewalls/{}", project_id, name),
                    resource_name: name,
                    description: row.get("description"),
                    network: row.get("network"),
                    source_ranges: parse_column(row.get("source_ranges"))?,
                    target_tags: parse_column(row.get("target_tags"))?,
                    allowed: parse_column(row.get("allowed"))?,
                    extra: Map::new(),
                })
            })
            .collect()
    }

    // ==================== USERS ====================

    pub async fn list_users(&self, project_id: i64) -> ConsoleResult<Vec<ProjectUser>> {
        let rows = sqlx::query(
            "SELECT user_email, project_role FROM project_users WHERE project_id = ? ORDER BY user_email",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| user_from_row(project_id, row.get("user_email"), row.get("project_role")))
            .collect()
    }

    /// Add a user or change the role of an existing one.
    pub async fn add_user(&self, project_id: i64, request: &AddUserRequest) -> ConsoleResult<ProjectUser> {
        sqlx::query(
            r#"INSERT INTO project_users (project_id, user_email, project_role) VALUES (?, ?, ?)
               ON CONFLICT (project_id, user_email) DO UPDATE SET project_role = excluded.project_role"#,
        )
        .bind(project_id)
        .bind(&request.user_email)
        .bind(request.project_role.as_str())
        .execute(&self.pool)
        .await?;

        user_from_row(
            project_id,
            request.user_email.clone(),
            request.project_role.as_str().to_string(),
        )
    }
}

async fn upsert_default(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    user_email: &str,
    project_id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO preferences (user_email, default_project) VALUES (?, ?)
           ON CONFLICT (user_email) DO UPDATE SET default_project = excluded.default_project"#,
    )
    .bind(user_email)
    .bind(project_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub fn project_id(id: i64) -> String {
    format!("/projects/{}", id)
}

pub fn network_id(project_id: i64, name: &str) -> String {
    format!("/projects/{}/networks/{}", project_id, name)
}

fn project_not_found(id: i64) -> ConsoleError {
    ConsoleError::NotFound(format!("Project {} not found", id))
}

fn parse_settings(raw: String) -> ConsoleResult<Map<String, Value>> {
    match serde_json::from_str(&raw) {
        Ok(Value::Object(settings)) => Ok(settings),
        Ok(_) => Err(ConsoleError::Internal("Project settings are not an object".to_string())),
        Err(e) => Err(ConsoleError::Internal(format!("Corrupt project settings: {}", e))),
    }
}

/// Reject settings that would not read back as a [`Project`].
fn check_settings(settings: &Map<String, Value>) -> ConsoleResult<()> {
    serde_json::from_value::<Project>(Value::Object(settings.clone()))
        .map(|_| ())
        .map_err(|e| ConsoleError::Validation(format!("Invalid project settings: {}", e)))
}

fn parse_column<T: serde::de::DeserializeOwned>(raw: String) -> ConsoleResult<T> {
    serde_json::from_str(&raw).map_err(|e| ConsoleError::Internal(format!("Corrupt column: {}", e)))
}

fn project_from_row(row: &sqlx::sqlite::SqliteRow) -> ConsoleResult<Project> {
    let id: i64 = row.get("id");
    let network: Option<String> = row.get("network");
    let authorized: bool = row.get("authorized");
    let is_default: i64 = row.get("is_default");
    let role: String = row.get("project_role");

    let mut record = parse_settings(row.get("settings"))?;
    record.insert("id".to_string(), Value::String(project_id(id)));
    record.insert("resourceName".to_string(), Value::String(id.to_string()));
    record.insert("projectUuid".to_string(), Value::String(row.get("project_uuid")));
    record.insert("projectRole".to_string(), Value::String(role));
    record.insert("defaultProject".to_string(), Value::Bool(is_default != 0));
    record.insert("authorized".to_string(), Value::Bool(authorized));
    if let Some(network) = network {
        record.insert("network".to_string(), Value::String(network));
    }

    serde_json::from_value(Value::Object(record))
        .map_err(|e| ConsoleError::Internal(format!("Corrupt project {}: {}", id, e)))
}

fn user_from_row(project_id: i64, user_email: String, role: String) -> ConsoleResult<ProjectUser> {
    let project_role = ProjectRole::parse(&role)
        .ok_or_else(|| ConsoleError::Internal(format!("Unknown project role {}", role)))?;
    Ok(ProjectUser {
        id: format!("/projects/{}/users/{}", project_id, user_email),
        resource_name: user_email.clone(),
        user_email,
        project_role,
        extra: Map::new(),
    })
}
