use crate::domain::role::{Role, RoleData};
use crate::infrastructure::{RepoResult, RepositoryError, RoleRepository};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{error, info, instrument};

const ROLE_COLUMNS: &str = "id, name, description, is_active, created_at";

fn map_write_error(e: sqlx::Error, name: &str) -> RepositoryError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return RepositoryError::DuplicateRoleName(name.to_string());
        }
    }
    error!(error = %e, "Failed to write role");
    RepositoryError::Database(e)
}

#[derive(Debug, Clone)]
pub struct PostgresRoleRepository {
    pub pool: PgPool,
}

impl PostgresRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    #[instrument(skip(self))]
    async fn list_roles(&self) -> RepoResult<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to list roles");
            e
        })?;
        Ok(roles)
    }

    #[instrument(skip(self))]
    async fn find_role(&self, id: i64) -> RepoResult<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    #[instrument(skip(self, data), fields(name = %data.name))]
    async fn create_role(&self, data: RoleData) -> RepoResult<Role> {
        let role = sqlx::query_as::<_, Role>(&format!(
            r#"
            INSERT INTO roles (name, description, is_active)
            VALUES ($1, $2, $3)
            RETURNING {ROLE_COLUMNS}
            "#
        ))
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &data.name))?;
        info!(role_id = role.id, "Role created");
        Ok(role)
    }

    #[instrument(skip(self, data), fields(name = %data.name))]
    async fn update_role(&self, id: i64, data: RoleData) -> RepoResult<Role> {
        let role = sqlx::query_as::<_, Role>(&format!(
            r#"
            UPDATE roles SET name = $2, description = $3, is_active = $4
            WHERE id = $1
            RETURNING {ROLE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &data.name))?;
        role.ok_or(RepositoryError::NotFound { entity: "role", id })
    }

    #[instrument(skip(self))]
    async fn delete_role(&self, id: i64) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM role_menu_permissions WHERE role_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!(error = %e, role_id = id, "Failed to delete role");
                e
            })?;
        if deleted.rows_affected() == 0 {
            return Err(RepositoryError::NotFound { entity: "role", id });
        }
        tx.commit().await?;
        info!(role_id = id, "Role deleted");
        Ok(())
    }
}
