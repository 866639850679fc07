use crate::domain::permission::RoleMenuPermission;
use crate::infrastructure::menu_repository::lock_menu_tree;
use crate::infrastructure::{PermissionRepository, RepoResult, RepositoryError};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{error, info, instrument};

const LINK_COLUMNS: &str = "role_id, menu_item_id, is_active, created_at";

#[derive(Debug, Clone)]
pub struct PostgresPermissionRepository {
    pub pool: PgPool,
}

impl PostgresPermissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ensure_link_targets(
        tx: &mut Transaction<'_, Postgres>,
        role_id: i64,
        menu_item_ids: &[i64],
    ) -> RepoResult<()> {
        let role_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM roles WHERE id = $1)")
                .bind(role_id)
                .fetch_one(&mut **tx)
                .await?;
        if !role_exists {
            return Err(RepositoryError::NotFound { entity: "role", id: role_id });
        }

        let missing: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT wanted.id
            FROM UNNEST($1::BIGINT[]) AS wanted(id)
            LEFT JOIN menu_items m ON m.id = wanted.id
            WHERE m.id IS NULL
            LIMIT 1
            "#,
        )
        .bind(menu_item_ids)
        .fetch_optional(&mut **tx)
        .await?;
        if let Some(id) = missing {
            return Err(RepositoryError::NotFound { entity: "menu item", id });
        }
        Ok(())
    }

    async fn upsert_in(
        tx: &mut Transaction<'_, Postgres>,
        role_id: i64,
        menu_item_id: i64,
        is_active: bool,
    ) -> RepoResult<RoleMenuPermission> {
        let link = sqlx::query_as::<_, RoleMenuPermission>(&format!(
            r#"
            INSERT INTO role_menu_permissions (role_id, menu_item_id, is_active)
            VALUES ($1, $2, $3)
            ON CONFLICT (role_id, menu_item_id) DO UPDATE SET is_active = EXCLUDED.is_active
            RETURNING {LINK_COLUMNS}
            "#
        ))
        .bind(role_id)
        .bind(menu_item_id)
        .bind(is_active)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            error!(error = %e, role_id, menu_item_id, "Failed to upsert permission link");
            e
        })?;
        Ok(link)
    }
}

#[async_trait]
impl PermissionRepository for PostgresPermissionRepository {
    #[instrument(skip(self))]
    async fn list_permissions(&self) -> RepoResult<Vec<RoleMenuPermission>> {
        let links = sqlx::query_as::<_, RoleMenuPermission>(&format!(
            "SELECT {LINK_COLUMNS} FROM role_menu_permissions"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(links)
    }

    #[instrument(skip(self))]
    async fn list_permissions_by_role(&self, role_id: i64) -> RepoResult<Vec<RoleMenuPermission>> {
        let links = sqlx::query_as::<_, RoleMenuPermission>(&format!(
            "SELECT {LINK_COLUMNS} FROM role_menu_permissions WHERE role_id = $1"
        ))
        .bind(role_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, role_id, "Failed to list permission links");
            e
        })?;
        Ok(links)
    }

    #[instrument(skip(self))]
    async fn upsert_permission(
        &self,
        role_id: i64,
        menu_item_id: i64,
        is_active: bool,
    ) -> RepoResult<RoleMenuPermission> {
        let mut tx = self.pool.begin().await?;
        lock_menu_tree(&mut tx).await?;
        Self::ensure_link_targets(&mut tx, role_id, &[menu_item_id]).await?;
        let link = Self::upsert_in(&mut tx, role_id, menu_item_id, is_active).await?;
        tx.commit().await?;
        info!(role_id, menu_item_id, is_active, "Permission link saved");
        Ok(link)
    }

    #[instrument(skip(self))]
    async fn toggle_permission(
        &self,
        role_id: i64,
        menu_item_id: i64,
    ) -> RepoResult<RoleMenuPermission> {
        let mut tx = self.pool.begin().await?;
        lock_menu_tree(&mut tx).await?;
        Self::ensure_link_targets(&mut tx, role_id, &[menu_item_id]).await?;
        let current: Option<bool> = sqlx::query_scalar(
            "SELECT is_active FROM role_menu_permissions WHERE role_id = $1 AND menu_item_id = $2 FOR UPDATE",
        )
        .bind(role_id)
        .bind(menu_item_id)
        .fetch_optional(&mut *tx)
        .await?;
        let next = !current.unwrap_or(false);
        let link = Self::upsert_in(&mut tx, role_id, menu_item_id, next).await?;
        tx.commit().await?;
        info!(role_id, menu_item_id, is_active = next, "Permission link toggled");
        Ok(link)
    }

    #[instrument(skip(self, states), fields(count = states.len()))]
    async fn upsert_permissions(&self, role_id: i64, states: &[(i64, bool)]) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;
        lock_menu_tree(&mut tx).await?;
        let ids: Vec<i64> = states.iter().map(|(id, _)| *id).collect();
        Self::ensure_link_targets(&mut tx, role_id, &ids).await?;
        for &(menu_item_id, is_active) in states {
            Self::upsert_in(&mut tx, role_id, menu_item_id, is_active).await?;
        }
        tx.commit().await?;
        info!(role_id, count = states.len(), "Permission links saved");
        Ok(())
    }
}
