use crate::domain::menu_item::{MenuItem, MenuItemData, OpenMode};
use crate::infrastructure::{MenuRepository, RepoResult, RepositoryError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{error, info, instrument};

/// Advisory lock key serializing every structural write to the menu tree.
pub const MENU_TREE_LOCK_KEY: i64 = 0x6d65_6e75;

const MENU_COLUMNS: &str =
    "id, name, link, open_mode, sort_order, parent_id, is_active, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct MenuItemRow {
    id: i64,
    name: String,
    link: Option<String>,
    open_mode: Option<String>,
    sort_order: i32,
    parent_id: Option<i64>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<MenuItemRow> for MenuItem {
    type Error = RepositoryError;

    fn try_from(row: MenuItemRow) -> Result<Self, Self::Error> {
        let open_mode = row
            .open_mode
            .as_deref()
            .map(str::parse::<OpenMode>)
            .transpose()
            .map_err(|e| RepositoryError::Database(sqlx::Error::Decode(Box::new(e))))?;
        Ok(MenuItem {
            id: row.id,
            name: row.name,
            link: row.link,
            open_mode,
            order: row.sort_order,
            parent_id: row.parent_id,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_items(rows: Vec<MenuItemRow>) -> RepoResult<Vec<MenuItem>> {
    rows.into_iter().map(MenuItem::try_from).collect()
}

/// Takes the menu tree lock for the rest of the transaction. Menu writes and
/// permission link writes both serialize on it.
pub(crate) async fn lock_menu_tree(tx: &mut Transaction<'_, Postgres>) -> RepoResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(MENU_TREE_LOCK_KEY)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

fn map_write_error(e: sqlx::Error, data: &MenuItemData) -> RepositoryError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return RepositoryError::DuplicateOrder {
                parent_id: data.parent_id,
                order: data.order,
            };
        }
    }
    error!(error = %e, "Failed to write menu item");
    RepositoryError::Database(e)
}

#[derive(Debug, Clone)]
pub struct PostgresMenuRepository {
    pub pool: PgPool,
}

impl PostgresMenuRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Parent existence and sibling order checks shared by create and update.
    async fn check_placement(
        tx: &mut Transaction<'_, Postgres>,
        id: Option<i64>,
        data: &MenuItemData,
    ) -> RepoResult<()> {
        if let Some(parent_id) = data.parent_id {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM menu_items WHERE id = $1)")
                    .bind(parent_id)
                    .fetch_one(&mut **tx)
                    .await?;
            if !exists {
                return Err(RepositoryError::NotFound {
                    entity: "parent menu item",
                    id: parent_id,
                });
            }

            if let Some(item_id) = id {
                // UNION (not UNION ALL) stops on rows already seen, so a corrupt chain terminates.
                let cycle: bool = sqlx::query_scalar(
                    r#"
                    WITH RECURSIVE ancestors(id, parent_id) AS (
                        SELECT id, parent_id FROM menu_items WHERE id = $1
                        UNION
                        SELECT m.id, m.parent_id
                        FROM menu_items m
                        INNER JOIN ancestors a ON m.id = a.parent_id
                    )
                    SELECT EXISTS (SELECT 1 FROM ancestors WHERE id = $2)
                    "#,
                )
                .bind(parent_id)
                .bind(item_id)
                .fetch_one(&mut **tx)
                .await?;
                if cycle {
                    return Err(RepositoryError::WouldCreateCycle { item_id, parent_id });
                }
            }
        }

        let clash: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM menu_items
                WHERE parent_id IS NOT DISTINCT FROM $1
                  AND sort_order = $2
                  AND ($3::BIGINT IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(data.parent_id)
        .bind(data.order)
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;
        if clash {
            return Err(RepositoryError::DuplicateOrder {
                parent_id: data.parent_id,
                order: data.order,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MenuRepository for PostgresMenuRepository {
    #[instrument(skip(self))]
    async fn list_all(&self) -> RepoResult<Vec<MenuItem>> {
        let rows = sqlx::query_as::<_, MenuItemRow>(&format!(
            "SELECT {MENU_COLUMNS} FROM menu_items ORDER BY sort_order, id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to list menu items");
            e
        })?;
        into_items(rows)
    }

    #[instrument(skip(self))]
    async fn list_by_parent(&self, parent_id: Option<i64>) -> RepoResult<Vec<MenuItem>> {
        let rows = sqlx::query_as::<_, MenuItemRow>(&format!(
            "SELECT {MENU_COLUMNS} FROM menu_items WHERE parent_id IS NOT DISTINCT FROM $1 ORDER BY sort_order, id"
        ))
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;
        into_items(rows)
    }

    #[instrument(skip(self))]
    async fn find_menu_item(&self, id: i64) -> RepoResult<Option<MenuItem>> {
        let row = sqlx::query_as::<_, MenuItemRow>(&format!(
            "SELECT {MENU_COLUMNS} FROM menu_items WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(MenuItem::try_from).transpose()
    }

    #[instrument(skip(self, data), fields(name = %data.name, parent_id = ?data.parent_id, order = data.order))]
    async fn create_menu_item(&self, data: MenuItemData) -> RepoResult<MenuItem> {
        let mut tx = self.pool.begin().await?;
        lock_menu_tree(&mut tx).await?;
        Self::check_placement(&mut tx, None, &data).await?;

        let row = sqlx::query_as::<_, MenuItemRow>(&format!(
            r#"
            INSERT INTO menu_items (name, link, open_mode, sort_order, parent_id, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {MENU_COLUMNS}
            "#
        ))
        .bind(&data.name)
        .bind(&data.link)
        .bind(data.open_mode.map(|m| m.as_str()))
        .bind(data.order)
        .bind(data.parent_id)
        .bind(data.is_active)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, &data))?;

        tx.commit().await?;
        info!(menu_item_id = row.id, "Menu item created");
        MenuItem::try_from(row)
    }

    #[instrument(skip(self, data), fields(name = %data.name, parent_id = ?data.parent_id, order = data.order))]
    async fn update_menu_item(&self, id: i64, data: MenuItemData) -> RepoResult<MenuItem> {
        let mut tx = self.pool.begin().await?;
        lock_menu_tree(&mut tx).await?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM menu_items WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if !exists {
            return Err(RepositoryError::NotFound { entity: "menu item", id });
        }
        Self::check_placement(&mut tx, Some(id), &data).await?;

        let row = sqlx::query_as::<_, MenuItemRow>(&format!(
            r#"
            UPDATE menu_items
            SET name = $2, link = $3, open_mode = $4, sort_order = $5,
                parent_id = $6, is_active = $7, updated_at = now()
            WHERE id = $1
            RETURNING {MENU_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&data.name)
        .bind(&data.link)
        .bind(data.open_mode.map(|m| m.as_str()))
        .bind(data.order)
        .bind(data.parent_id)
        .bind(data.is_active)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, &data))?;

        tx.commit().await?;
        info!(menu_item_id = id, "Menu item updated");
        MenuItem::try_from(row)
    }

    #[instrument(skip(self))]
    async fn delete_menu_item_cascade(&self, id: i64) -> RepoResult<Vec<i64>> {
        let mut tx = self.pool.begin().await?;
        lock_menu_tree(&mut tx).await?;

        let subtree: Vec<i64> = sqlx::query_scalar(
            r#"
            WITH RECURSIVE subtree(id) AS (
                SELECT id FROM menu_items WHERE id = $1
                UNION
                SELECT m.id
                FROM menu_items m
                INNER JOIN subtree s ON m.parent_id = s.id
            )
            SELECT id FROM subtree
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        if subtree.is_empty() {
            return Err(RepositoryError::NotFound { entity: "menu item", id });
        }

        sqlx::query("DELETE FROM role_menu_permissions WHERE menu_item_id = ANY($1)")
            .bind(subtree.as_slice())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!(error = %e, menu_item_id = id, "Failed to delete permission links");
                e
            })?;
        sqlx::query("DELETE FROM menu_items WHERE id = ANY($1)")
            .bind(subtree.as_slice())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!(error = %e, menu_item_id = id, "Failed to delete menu subtree");
                e
            })?;

        tx.commit().await?;
        info!(menu_item_id = id, removed = subtree.len(), "Menu subtree deleted");
        Ok(subtree)
    }
}
