use crate::domain::menu_item::MenuItem;
use crate::domain::permission::menus_for_role;
use crate::domain::role::Role;
use crate::infrastructure::{MenuRepository, PermissionRepository, RepositoryError, RoleRepository};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{error, instrument};

/// A validation failure attached to one input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors returned by every menu, role and permission operation.
#[derive(Debug, thiserror::Error)]
pub enum MenuError {
    #[error("Validation failed: {}", join_fields(.0))]
    Validation(Vec<FieldError>),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("Menu item {item_id} cannot be moved under {parent_id}: it would become its own ancestor")]
    CycleRisk { item_id: i64, parent_id: i64 },
    #[error("Store failure: {0}")]
    Store(#[source] RepositoryError),
}

impl MenuError {
    pub fn field(field: &str, message: &str) -> Self {
        MenuError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            MenuError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

impl From<RepositoryError> for MenuError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::DuplicateOrder { .. } => MenuError::field(
                "order",
                "Another item at the same level already uses this order",
            ),
            RepositoryError::DuplicateRoleName(_) => {
                MenuError::field("name", "A role with this name already exists")
            }
            RepositoryError::NotFound { entity, id } => MenuError::NotFound { entity, id },
            RepositoryError::WouldCreateCycle { item_id, parent_id } => {
                MenuError::CycleRisk { item_id, parent_id }
            }
            other => {
                error!(error = %other, "Store failure");
                MenuError::Store(other)
            }
        }
    }
}

/// Resolves which menu items each role can see.
pub struct PermissionService {
    menu_repo: Arc<dyn MenuRepository + Send + Sync>,
    role_repo: Arc<dyn RoleRepository + Send + Sync>,
    permission_repo: Arc<dyn PermissionRepository + Send + Sync>,
}

impl PermissionService {
    pub fn new(
        menu_repo: Arc<dyn MenuRepository + Send + Sync>,
        role_repo: Arc<dyn RoleRepository + Send + Sync>,
        permission_repo: Arc<dyn PermissionRepository + Send + Sync>,
    ) -> Self {
        Self {
            menu_repo,
            role_repo,
            permission_repo,
        }
    }

    pub async fn require_role(&self, role_id: i64) -> Result<Role, MenuError> {
        self.role_repo
            .find_role(role_id)
            .await?
            .ok_or(MenuError::NotFound {
                entity: "role",
                id: role_id,
            })
    }

    /// Active menu items the role has an active link to.
    #[instrument(name = "visible_menu_items", skip(self))]
    pub async fn visible_menu_items(&self, role_id: i64) -> Result<Vec<MenuItem>, MenuError> {
        let links = self.permission_repo.list_permissions_by_role(role_id).await?;
        let items = self.menu_repo.list_all().await?;
        Ok(menus_for_role(role_id, &links, &items))
    }

    /// Number of visible menu items per role id, for every role that has any.
    #[instrument(name = "visible_menu_counts", skip(self))]
    pub async fn visible_menu_counts(&self) -> Result<HashMap<i64, usize>, MenuError> {
        let links = self.permission_repo.list_permissions().await?;
        let items = self.menu_repo.list_all().await?;
        let mut counts = HashMap::new();
        let mut role_ids: Vec<i64> = links.iter().map(|l| l.role_id).collect();
        role_ids.sort_unstable();
        role_ids.dedup();
        for role_id in role_ids {
            counts.insert(role_id, menus_for_role(role_id, &links, &items).len());
        }
        Ok(counts)
    }
}
