use crate::domain::menu_item::{MenuItem, MenuItemData};
use crate::domain::menu_tree::{collect_descendant_ids, would_create_cycle};
use crate::domain::permission::RoleMenuPermission;
use crate::domain::role::{Role, RoleData};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

// Infrastructure layer: persistence adapters for menus, roles and permission links

pub mod menu_repository;
pub use menu_repository::PostgresMenuRepository;

pub mod role_repository;
pub use role_repository::PostgresRoleRepository;

pub mod permission_repository;
pub use permission_repository::PostgresPermissionRepository;

/// Failures reported by every repository implementation.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("order {order} is already used at parent level {parent_id:?}")]
    DuplicateOrder { parent_id: Option<i64>, order: i32 },
    #[error("role name '{0}' is already taken")]
    DuplicateRoleName(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("menu item {item_id} cannot be placed under {parent_id}")]
    WouldCreateCycle { item_id: i64, parent_id: i64 },
    #[error("store state is unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait MenuRepository: Send + Sync {
    async fn list_all(&self) -> RepoResult<Vec<MenuItem>>;
    async fn list_by_parent(&self, parent_id: Option<i64>) -> RepoResult<Vec<MenuItem>>;
    async fn find_menu_item(&self, id: i64) -> RepoResult<Option<MenuItem>>;
    /// Checks parent existence and sibling order uniqueness and inserts, atomically.
    async fn create_menu_item(&self, data: MenuItemData) -> RepoResult<MenuItem>;
    /// Same checks as create plus cycle detection, self excluded from the order check.
    async fn update_menu_item(&self, id: i64, data: MenuItemData) -> RepoResult<MenuItem>;
    /// Removes the item, its descendants and every permission link to them.
    /// Returns the removed ids.
    async fn delete_menu_item_cascade(&self, id: i64) -> RepoResult<Vec<i64>>;
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn list_roles(&self) -> RepoResult<Vec<Role>>;
    async fn find_role(&self, id: i64) -> RepoResult<Option<Role>>;
    async fn create_role(&self, data: RoleData) -> RepoResult<Role>;
    async fn update_role(&self, id: i64, data: RoleData) -> RepoResult<Role>;
    /// Removes the role together with its permission links.
    async fn delete_role(&self, id: i64) -> RepoResult<()>;
}

#[async_trait]
pub trait PermissionRepository: Send + Sync {
    async fn list_permissions(&self) -> RepoResult<Vec<RoleMenuPermission>>;
    async fn list_permissions_by_role(&self, role_id: i64) -> RepoResult<Vec<RoleMenuPermission>>;
    async fn upsert_permission(
        &self,
        role_id: i64,
        menu_item_id: i64,
        is_active: bool,
    ) -> RepoResult<RoleMenuPermission>;
    /// Flips the link state; a missing link is created active.
    async fn toggle_permission(&self, role_id: i64, menu_item_id: i64)
    -> RepoResult<RoleMenuPermission>;
    /// Upserts several links of one role in a single atomic write.
    async fn upsert_permissions(&self, role_id: i64, states: &[(i64, bool)]) -> RepoResult<()>;
}

#[derive(Debug, Default)]
struct StoreState {
    menu_items: Vec<MenuItem>,
    roles: Vec<Role>,
    links: Vec<RoleMenuPermission>,
    next_menu_id: i64,
    next_role_id: i64,
}

impl StoreState {
    fn check_menu_write(&self, id: Option<i64>, data: &MenuItemData) -> RepoResult<()> {
        if let Some(parent_id) = data.parent_id {
            if !self.menu_items.iter().any(|m| m.id == parent_id) {
                return Err(RepositoryError::NotFound {
                    entity: "parent menu item",
                    id: parent_id,
                });
            }
            if let Some(item_id) = id {
                if would_create_cycle(item_id, parent_id, &self.menu_items) {
                    return Err(RepositoryError::WouldCreateCycle { item_id, parent_id });
                }
            }
        }
        let clash = self
            .menu_items
            .iter()
            .any(|m| Some(m.id) != id && m.sits_under(data.parent_id) && m.order == data.order);
        if clash {
            return Err(RepositoryError::DuplicateOrder {
                parent_id: data.parent_id,
                order: data.order,
            });
        }
        Ok(())
    }

    fn check_role_name(&self, id: Option<i64>, name: &str) -> RepoResult<()> {
        if self.roles.iter().any(|r| Some(r.id) != id && r.has_name(name)) {
            return Err(RepositoryError::DuplicateRoleName(name.to_string()));
        }
        Ok(())
    }

    fn upsert_link(&mut self, role_id: i64, menu_item_id: i64, is_active: bool) -> RoleMenuPermission {
        match self
            .links
            .iter_mut()
            .find(|l| l.role_id == role_id && l.menu_item_id == menu_item_id)
        {
            Some(link) => {
                link.is_active = is_active;
                link.clone()
            }
            None => {
                let link = RoleMenuPermission::new(role_id, menu_item_id, is_active);
                self.links.push(link.clone());
                link
            }
        }
    }

    fn ensure_link_targets(&self, role_id: i64, menu_item_id: i64) -> RepoResult<()> {
        if !self.roles.iter().any(|r| r.id == role_id) {
            return Err(RepositoryError::NotFound { entity: "role", id: role_id });
        }
        if !self.menu_items.iter().any(|m| m.id == menu_item_id) {
            return Err(RepositoryError::NotFound {
                entity: "menu item",
                id: menu_item_id,
            });
        }
        Ok(())
    }
}

/// In-memory store backing all three repositories.
///
/// Every operation runs under one lock, so check-then-write sequences and the
/// cascade delete are atomic with respect to each other.
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState {
                next_menu_id: 1,
                next_role_id: 1,
                ..StoreState::default()
            }),
        }
    }

    /// Seeds the store with existing records, keeping their ids.
    pub fn with_data(
        menu_items: Vec<MenuItem>,
        roles: Vec<Role>,
        links: Vec<RoleMenuPermission>,
    ) -> Self {
        let next_menu_id = menu_items.iter().map(|m| m.id).max().unwrap_or(0) + 1;
        let next_role_id = roles.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        Self {
            state: Mutex::new(StoreState {
                menu_items,
                roles,
                links,
                next_menu_id,
                next_role_id,
            }),
        }
    }

    fn state(&self) -> RepoResult<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|e| RepositoryError::Unavailable(e.to_string()))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MenuRepository for InMemoryStore {
    async fn list_all(&self) -> RepoResult<Vec<MenuItem>> {
        Ok(self.state()?.menu_items.clone())
    }

    async fn list_by_parent(&self, parent_id: Option<i64>) -> RepoResult<Vec<MenuItem>> {
        Ok(self
            .state()?
            .menu_items
            .iter()
            .filter(|m| m.sits_under(parent_id))
            .cloned()
            .collect())
    }

    async fn find_menu_item(&self, id: i64) -> RepoResult<Option<MenuItem>> {
        Ok(self.state()?.menu_items.iter().find(|m| m.id == id).cloned())
    }

    async fn create_menu_item(&self, data: MenuItemData) -> RepoResult<MenuItem> {
        let mut state = self.state()?;
        state.check_menu_write(None, &data)?;
        let id = state.next_menu_id;
        state.next_menu_id += 1;
        let item = MenuItem::from_data(id, data, Utc::now());
        state.menu_items.push(item.clone());
        Ok(item)
    }

    async fn update_menu_item(&self, id: i64, data: MenuItemData) -> RepoResult<MenuItem> {
        let mut state = self.state()?;
        if !state.menu_items.iter().any(|m| m.id == id) {
            return Err(RepositoryError::NotFound { entity: "menu item", id });
        }
        state.check_menu_write(Some(id), &data)?;
        let item = state
            .menu_items
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(RepositoryError::NotFound { entity: "menu item", id })?;
        item.apply(data, Utc::now());
        Ok(item.clone())
    }

    async fn delete_menu_item_cascade(&self, id: i64) -> RepoResult<Vec<i64>> {
        let mut state = self.state()?;
        if !state.menu_items.iter().any(|m| m.id == id) {
            return Err(RepositoryError::NotFound { entity: "menu item", id });
        }
        let mut doomed: HashSet<i64> = collect_descendant_ids(id, &state.menu_items);
        doomed.insert(id);

        state.links.retain(|l| !doomed.contains(&l.menu_item_id));
        let removed: Vec<i64> = state
            .menu_items
            .iter()
            .filter(|m| doomed.contains(&m.id))
            .map(|m| m.id)
            .collect();
        state.menu_items.retain(|m| !doomed.contains(&m.id));
        Ok(removed)
    }
}

#[async_trait]
impl RoleRepository for InMemoryStore {
    async fn list_roles(&self) -> RepoResult<Vec<Role>> {
        Ok(self.state()?.roles.clone())
    }

    async fn find_role(&self, id: i64) -> RepoResult<Option<Role>> {
        Ok(self.state()?.roles.iter().find(|r| r.id == id).cloned())
    }

    async fn create_role(&self, data: RoleData) -> RepoResult<Role> {
        let mut state = self.state()?;
        state.check_role_name(None, &data.name)?;
        let id = state.next_role_id;
        state.next_role_id += 1;
        let role = Role::from_data(id, data, Utc::now());
        state.roles.push(role.clone());
        Ok(role)
    }

    async fn update_role(&self, id: i64, data: RoleData) -> RepoResult<Role> {
        let mut state = self.state()?;
        state.check_role_name(Some(id), &data.name)?;
        let role = state
            .roles
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepositoryError::NotFound { entity: "role", id })?;
        role.apply(data);
        Ok(role.clone())
    }

    async fn delete_role(&self, id: i64) -> RepoResult<()> {
        let mut state = self.state()?;
        if !state.roles.iter().any(|r| r.id == id) {
            return Err(RepositoryError::NotFound { entity: "role", id });
        }
        state.links.retain(|l| l.role_id != id);
        state.roles.retain(|r| r.id != id);
        Ok(())
    }
}

#[async_trait]
impl PermissionRepository for InMemoryStore {
    async fn list_permissions(&self) -> RepoResult<Vec<RoleMenuPermission>> {
        Ok(self.state()?.links.clone())
    }

    async fn list_permissions_by_role(&self, role_id: i64) -> RepoResult<Vec<RoleMenuPermission>> {
        Ok(self
            .state()?
            .links
            .iter()
            .filter(|l| l.role_id == role_id)
            .cloned()
            .collect())
    }

    async fn upsert_permission(
        &self,
        role_id: i64,
        menu_item_id: i64,
        is_active: bool,
    ) -> RepoResult<RoleMenuPermission> {
        let mut state = self.state()?;
        state.ensure_link_targets(role_id, menu_item_id)?;
        Ok(state.upsert_link(role_id, menu_item_id, is_active))
    }

    async fn toggle_permission(
        &self,
        role_id: i64,
        menu_item_id: i64,
    ) -> RepoResult<RoleMenuPermission> {
        let mut state = self.state()?;
        state.ensure_link_targets(role_id, menu_item_id)?;
        let currently_active = state
            .links
            .iter()
            .any(|l| l.role_id == role_id && l.menu_item_id == menu_item_id && l.is_active);
        Ok(state.upsert_link(role_id, menu_item_id, !currently_active))
    }

    async fn upsert_permissions(&self, role_id: i64, states: &[(i64, bool)]) -> RepoResult<()> {
        let mut state = self.state()?;
        for &(menu_item_id, _) in states {
            state.ensure_link_targets(role_id, menu_item_id)?;
        }
        for &(menu_item_id, is_active) in states {
            state.upsert_link(role_id, menu_item_id, is_active);
        }
        Ok(())
    }
}
