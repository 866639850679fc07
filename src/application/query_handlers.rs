use super::queries::{
    GetAvailableParentsQuery, GetChildrenQuery, GetMenuForRoleQuery, GetMenuItemQuery,
    GetMenuTreeQuery, GetRolePermissionMatrixQuery, GetRolePermissionsSummaryQuery, GetRoleQuery,
    GetRootItemsQuery, ListActiveRolesQuery, ListMenuItemsQuery, ListRolesQuery,
    MenuEntryReadModel, MenuItemReadModel, ParentOptionReadModel, PermissionMatrixRow,
    RolePermissionMatrix, RolePermissionsSummary, RoleReadModel, SummaryEntry,
};
use super::query_bus::QueryHandler;
use super::services::{MenuError, PermissionService};
use crate::domain::menu_item::MenuItem;
use crate::domain::menu_tree::{MenuIndex, TreeNode, available_parents, build_tree};
use crate::domain::role::Role;
use crate::infrastructure::{MenuRepository, PermissionRepository, RoleRepository};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument};

fn entries_with_children(level: Vec<MenuItem>, active: &[MenuItem]) -> Vec<MenuEntryReadModel> {
    let parents: HashSet<i64> = active.iter().filter_map(|m| m.parent_id).collect();
    let mut level: Vec<MenuItem> = level.into_iter().filter(|m| m.is_active).collect();
    level.sort_by_key(|m| m.order);
    level
        .into_iter()
        .map(|m| MenuEntryReadModel {
            has_children: parents.contains(&m.id),
            id: m.id,
            name: m.name,
            link: m.link,
            open_mode: m.open_mode,
            order: m.order,
        })
        .collect()
}

// ============================================================================
// MENU QUERY HANDLERS
// ============================================================================

pub struct GetMenuItemQueryHandler {
    menu_repo: Arc<dyn MenuRepository + Send + Sync>,
}

impl GetMenuItemQueryHandler {
    pub fn new(menu_repo: Arc<dyn MenuRepository + Send + Sync>) -> Self {
        Self { menu_repo }
    }
}

#[async_trait]
impl QueryHandler<GetMenuItemQuery> for GetMenuItemQueryHandler {
    type Result = MenuItemReadModel;
    type Error = MenuError;

    #[instrument(name = "get_menu_item_query_handler", skip(self, query), fields(menu_item_id = query.id))]
    async fn handle(&self, query: GetMenuItemQuery) -> Result<Self::Result, Self::Error> {
        let items = self.menu_repo.list_all().await?;
        let index = MenuIndex::new(&items);
        let item = index.get(query.id).ok_or(MenuError::NotFound {
            entity: "menu item",
            id: query.id,
        })?;
        Ok(MenuItemReadModel::from_item(item, &index))
    }
}

/// Every item with level and full path, ordered by full path
pub struct ListMenuItemsQueryHandler {
    menu_repo: Arc<dyn MenuRepository + Send + Sync>,
}

impl ListMenuItemsQueryHandler {
    pub fn new(menu_repo: Arc<dyn MenuRepository + Send + Sync>) -> Self {
        Self { menu_repo }
    }
}

#[async_trait]
impl QueryHandler<ListMenuItemsQuery> for ListMenuItemsQueryHandler {
    type Result = Vec<MenuItemReadModel>;
    type Error = MenuError;

    #[instrument(name = "list_menu_items_query_handler", skip(self, _query))]
    async fn handle(&self, _query: ListMenuItemsQuery) -> Result<Self::Result, Self::Error> {
        let items = self.menu_repo.list_all().await?;
        let index = MenuIndex::new(&items);
        let mut models: Vec<MenuItemReadModel> = items
            .iter()
            .map(|item| MenuItemReadModel::from_item(item, &index))
            .collect();
        models.sort_by(|a, b| a.full_path.cmp(&b.full_path));
        Ok(models)
    }
}

pub struct GetMenuTreeQueryHandler {
    menu_repo: Arc<dyn MenuRepository + Send + Sync>,
}

impl GetMenuTreeQueryHandler {
    pub fn new(menu_repo: Arc<dyn MenuRepository + Send + Sync>) -> Self {
        Self { menu_repo }
    }
}

#[async_trait]
impl QueryHandler<GetMenuTreeQuery> for GetMenuTreeQueryHandler {
    type Result = Vec<TreeNode>;
    type Error = MenuError;

    #[instrument(name = "get_menu_tree_query_handler", skip(self, _query))]
    async fn handle(&self, _query: GetMenuTreeQuery) -> Result<Self::Result, Self::Error> {
        let active: Vec<MenuItem> = self
            .menu_repo
            .list_all()
            .await?
            .into_iter()
            .filter(|m| m.is_active)
            .collect();
        Ok(build_tree(active))
    }
}

pub struct GetRootItemsQueryHandler {
    menu_repo: Arc<dyn MenuRepository + Send + Sync>,
}

impl GetRootItemsQueryHandler {
    pub fn new(menu_repo: Arc<dyn MenuRepository + Send + Sync>) -> Self {
        Self { menu_repo }
    }
}

#[async_trait]
impl QueryHandler<GetRootItemsQuery> for GetRootItemsQueryHandler {
    type Result = Vec<MenuEntryReadModel>;
    type Error = MenuError;

    #[instrument(name = "get_root_items_query_handler", skip(self, _query))]
    async fn handle(&self, _query: GetRootItemsQuery) -> Result<Self::Result, Self::Error> {
        let roots = self.menu_repo.list_by_parent(None).await?;
        let active: Vec<MenuItem> = self
            .menu_repo
            .list_all()
            .await?
            .into_iter()
            .filter(|m| m.is_active)
            .collect();
        Ok(entries_with_children(roots, &active))
    }
}

pub struct GetChildrenQueryHandler {
    menu_repo: Arc<dyn MenuRepository + Send + Sync>,
}

impl GetChildrenQueryHandler {
    pub fn new(menu_repo: Arc<dyn MenuRepository + Send + Sync>) -> Self {
        Self { menu_repo }
    }
}

#[async_trait]
impl QueryHandler<GetChildrenQuery> for GetChildrenQueryHandler {
    type Result = Vec<MenuEntryReadModel>;
    type Error = MenuError;

    #[instrument(name = "get_children_query_handler", skip(self, query), fields(parent_id = query.parent_id))]
    async fn handle(&self, query: GetChildrenQuery) -> Result<Self::Result, Self::Error> {
        let all = self.menu_repo.list_all().await?;
        if !all.iter().any(|m| m.id == query.parent_id) {
            return Err(MenuError::NotFound {
                entity: "menu item",
                id: query.parent_id,
            });
        }
        let children = self.menu_repo.list_by_parent(Some(query.parent_id)).await?;
        let active: Vec<MenuItem> = all.into_iter().filter(|m| m.is_active).collect();
        Ok(entries_with_children(children, &active))
    }
}

/// Parent choices for the edit form: everything except the item and its subtree
pub struct GetAvailableParentsQueryHandler {
    menu_repo: Arc<dyn MenuRepository + Send + Sync>,
}

impl GetAvailableParentsQueryHandler {
    pub fn new(menu_repo: Arc<dyn MenuRepository + Send + Sync>) -> Self {
        Self { menu_repo }
    }
}

#[async_trait]
impl QueryHandler<GetAvailableParentsQuery> for GetAvailableParentsQueryHandler {
    type Result = Vec<ParentOptionReadModel>;
    type Error = MenuError;

    #[instrument(name = "get_available_parents_query_handler", skip(self, query), fields(item_id = ?query.item_id))]
    async fn handle(&self, query: GetAvailableParentsQuery) -> Result<Self::Result, Self::Error> {
        let items = self.menu_repo.list_all().await?;
        if let Some(id) = query.item_id {
            if !items.iter().any(|m| m.id == id) {
                return Err(MenuError::NotFound {
                    entity: "menu item",
                    id,
                });
            }
        }
        Ok(available_parents(query.item_id, &items)
            .into_iter()
            .map(|m| ParentOptionReadModel {
                id: m.id,
                name: m.name.clone(),
            })
            .collect())
    }
}

// ============================================================================
// ROLE QUERY HANDLERS
// ============================================================================

pub struct GetRoleQueryHandler {
    permission_service: Arc<PermissionService>,
}

impl GetRoleQueryHandler {
    pub fn new(permission_service: Arc<PermissionService>) -> Self {
        Self { permission_service }
    }
}

#[async_trait]
impl QueryHandler<GetRoleQuery> for GetRoleQueryHandler {
    type Result = RoleReadModel;
    type Error = MenuError;

    #[instrument(name = "get_role_query_handler", skip(self, query), fields(role_id = query.id))]
    async fn handle(&self, query: GetRoleQuery) -> Result<Self::Result, Self::Error> {
        let role = self.permission_service.require_role(query.id).await?;
        let visible = self.permission_service.visible_menu_items(query.id).await?;
        Ok(RoleReadModel::from_role(role, visible.len()))
    }
}

pub struct ListRolesQueryHandler {
    role_repo: Arc<dyn RoleRepository + Send + Sync>,
    permission_service: Arc<PermissionService>,
}

impl ListRolesQueryHandler {
    pub fn new(
        role_repo: Arc<dyn RoleRepository + Send + Sync>,
        permission_service: Arc<PermissionService>,
    ) -> Self {
        Self {
            role_repo,
            permission_service,
        }
    }
}

#[async_trait]
impl QueryHandler<ListRolesQuery> for ListRolesQueryHandler {
    type Result = Vec<RoleReadModel>;
    type Error = MenuError;

    #[instrument(name = "list_roles_query_handler", skip(self, _query))]
    async fn handle(&self, _query: ListRolesQuery) -> Result<Self::Result, Self::Error> {
        let mut roles = self.role_repo.list_roles().await?;
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        let counts: HashMap<i64, usize> = self.permission_service.visible_menu_counts().await?;
        Ok(roles
            .into_iter()
            .map(|role| {
                let count = counts.get(&role.id).copied().unwrap_or(0);
                RoleReadModel::from_role(role, count)
            })
            .collect())
    }
}

/// Active roles ordered by name, for the demo role picker
pub struct ListActiveRolesQueryHandler {
    role_repo: Arc<dyn RoleRepository + Send + Sync>,
}

impl ListActiveRolesQueryHandler {
    pub fn new(role_repo: Arc<dyn RoleRepository + Send + Sync>) -> Self {
        Self { role_repo }
    }
}

#[async_trait]
impl QueryHandler<ListActiveRolesQuery> for ListActiveRolesQueryHandler {
    type Result = Vec<Role>;
    type Error = MenuError;

    #[instrument(name = "list_active_roles_query_handler", skip(self, _query))]
    async fn handle(&self, _query: ListActiveRolesQuery) -> Result<Self::Result, Self::Error> {
        let mut roles: Vec<Role> = self
            .role_repo
            .list_roles()
            .await?
            .into_iter()
            .filter(|r| r.is_active)
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }
}

// ============================================================================
// PERMISSION QUERY HANDLERS
// ============================================================================

/// The role-filtered menu forest shown on the demo screen
pub struct GetMenuForRoleQueryHandler {
    permission_service: Arc<PermissionService>,
}

impl GetMenuForRoleQueryHandler {
    pub fn new(permission_service: Arc<PermissionService>) -> Self {
        Self { permission_service }
    }
}

#[async_trait]
impl QueryHandler<GetMenuForRoleQuery> for GetMenuForRoleQueryHandler {
    type Result = Vec<TreeNode>;
    type Error = MenuError;

    #[instrument(name = "get_menu_for_role_query_handler", skip(self, query), fields(role_id = query.role_id))]
    async fn handle(&self, query: GetMenuForRoleQuery) -> Result<Self::Result, Self::Error> {
        self.permission_service.require_role(query.role_id).await?;
        let visible = self
            .permission_service
            .visible_menu_items(query.role_id)
            .await?;
        info!(visible = visible.len(), "Building role menu");
        Ok(build_tree(visible))
    }
}

pub struct GetRolePermissionMatrixQueryHandler {
    menu_repo: Arc<dyn MenuRepository + Send + Sync>,
    permission_repo: Arc<dyn PermissionRepository + Send + Sync>,
    permission_service: Arc<PermissionService>,
}

impl GetRolePermissionMatrixQueryHandler {
    pub fn new(
        menu_repo: Arc<dyn MenuRepository + Send + Sync>,
        permission_repo: Arc<dyn PermissionRepository + Send + Sync>,
        permission_service: Arc<PermissionService>,
    ) -> Self {
        Self {
            menu_repo,
            permission_repo,
            permission_service,
        }
    }
}

#[async_trait]
impl QueryHandler<GetRolePermissionMatrixQuery> for GetRolePermissionMatrixQueryHandler {
    type Result = RolePermissionMatrix;
    type Error = MenuError;

    #[instrument(name = "get_role_permission_matrix_query_handler", skip(self, query), fields(role_id = query.role_id))]
    async fn handle(
        &self,
        query: GetRolePermissionMatrixQuery,
    ) -> Result<Self::Result, Self::Error> {
        let role = self.permission_service.require_role(query.role_id).await?;
        let items = self.menu_repo.list_all().await?;
        let granted: HashSet<i64> = self
            .permission_repo
            .list_permissions_by_role(query.role_id)
            .await?
            .into_iter()
            .filter(|link| link.grants(query.role_id))
            .map(|link| link.menu_item_id)
            .collect();

        let index = MenuIndex::new(&items);
        let mut rows: Vec<PermissionMatrixRow> = items
            .iter()
            .filter(|item| item.is_active)
            .map(|item| PermissionMatrixRow {
                menu_item_id: item.id,
                name: item.name.clone(),
                full_path: index.full_path(item),
                level: index.level(item),
                has_link: item.has_link(),
                has_permission: granted.contains(&item.id),
            })
            .collect();
        rows.sort_by(|a, b| a.full_path.cmp(&b.full_path));

        Ok(RolePermissionMatrix {
            role_id: role.id,
            role_name: role.name,
            rows,
        })
    }
}

pub struct GetRolePermissionsSummaryQueryHandler {
    menu_repo: Arc<dyn MenuRepository + Send + Sync>,
    permission_service: Arc<PermissionService>,
}

impl GetRolePermissionsSummaryQueryHandler {
    pub fn new(
        menu_repo: Arc<dyn MenuRepository + Send + Sync>,
        permission_service: Arc<PermissionService>,
    ) -> Self {
        Self {
            menu_repo,
            permission_service,
        }
    }
}

#[async_trait]
impl QueryHandler<GetRolePermissionsSummaryQuery> for GetRolePermissionsSummaryQueryHandler {
    type Result = RolePermissionsSummary;
    type Error = MenuError;

    #[instrument(name = "get_role_permissions_summary_query_handler", skip(self, query), fields(role_id = query.role_id))]
    async fn handle(
        &self,
        query: GetRolePermissionsSummaryQuery,
    ) -> Result<Self::Result, Self::Error> {
        let role = self.permission_service.require_role(query.role_id).await?;
        let visible = self
            .permission_service
            .visible_menu_items(query.role_id)
            .await?;
        let items = self.menu_repo.list_all().await?;
        let index = MenuIndex::new(&items);

        let mut menu_items: Vec<SummaryEntry> = visible
            .iter()
            .map(|item| SummaryEntry {
                id: item.id,
                name: item.name.clone(),
                full_path: index.full_path(item),
                level: index.level(item),
                has_link: item.has_link(),
                link: item.link.clone(),
                open_mode: item.open_mode,
            })
            .collect();
        menu_items.sort_by(|a, b| a.full_path.cmp(&b.full_path));

        Ok(RolePermissionsSummary {
            role_id: role.id,
            role_name: role.name,
            total_menus: menu_items.len(),
            menu_items,
        })
    }
}
