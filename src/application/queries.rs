use crate::domain::menu_item::{MenuItem, OpenMode};
use crate::domain::menu_tree::MenuIndex;
use crate::domain::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Query to get one menu item with its derived hierarchy values
#[derive(Debug, Clone)]
pub struct GetMenuItemQuery {
    pub id: i64,
}

/// Query to list every menu item (admin index), ordered by full path
#[derive(Debug, Clone)]
pub struct ListMenuItemsQuery;

/// Query to get the forest of all active menu items
#[derive(Debug, Clone)]
pub struct GetMenuTreeQuery;

/// Query to get active root items for incremental expansion
#[derive(Debug, Clone)]
pub struct GetRootItemsQuery;

/// Query to get the active children of one item
#[derive(Debug, Clone)]
pub struct GetChildrenQuery {
    pub parent_id: i64,
}

/// Query to get valid parent choices for an item (`None` while creating)
#[derive(Debug, Clone)]
pub struct GetAvailableParentsQuery {
    pub item_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct GetRoleQuery {
    pub id: i64,
}

/// Query to list every role with its visible menu count
#[derive(Debug, Clone)]
pub struct ListRolesQuery;

/// Query to list active roles for the demo role picker
#[derive(Debug, Clone)]
pub struct ListActiveRolesQuery;

/// Query to get the menu forest a role can see
#[derive(Debug, Clone)]
pub struct GetMenuForRoleQuery {
    pub role_id: i64,
}

/// Query to get the permission matrix of a role over all active items
#[derive(Debug, Clone)]
pub struct GetRolePermissionMatrixQuery {
    pub role_id: i64,
}

/// Query to summarize what a role can see
#[derive(Debug, Clone)]
pub struct GetRolePermissionsSummaryQuery {
    pub role_id: i64,
}

/// Query factory for creating queries
pub struct QueryFactory;

impl QueryFactory {
    pub fn get_menu_item(id: i64) -> GetMenuItemQuery {
        GetMenuItemQuery { id }
    }

    pub fn list_menu_items() -> ListMenuItemsQuery {
        ListMenuItemsQuery
    }

    pub fn get_menu_tree() -> GetMenuTreeQuery {
        GetMenuTreeQuery
    }

    pub fn get_root_items() -> GetRootItemsQuery {
        GetRootItemsQuery
    }

    pub fn get_children(parent_id: i64) -> GetChildrenQuery {
        GetChildrenQuery { parent_id }
    }

    pub fn get_available_parents(item_id: Option<i64>) -> GetAvailableParentsQuery {
        GetAvailableParentsQuery { item_id }
    }

    pub fn get_role(id: i64) -> GetRoleQuery {
        GetRoleQuery { id }
    }

    pub fn list_roles() -> ListRolesQuery {
        ListRolesQuery
    }

    pub fn list_active_roles() -> ListActiveRolesQuery {
        ListActiveRolesQuery
    }

    pub fn get_menu_for_role(role_id: i64) -> GetMenuForRoleQuery {
        GetMenuForRoleQuery { role_id }
    }

    pub fn get_role_permission_matrix(role_id: i64) -> GetRolePermissionMatrixQuery {
        GetRolePermissionMatrixQuery { role_id }
    }

    pub fn get_role_permissions_summary(role_id: i64) -> GetRolePermissionsSummaryQuery {
        GetRolePermissionsSummaryQuery { role_id }
    }
}

// Read models returned by the query handlers

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItemReadModel {
    pub id: i64,
    pub name: String,
    pub link: Option<String>,
    pub open_mode: Option<OpenMode>,
    pub order: i32,
    pub parent_id: Option<i64>,
    pub is_active: bool,
    pub level: usize,
    pub full_path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl MenuItemReadModel {
    pub fn from_item(item: &MenuItem, index: &MenuIndex<'_>) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            link: item.link.clone(),
            open_mode: item.open_mode,
            order: item.order,
            parent_id: item.parent_id,
            is_active: item.is_active,
            level: index.level(item),
            full_path: index.full_path(item),
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

/// One entry of an incrementally expanded menu level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuEntryReadModel {
    pub id: i64,
    pub name: String,
    pub link: Option<String>,
    pub open_mode: Option<OpenMode>,
    pub order: i32,
    pub has_children: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentOptionReadModel {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleReadModel {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub menu_count: usize,
}

impl RoleReadModel {
    pub fn from_role(role: Role, menu_count: usize) -> Self {
        Self {
            id: role.id,
            name: role.name,
            description: role.description,
            is_active: role.is_active,
            created_at: role.created_at,
            menu_count,
        }
    }
}

/// One row of a role's permission matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionMatrixRow {
    pub menu_item_id: i64,
    pub name: String,
    pub full_path: String,
    pub level: usize,
    pub has_link: bool,
    pub has_permission: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolePermissionMatrix {
    pub role_id: i64,
    pub role_name: String,
    pub rows: Vec<PermissionMatrixRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub id: i64,
    pub name: String,
    pub full_path: String,
    pub level: usize,
    pub has_link: bool,
    pub link: Option<String>,
    pub open_mode: Option<OpenMode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolePermissionsSummary {
    pub role_id: i64,
    pub role_name: String,
    pub total_menus: usize,
    pub menu_items: Vec<SummaryEntry>,
}
