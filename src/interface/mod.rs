// Interface layer: HTTP API, DTOs

use crate::application::commands::{MenuItemDraft, RoleDraft};
use crate::application::queries::{
    MenuEntryReadModel, MenuItemReadModel, ParentOptionReadModel, PermissionMatrixRow,
    RolePermissionMatrix, RolePermissionsSummary, RoleReadModel, SummaryEntry,
};
use crate::application::services::{FieldError, MenuError};
use crate::domain::menu_item::{MenuItem, OpenMode};
use crate::domain::menu_tree::{TreeNode, forest_size};
use crate::domain::permission::RoleMenuPermission;
use crate::domain::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

fn default_true() -> bool {
    true
}

fn mode_name(mode: Option<OpenMode>) -> Option<String> {
    mode.map(|m| m.as_str().to_string())
}

// --- MENU ITEMS ---

#[derive(Deserialize, ToSchema)]
pub struct MenuItemRequest {
    pub name: String,
    pub link: Option<String>,
    /// "redirect" or "newtab"; required when `link` is set
    pub open_mode: Option<String>,
    pub order: i32,
    pub parent_id: Option<i64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl From<MenuItemRequest> for MenuItemDraft {
    fn from(req: MenuItemRequest) -> Self {
        MenuItemDraft {
            name: req.name,
            link: req.link,
            open_mode: req.open_mode,
            order: req.order,
            parent_id: req.parent_id,
            is_active: req.is_active,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MenuItemResponse {
    pub id: i64,
    pub name: String,
    pub link: Option<String>,
    pub open_mode: Option<String>,
    pub order: i32,
    pub parent_id: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<MenuItem> for MenuItemResponse {
    fn from(item: MenuItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            link: item.link,
            open_mode: mode_name(item.open_mode),
            order: item.order,
            parent_id: item.parent_id,
            is_active: item.is_active,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MenuItemDetailResponse {
    pub id: i64,
    pub name: String,
    pub link: Option<String>,
    pub open_mode: Option<String>,
    pub order: i32,
    pub parent_id: Option<i64>,
    pub is_active: bool,
    /// Number of ancestors; roots are level 0
    pub level: usize,
    /// Ancestor names joined with " > ", ending with this item
    pub full_path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<MenuItemReadModel> for MenuItemDetailResponse {
    fn from(model: MenuItemReadModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            link: model.link,
            open_mode: mode_name(model.open_mode),
            order: model.order,
            parent_id: model.parent_id,
            is_active: model.is_active,
            level: model.level,
            full_path: model.full_path,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MenuItemsListResponse {
    pub items: Vec<MenuItemDetailResponse>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MenuNodeResponse {
    pub id: i64,
    pub name: String,
    pub link: Option<String>,
    pub open_mode: Option<String>,
    pub order: i32,
    #[schema(no_recursion)]
    pub children: Vec<MenuNodeResponse>,
}

impl From<TreeNode> for MenuNodeResponse {
    fn from(node: TreeNode) -> Self {
        Self {
            id: node.item.id,
            name: node.item.name,
            link: node.item.link,
            open_mode: mode_name(node.item.open_mode),
            order: node.item.order,
            children: node.children.into_iter().map(Self::from).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MenuTreeResponse {
    pub nodes: Vec<MenuNodeResponse>,
    /// Number of items across the whole forest
    pub total: usize,
}

impl From<Vec<TreeNode>> for MenuTreeResponse {
    fn from(forest: Vec<TreeNode>) -> Self {
        let total = forest_size(&forest);
        Self {
            nodes: forest.into_iter().map(MenuNodeResponse::from).collect(),
            total,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MenuEntryResponse {
    pub id: i64,
    pub name: String,
    pub link: Option<String>,
    pub open_mode: Option<String>,
    pub order: i32,
    pub has_children: bool,
}

impl From<MenuEntryReadModel> for MenuEntryResponse {
    fn from(model: MenuEntryReadModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            link: model.link,
            open_mode: mode_name(model.open_mode),
            order: model.order,
            has_children: model.has_children,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MenuEntriesResponse {
    pub items: Vec<MenuEntryResponse>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailableParentsParams {
    /// The item being edited; omit while creating a new item
    pub item_id: Option<i64>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ParentOptionResponse {
    pub id: i64,
    pub name: String,
}

impl From<ParentOptionReadModel> for ParentOptionResponse {
    fn from(model: ParentOptionReadModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ParentOptionsResponse {
    pub parents: Vec<ParentOptionResponse>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DeleteMenuItemResponse {
    /// The item itself plus every descendant
    pub removed: usize,
}

// --- ROLES ---

#[derive(Deserialize, ToSchema)]
pub struct RoleRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl From<RoleRequest> for RoleDraft {
    fn from(req: RoleRequest) -> Self {
        RoleDraft {
            name: req.name,
            description: req.description,
            is_active: req.is_active,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct RoleResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu_count: Option<usize>,
}

impl From<Role> for RoleResponse {
    fn from(role: Role) -> Self {
        Self {
            id: role.id,
            name: role.name,
            description: role.description,
            is_active: role.is_active,
            created_at: role.created_at,
            menu_count: None,
        }
    }
}

impl From<RoleReadModel> for RoleResponse {
    fn from(model: RoleReadModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            is_active: model.is_active,
            created_at: model.created_at,
            menu_count: Some(model.menu_count),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct RolesListResponse {
    pub roles: Vec<RoleResponse>,
}

// --- PERMISSIONS ---

#[derive(Deserialize, ToSchema)]
pub struct SetPermissionRequest {
    pub role_id: i64,
    pub menu_item_id: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct TogglePermissionRequest {
    pub menu_item_id: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateRolePermissionsRequest {
    pub selected_menu_ids: Vec<i64>,
}

#[derive(Deserialize, ToSchema)]
pub struct BulkAssignRequest {
    /// "grant" grants every active item; anything else revokes
    pub action: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PermissionResponse {
    pub role_id: i64,
    pub menu_item_id: i64,
    pub is_active: bool,
}

impl From<RoleMenuPermission> for PermissionResponse {
    fn from(link: RoleMenuPermission) -> Self {
        Self {
            role_id: link.role_id,
            menu_item_id: link.menu_item_id,
            is_active: link.is_active,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PermissionCountResponse {
    pub role_id: i64,
    pub count: usize,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PermissionMatrixRowResponse {
    pub menu_item_id: i64,
    pub name: String,
    pub full_path: String,
    pub level: usize,
    pub has_link: bool,
    pub has_permission: bool,
}

impl From<PermissionMatrixRow> for PermissionMatrixRowResponse {
    fn from(row: PermissionMatrixRow) -> Self {
        Self {
            menu_item_id: row.menu_item_id,
            name: row.name,
            full_path: row.full_path,
            level: row.level,
            has_link: row.has_link,
            has_permission: row.has_permission,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PermissionMatrixResponse {
    pub role_id: i64,
    pub role_name: String,
    pub rows: Vec<PermissionMatrixRowResponse>,
}

impl From<RolePermissionMatrix> for PermissionMatrixResponse {
    fn from(matrix: RolePermissionMatrix) -> Self {
        Self {
            role_id: matrix.role_id,
            role_name: matrix.role_name,
            rows: matrix.rows.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct SummaryEntryResponse {
    pub id: i64,
    pub name: String,
    pub full_path: String,
    pub level: usize,
    pub has_link: bool,
    pub link: Option<String>,
    pub open_mode: Option<String>,
}

impl From<SummaryEntry> for SummaryEntryResponse {
    fn from(entry: SummaryEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            full_path: entry.full_path,
            level: entry.level,
            has_link: entry.has_link,
            link: entry.link,
            open_mode: mode_name(entry.open_mode),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PermissionSummaryResponse {
    pub role_id: i64,
    pub role_name: String,
    pub total_menus: usize,
    pub menu_items: Vec<SummaryEntryResponse>,
}

impl From<RolePermissionsSummary> for PermissionSummaryResponse {
    fn from(summary: RolePermissionsSummary) -> Self {
        Self {
            role_id: summary.role_id,
            role_name: summary.role_name,
            total_menus: summary.total_menus,
            menu_items: summary.menu_items.into_iter().map(Into::into).collect(),
        }
    }
}

// --- ERRORS ---

#[derive(Serialize, Deserialize, ToSchema)]
pub struct FieldErrorResponse {
    pub field: String,
    pub message: String,
}

impl From<&FieldError> for FieldErrorResponse {
    fn from(e: &FieldError) -> Self {
        Self {
            field: e.field.clone(),
            message: e.message.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_errors: Vec<FieldErrorResponse>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            field_errors: Vec::new(),
        }
    }
}

impl From<&MenuError> for ErrorResponse {
    fn from(e: &MenuError) -> Self {
        Self {
            error: e.to_string(),
            field_errors: e.field_errors().iter().map(Into::into).collect(),
        }
    }
}

pub mod app_state;
pub mod http_handlers;

pub use app_state::AppState;
pub use http_handlers::{
    bulk_assign_permissions_handler, create_menu_item_handler, create_role_handler,
    delete_menu_item_handler, delete_role_handler, get_available_parents_handler,
    get_children_handler, get_menu_for_role_handler, get_menu_item_handler,
    get_menu_tree_handler, get_role_handler, get_role_permission_matrix_handler,
    get_role_permissions_summary_handler, get_root_items_handler, list_active_roles_handler,
    list_menu_items_handler, list_roles_handler, set_permission_handler,
    toggle_permission_handler, update_menu_item_handler, update_role_handler,
    update_role_permissions_handler, v1_routes,
};
