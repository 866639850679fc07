use serde::{Deserialize, Serialize};

/// Raw menu item input as received from a client, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItemDraft {
    pub name: String,
    pub link: Option<String>,
    pub open_mode: Option<String>,
    pub order: i32,
    pub parent_id: Option<i64>,
    pub is_active: bool,
}

/// Raw role input, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleDraft {
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

/// Command to create a menu item
#[derive(Debug, Clone)]
pub struct CreateMenuItemCommand {
    pub draft: MenuItemDraft,
}

/// Command to update a menu item in place
#[derive(Debug, Clone)]
pub struct UpdateMenuItemCommand {
    pub id: i64,
    pub draft: MenuItemDraft,
}

/// Command to delete a menu item with all of its descendants
#[derive(Debug, Clone)]
pub struct DeleteMenuItemCommand {
    pub id: i64,
}

#[derive(Debug, Clone)]
pub struct CreateRoleCommand {
    pub draft: RoleDraft,
}

#[derive(Debug, Clone)]
pub struct UpdateRoleCommand {
    pub id: i64,
    pub draft: RoleDraft,
}

#[derive(Debug, Clone)]
pub struct DeleteRoleCommand {
    pub id: i64,
}

/// Command to create or update a single permission link
#[derive(Debug, Clone)]
pub struct SetPermissionCommand {
    pub role_id: i64,
    pub menu_item_id: i64,
    pub is_active: bool,
}

/// Command to flip a permission link on or off
#[derive(Debug, Clone)]
pub struct TogglePermissionCommand {
    pub role_id: i64,
    pub menu_item_id: i64,
}

/// Command to make a role's links match a selection: selected items become
/// active, every other existing link of the role is switched off
#[derive(Debug, Clone)]
pub struct UpdateRolePermissionsCommand {
    pub role_id: i64,
    pub selected_menu_ids: Vec<i64>,
}

/// Command to grant or revoke every active menu item for a role
#[derive(Debug, Clone)]
pub struct BulkAssignPermissionsCommand {
    pub role_id: i64,
    pub grant: bool,
}

/// Command factory for creating commands
pub struct CommandFactory;

impl CommandFactory {
    pub fn create_menu_item(draft: MenuItemDraft) -> CreateMenuItemCommand {
        CreateMenuItemCommand { draft }
    }

    pub fn update_menu_item(id: i64, draft: MenuItemDraft) -> UpdateMenuItemCommand {
        UpdateMenuItemCommand { id, draft }
    }

    pub fn delete_menu_item(id: i64) -> DeleteMenuItemCommand {
        DeleteMenuItemCommand { id }
    }

    pub fn create_role(draft: RoleDraft) -> CreateRoleCommand {
        CreateRoleCommand { draft }
    }

    pub fn update_role(id: i64, draft: RoleDraft) -> UpdateRoleCommand {
        UpdateRoleCommand { id, draft }
    }

    pub fn delete_role(id: i64) -> DeleteRoleCommand {
        DeleteRoleCommand { id }
    }

    pub fn set_permission(role_id: i64, menu_item_id: i64, is_active: bool) -> SetPermissionCommand {
        SetPermissionCommand {
            role_id,
            menu_item_id,
            is_active,
        }
    }

    pub fn toggle_permission(role_id: i64, menu_item_id: i64) -> TogglePermissionCommand {
        TogglePermissionCommand {
            role_id,
            menu_item_id,
        }
    }

    pub fn update_role_permissions(
        role_id: i64,
        selected_menu_ids: Vec<i64>,
    ) -> UpdateRolePermissionsCommand {
        UpdateRolePermissionsCommand {
            role_id,
            selected_menu_ids,
        }
    }

    /// `action` follows the admin form: "grant" grants, anything else revokes.
    pub fn bulk_assign_permissions(role_id: i64, action: &str) -> BulkAssignPermissionsCommand {
        BulkAssignPermissionsCommand {
            role_id,
            grant: action.eq_ignore_ascii_case("grant"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_assign_action() {
        assert!(CommandFactory::bulk_assign_permissions(1, "grant").grant);
        assert!(CommandFactory::bulk_assign_permissions(1, "GRANT").grant);
        assert!(!CommandFactory::bulk_assign_permissions(1, "revoke").grant);
        assert!(!CommandFactory::bulk_assign_permissions(1, "").grant);
    }
}
