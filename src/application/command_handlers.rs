use super::command_bus::CommandHandler;
use super::commands::{
    BulkAssignPermissionsCommand, CreateMenuItemCommand, CreateRoleCommand, DeleteMenuItemCommand,
    DeleteRoleCommand, SetPermissionCommand, TogglePermissionCommand, UpdateMenuItemCommand,
    UpdateRoleCommand, UpdateRolePermissionsCommand,
};
use super::services::{MenuError, PermissionService};
use super::validators::{CommandValidator, MenuItemValidator, RoleValidator};
use crate::domain::menu_item::MenuItem;
use crate::domain::permission::RoleMenuPermission;
use crate::domain::role::Role;
use crate::infrastructure::{MenuRepository, PermissionRepository, RoleRepository};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};

// ============================================================================
// MENU ITEM COMMAND HANDLERS
// ============================================================================

/// Create menu item command handler
pub struct CreateMenuItemCommandHandler {
    menu_repo: Arc<dyn MenuRepository + Send + Sync>,
    validator: MenuItemValidator,
}

impl CreateMenuItemCommandHandler {
    pub fn new(menu_repo: Arc<dyn MenuRepository + Send + Sync>) -> Self {
        Self {
            menu_repo,
            validator: MenuItemValidator,
        }
    }
}

#[async_trait]
impl CommandHandler<CreateMenuItemCommand> for CreateMenuItemCommandHandler {
    type Result = MenuItem;
    type Error = MenuError;

    #[instrument(name = "create_menu_item_command_handler", skip(self, command))]
    async fn handle(&self, command: CreateMenuItemCommand) -> Result<Self::Result, Self::Error> {
        let data = self.validator.validate(&command.draft)?;
        let item = self.menu_repo.create_menu_item(data).await?;
        info!(menu_item_id = item.id, "Menu item created");
        Ok(item)
    }
}

/// Update menu item command handler
pub struct UpdateMenuItemCommandHandler {
    menu_repo: Arc<dyn MenuRepository + Send + Sync>,
    validator: MenuItemValidator,
}

impl UpdateMenuItemCommandHandler {
    pub fn new(menu_repo: Arc<dyn MenuRepository + Send + Sync>) -> Self {
        Self {
            menu_repo,
            validator: MenuItemValidator,
        }
    }
}

#[async_trait]
impl CommandHandler<UpdateMenuItemCommand> for UpdateMenuItemCommandHandler {
    type Result = MenuItem;
    type Error = MenuError;

    #[instrument(name = "update_menu_item_command_handler", skip(self, command), fields(menu_item_id = command.id))]
    async fn handle(&self, command: UpdateMenuItemCommand) -> Result<Self::Result, Self::Error> {
        let data = self.validator.validate(&command.draft)?;
        if data.parent_id == Some(command.id) {
            return Err(MenuError::CycleRisk {
                item_id: command.id,
                parent_id: command.id,
            });
        }
        // The repository re-checks the ancestor chain inside its write.
        let item = self.menu_repo.update_menu_item(command.id, data).await?;
        info!(menu_item_id = item.id, "Menu item updated");
        Ok(item)
    }
}

/// Delete menu item command handler; the result is the number of removed items
pub struct DeleteMenuItemCommandHandler {
    menu_repo: Arc<dyn MenuRepository + Send + Sync>,
}

impl DeleteMenuItemCommandHandler {
    pub fn new(menu_repo: Arc<dyn MenuRepository + Send + Sync>) -> Self {
        Self { menu_repo }
    }
}

#[async_trait]
impl CommandHandler<DeleteMenuItemCommand> for DeleteMenuItemCommandHandler {
    type Result = usize;
    type Error = MenuError;

    #[instrument(name = "delete_menu_item_command_handler", skip(self, command), fields(menu_item_id = command.id))]
    async fn handle(&self, command: DeleteMenuItemCommand) -> Result<Self::Result, Self::Error> {
        let removed = self.menu_repo.delete_menu_item_cascade(command.id).await?;
        info!(removed = removed.len(), "Menu item deleted with descendants");
        Ok(removed.len())
    }
}

// ============================================================================
// ROLE COMMAND HANDLERS
// ============================================================================

pub struct CreateRoleCommandHandler {
    role_repo: Arc<dyn RoleRepository + Send + Sync>,
    validator: RoleValidator,
}

impl CreateRoleCommandHandler {
    pub fn new(role_repo: Arc<dyn RoleRepository + Send + Sync>) -> Self {
        Self {
            role_repo,
            validator: RoleValidator,
        }
    }
}

#[async_trait]
impl CommandHandler<CreateRoleCommand> for CreateRoleCommandHandler {
    type Result = Role;
    type Error = MenuError;

    #[instrument(name = "create_role_command_handler", skip(self, command))]
    async fn handle(&self, command: CreateRoleCommand) -> Result<Self::Result, Self::Error> {
        let data = self.validator.validate(&command.draft)?;
        let role = self.role_repo.create_role(data).await?;
        info!(role_id = role.id, "Role created");
        Ok(role)
    }
}

pub struct UpdateRoleCommandHandler {
    role_repo: Arc<dyn RoleRepository + Send + Sync>,
    validator: RoleValidator,
}

impl UpdateRoleCommandHandler {
    pub fn new(role_repo: Arc<dyn RoleRepository + Send + Sync>) -> Self {
        Self {
            role_repo,
            validator: RoleValidator,
        }
    }
}

#[async_trait]
impl CommandHandler<UpdateRoleCommand> for UpdateRoleCommandHandler {
    type Result = Role;
    type Error = MenuError;

    #[instrument(name = "update_role_command_handler", skip(self, command), fields(role_id = command.id))]
    async fn handle(&self, command: UpdateRoleCommand) -> Result<Self::Result, Self::Error> {
        let data = self.validator.validate(&command.draft)?;
        Ok(self.role_repo.update_role(command.id, data).await?)
    }
}

pub struct DeleteRoleCommandHandler {
    role_repo: Arc<dyn RoleRepository + Send + Sync>,
}

impl DeleteRoleCommandHandler {
    pub fn new(role_repo: Arc<dyn RoleRepository + Send + Sync>) -> Self {
        Self { role_repo }
    }
}

#[async_trait]
impl CommandHandler<DeleteRoleCommand> for DeleteRoleCommandHandler {
    type Result = ();
    type Error = MenuError;

    #[instrument(name = "delete_role_command_handler", skip(self, command), fields(role_id = command.id))]
    async fn handle(&self, command: DeleteRoleCommand) -> Result<Self::Result, Self::Error> {
        self.role_repo.delete_role(command.id).await?;
        info!("Role deleted");
        Ok(())
    }
}

// ============================================================================
// PERMISSION COMMAND HANDLERS
// ============================================================================

pub struct SetPermissionCommandHandler {
    permission_repo: Arc<dyn PermissionRepository + Send + Sync>,
}

impl SetPermissionCommandHandler {
    pub fn new(permission_repo: Arc<dyn PermissionRepository + Send + Sync>) -> Self {
        Self { permission_repo }
    }
}

#[async_trait]
impl CommandHandler<SetPermissionCommand> for SetPermissionCommandHandler {
    type Result = RoleMenuPermission;
    type Error = MenuError;

    #[instrument(name = "set_permission_command_handler", skip(self, command), fields(role_id = command.role_id, menu_item_id = command.menu_item_id))]
    async fn handle(&self, command: SetPermissionCommand) -> Result<Self::Result, Self::Error> {
        Ok(self
            .permission_repo
            .upsert_permission(command.role_id, command.menu_item_id, command.is_active)
            .await?)
    }
}

pub struct TogglePermissionCommandHandler {
    permission_repo: Arc<dyn PermissionRepository + Send + Sync>,
}

impl TogglePermissionCommandHandler {
    pub fn new(permission_repo: Arc<dyn PermissionRepository + Send + Sync>) -> Self {
        Self { permission_repo }
    }
}

#[async_trait]
impl CommandHandler<TogglePermissionCommand> for TogglePermissionCommandHandler {
    type Result = RoleMenuPermission;
    type Error = MenuError;

    #[instrument(name = "toggle_permission_command_handler", skip(self, command), fields(role_id = command.role_id, menu_item_id = command.menu_item_id))]
    async fn handle(&self, command: TogglePermissionCommand) -> Result<Self::Result, Self::Error> {
        let link = self
            .permission_repo
            .toggle_permission(command.role_id, command.menu_item_id)
            .await?;
        info!(is_active = link.is_active, "Permission toggled");
        Ok(link)
    }
}

/// Applies a full selection of active menu items to a role; the result is the
/// number of active items selected
pub struct UpdateRolePermissionsCommandHandler {
    menu_repo: Arc<dyn MenuRepository + Send + Sync>,
    permission_repo: Arc<dyn PermissionRepository + Send + Sync>,
    permission_service: Arc<PermissionService>,
}

impl UpdateRolePermissionsCommandHandler {
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
impl CommandHandler<UpdateRolePermissionsCommand> for UpdateRolePermissionsCommandHandler {
    type Result = usize;
    type Error = MenuError;

    #[instrument(name = "update_role_permissions_command_handler", skip(self, command), fields(role_id = command.role_id))]
    async fn handle(
        &self,
        command: UpdateRolePermissionsCommand,
    ) -> Result<Self::Result, Self::Error> {
        self.permission_service.require_role(command.role_id).await?;

        let selected: HashSet<i64> = command.selected_menu_ids.iter().copied().collect();
        let items = self.menu_repo.list_all().await?;
        if let Some(&unknown) = selected
            .iter()
            .filter(|&&id| !items.iter().any(|item| item.id == id))
            .min()
        {
            return Err(MenuError::NotFound {
                entity: "menu item",
                id: unknown,
            });
        }

        let granted: HashSet<i64> = self
            .permission_repo
            .list_permissions_by_role(command.role_id)
            .await?
            .into_iter()
            .filter(|link| link.is_active)
            .map(|link| link.menu_item_id)
            .collect();

        // Links to inactive items are left as they are.
        let mut states: Vec<(i64, bool)> = Vec::new();
        let mut active_selected = 0;
        for item in items.iter().filter(|item| item.is_active) {
            if selected.contains(&item.id) {
                states.push((item.id, true));
                active_selected += 1;
            } else if granted.contains(&item.id) {
                states.push((item.id, false));
            }
        }
        states.sort_unstable();

        self.permission_repo
            .upsert_permissions(command.role_id, &states)
            .await?;
        info!(selected = active_selected, "Role permissions replaced");
        Ok(active_selected)
    }
}

/// Grants or revokes every active menu item; the result is the number of links written
pub struct BulkAssignPermissionsCommandHandler {
    menu_repo: Arc<dyn MenuRepository + Send + Sync>,
    permission_repo: Arc<dyn PermissionRepository + Send + Sync>,
    permission_service: Arc<PermissionService>,
}

impl BulkAssignPermissionsCommandHandler {
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
impl CommandHandler<BulkAssignPermissionsCommand> for BulkAssignPermissionsCommandHandler {
    type Result = usize;
    type Error = MenuError;

    #[instrument(name = "bulk_assign_permissions_command_handler", skip(self, command), fields(role_id = command.role_id, grant = command.grant))]
    async fn handle(
        &self,
        command: BulkAssignPermissionsCommand,
    ) -> Result<Self::Result, Self::Error> {
        self.permission_service.require_role(command.role_id).await?;
        let states: Vec<(i64, bool)> = self
            .menu_repo
            .list_all()
            .await?
            .into_iter()
            .filter(|item| item.is_active)
            .map(|item| (item.id, command.grant))
            .collect();
        self.permission_repo
            .upsert_permissions(command.role_id, &states)
            .await?;
        info!(count = states.len(), "Permissions assigned in bulk");
        Ok(states.len())
    }
}
