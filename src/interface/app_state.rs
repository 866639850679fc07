use crate::application::command_bus::CommandBus;
use crate::application::query_bus::QueryBus;
use crate::application::services::PermissionService;
use crate::infrastructure::{MenuRepository, PermissionRepository, RoleRepository};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub menu_repo: Arc<dyn MenuRepository + Send + Sync>,
    pub role_repo: Arc<dyn RoleRepository + Send + Sync>,
    pub permission_repo: Arc<dyn PermissionRepository + Send + Sync>,
    pub permission_service: Arc<PermissionService>,
    pub command_bus: Arc<CommandBus>,
    pub query_bus: Arc<QueryBus>,
}
