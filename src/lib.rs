pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interface;
pub mod test_utils;

use application::{
    command_bus::CommandBus,
    command_handlers::{
        BulkAssignPermissionsCommandHandler, CreateMenuItemCommandHandler,
        CreateRoleCommandHandler, DeleteMenuItemCommandHandler, DeleteRoleCommandHandler,
        SetPermissionCommandHandler, TogglePermissionCommandHandler,
        UpdateMenuItemCommandHandler, UpdateRoleCommandHandler,
        UpdateRolePermissionsCommandHandler,
    },
    commands::{
        BulkAssignPermissionsCommand, CreateMenuItemCommand, CreateRoleCommand,
        DeleteMenuItemCommand, DeleteRoleCommand, SetPermissionCommand, TogglePermissionCommand,
        UpdateMenuItemCommand, UpdateRoleCommand, UpdateRolePermissionsCommand,
    },
    queries::{
        GetAvailableParentsQuery, GetChildrenQuery, GetMenuForRoleQuery, GetMenuItemQuery,
        GetMenuTreeQuery, GetRolePermissionMatrixQuery, GetRolePermissionsSummaryQuery,
        GetRoleQuery, GetRootItemsQuery, ListActiveRolesQuery, ListMenuItemsQuery,
        ListRolesQuery,
    },
    query_bus::QueryBus,
    query_handlers::{
        GetAvailableParentsQueryHandler, GetChildrenQueryHandler, GetMenuForRoleQueryHandler,
        GetMenuItemQueryHandler, GetMenuTreeQueryHandler, GetRolePermissionMatrixQueryHandler,
        GetRolePermissionsSummaryQueryHandler, GetRoleQueryHandler, GetRootItemsQueryHandler,
        ListActiveRolesQueryHandler, ListMenuItemsQueryHandler, ListRolesQueryHandler,
    },
    services::PermissionService,
};
use infrastructure::{
    MenuRepository, PermissionRepository, PostgresMenuRepository, PostgresPermissionRepository,
    PostgresRoleRepository, RoleRepository,
};
use interface::AppState;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Application configuration with all environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub http_host: String,
    pub http_port: u16,
    pub run_migrations: bool,
}

impl AppConfig {
    /// Creates a new AppConfig from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; unset keys fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .unwrap_or_else(|| "postgresql://localhost:5432/menus".to_string());
        if database_url.trim().is_empty() {
            return Err(ConfigError::MissingRequired("DATABASE_URL".to_string()));
        }

        let http_host = lookup("HTTP_HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let http_port = match lookup("HTTP_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                ConfigError::Invalid(format!("HTTP_PORT must be a port number, got '{raw}'"))
            })?,
            None => 8080,
        };

        let run_migrations = match lookup("RUN_MIGRATIONS") {
            Some(raw) => raw.trim().to_ascii_lowercase().parse::<bool>().map_err(|_| {
                ConfigError::Invalid(format!("RUN_MIGRATIONS must be true or false, got '{raw}'"))
            })?,
            None => true,
        };

        Ok(AppConfig {
            database_url,
            http_host,
            http_port,
            run_migrations,
        })
    }

    /// Creates the HTTP address string from host and port
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingRequired(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// APPLICATION BUILDER
// ============================================================================

type Repositories = (
    Arc<dyn MenuRepository + Send + Sync>,
    Arc<dyn RoleRepository + Send + Sync>,
    Arc<dyn PermissionRepository + Send + Sync>,
);

/// Builder for creating application state with better testability
#[derive(Default)]
pub struct AppStateBuilder {
    pool: Option<PgPool>,
    config: Option<AppConfig>,
    repositories: Option<Repositories>,
}

impl AppStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the database pool; Postgres repositories are built from it
    pub fn with_pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Uses the given repositories instead of a pool (in-memory stores in tests)
    pub fn with_repositories(
        mut self,
        menu_repo: Arc<dyn MenuRepository + Send + Sync>,
        role_repo: Arc<dyn RoleRepository + Send + Sync>,
        permission_repo: Arc<dyn PermissionRepository + Send + Sync>,
    ) -> Self {
        self.repositories = Some((menu_repo, role_repo, permission_repo));
        self
    }

    /// Builds the application state
    pub async fn build(self) -> Result<Arc<AppState>, AppError> {
        if let Some(config) = &self.config {
            info!(http_address = %config.http_address(), "Building application state");
        }
        let (menu_repo, role_repo, permission_repo) = match (self.repositories, self.pool) {
            (Some(repositories), _) => repositories,
            (None, Some(pool)) => (
                Arc::new(PostgresMenuRepository::new(pool.clone()))
                    as Arc<dyn MenuRepository + Send + Sync>,
                Arc::new(PostgresRoleRepository::new(pool.clone()))
                    as Arc<dyn RoleRepository + Send + Sync>,
                Arc::new(PostgresPermissionRepository::new(pool))
                    as Arc<dyn PermissionRepository + Send + Sync>,
            ),
            (None, None) => return Err(AppError::MissingPool),
        };

        let permission_service = Arc::new(PermissionService::new(
            menu_repo.clone(),
            role_repo.clone(),
            permission_repo.clone(),
        ));

        // Create CQRS buses
        let command_bus = Arc::new(CommandBus::new());
        let query_bus = Arc::new(QueryBus::new());

        Self::register_command_handlers(
            &command_bus,
            &menu_repo,
            &role_repo,
            &permission_repo,
            &permission_service,
        )
        .await;

        Self::register_query_handlers(
            &query_bus,
            &menu_repo,
            &role_repo,
            &permission_repo,
            &permission_service,
        )
        .await;

        Ok(Arc::new(AppState {
            menu_repo,
            role_repo,
            permission_repo,
            permission_service,
            command_bus,
            query_bus,
        }))
    }

    /// Registers all command handlers
    async fn register_command_handlers(
        command_bus: &Arc<CommandBus>,
        menu_repo: &Arc<dyn MenuRepository + Send + Sync>,
        role_repo: &Arc<dyn RoleRepository + Send + Sync>,
        permission_repo: &Arc<dyn PermissionRepository + Send + Sync>,
        permission_service: &Arc<PermissionService>,
    ) {
        command_bus
            .register_handler::<CreateMenuItemCommand, _>(CreateMenuItemCommandHandler::new(
                menu_repo.clone(),
            ))
            .await;

        command_bus
            .register_handler::<UpdateMenuItemCommand, _>(UpdateMenuItemCommandHandler::new(
                menu_repo.clone(),
            ))
            .await;

        command_bus
            .register_handler::<DeleteMenuItemCommand, _>(DeleteMenuItemCommandHandler::new(
                menu_repo.clone(),
            ))
            .await;

        command_bus
            .register_handler::<CreateRoleCommand, _>(CreateRoleCommandHandler::new(
                role_repo.clone(),
            ))
            .await;

        command_bus
            .register_handler::<UpdateRoleCommand, _>(UpdateRoleCommandHandler::new(
                role_repo.clone(),
            ))
            .await;

        command_bus
            .register_handler::<DeleteRoleCommand, _>(DeleteRoleCommandHandler::new(
                role_repo.clone(),
            ))
            .await;

        command_bus
            .register_handler::<SetPermissionCommand, _>(SetPermissionCommandHandler::new(
                permission_repo.clone(),
            ))
            .await;

        command_bus
            .register_handler::<TogglePermissionCommand, _>(TogglePermissionCommandHandler::new(
                permission_repo.clone(),
            ))
            .await;

        command_bus
            .register_handler::<UpdateRolePermissionsCommand, _>(
                UpdateRolePermissionsCommandHandler::new(
                    menu_repo.clone(),
                    permission_repo.clone(),
                    permission_service.clone(),
                ),
            )
            .await;

        command_bus
            .register_handler::<BulkAssignPermissionsCommand, _>(
                BulkAssignPermissionsCommandHandler::new(
                    menu_repo.clone(),
                    permission_repo.clone(),
                    permission_service.clone(),
                ),
            )
            .await;
    }

    /// Registers all query handlers
    async fn register_query_handlers(
        query_bus: &Arc<QueryBus>,
        menu_repo: &Arc<dyn MenuRepository + Send + Sync>,
        role_repo: &Arc<dyn RoleRepository + Send + Sync>,
        permission_repo: &Arc<dyn PermissionRepository + Send + Sync>,
        permission_service: &Arc<PermissionService>,
    ) {
        query_bus
            .register_handler::<GetMenuItemQuery, _>(GetMenuItemQueryHandler::new(
                menu_repo.clone(),
            ))
            .await;

        query_bus
            .register_handler::<ListMenuItemsQuery, _>(ListMenuItemsQueryHandler::new(
                menu_repo.clone(),
            ))
            .await;

        query_bus
            .register_handler::<GetMenuTreeQuery, _>(GetMenuTreeQueryHandler::new(
                menu_repo.clone(),
            ))
            .await;

        query_bus
            .register_handler::<GetRootItemsQuery, _>(GetRootItemsQueryHandler::new(
                menu_repo.clone(),
            ))
            .await;

        query_bus
            .register_handler::<GetChildrenQuery, _>(GetChildrenQueryHandler::new(
                menu_repo.clone(),
            ))
            .await;

        query_bus
            .register_handler::<GetAvailableParentsQuery, _>(
                GetAvailableParentsQueryHandler::new(menu_repo.clone()),
            )
            .await;

        query_bus
            .register_handler::<GetRoleQuery, _>(GetRoleQueryHandler::new(
                permission_service.clone(),
            ))
            .await;

        query_bus
            .register_handler::<ListRolesQuery, _>(ListRolesQueryHandler::new(
                role_repo.clone(),
                permission_service.clone(),
            ))
            .await;

        query_bus
            .register_handler::<ListActiveRolesQuery, _>(ListActiveRolesQueryHandler::new(
                role_repo.clone(),
            ))
            .await;

        query_bus
            .register_handler::<GetMenuForRoleQuery, _>(GetMenuForRoleQueryHandler::new(
                permission_service.clone(),
            ))
            .await;

        query_bus
            .register_handler::<GetRolePermissionMatrixQuery, _>(
                GetRolePermissionMatrixQueryHandler::new(
                    menu_repo.clone(),
                    permission_repo.clone(),
                    permission_service.clone(),
                ),
            )
            .await;

        query_bus
            .register_handler::<GetRolePermissionsSummaryQuery, _>(
                GetRolePermissionsSummaryQueryHandler::new(
                    menu_repo.clone(),
                    permission_service.clone(),
                ),
            )
            .await;
    }
}

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Missing database pool")]
    MissingPool,
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Initialization error: {0}")]
    Initialization(String),
}
