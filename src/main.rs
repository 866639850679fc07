use axum::Router;
use dotenvy::dotenv;
use menu_service::interface::{
    BulkAssignRequest, DeleteMenuItemResponse, ErrorResponse, FieldErrorResponse,
    MenuEntriesResponse, MenuEntryResponse, MenuItemDetailResponse, MenuItemRequest,
    MenuItemResponse, MenuItemsListResponse, MenuNodeResponse, MenuTreeResponse,
    ParentOptionResponse, ParentOptionsResponse, PermissionCountResponse, PermissionMatrixResponse,
    PermissionMatrixRowResponse, PermissionResponse, PermissionSummaryResponse, RoleRequest,
    RoleResponse, RolesListResponse, SetPermissionRequest, SummaryEntryResponse,
    TogglePermissionRequest, UpdateRolePermissionsRequest, v1_routes,
};
use menu_service::{AppConfig, AppError, AppStateBuilder};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(utoipa::OpenApi)]
#[openapi(
    paths(
        menu_service::interface::http_handlers::list_menu_items_handler,
        menu_service::interface::http_handlers::create_menu_item_handler,
        menu_service::interface::http_handlers::get_menu_tree_handler,
        menu_service::interface::http_handlers::get_root_items_handler,
        menu_service::interface::http_handlers::get_available_parents_handler,
        menu_service::interface::http_handlers::get_menu_item_handler,
        menu_service::interface::http_handlers::update_menu_item_handler,
        menu_service::interface::http_handlers::delete_menu_item_handler,
        menu_service::interface::http_handlers::get_children_handler,
        menu_service::interface::http_handlers::list_roles_handler,
        menu_service::interface::http_handlers::create_role_handler,
        menu_service::interface::http_handlers::list_active_roles_handler,
        menu_service::interface::http_handlers::get_role_handler,
        menu_service::interface::http_handlers::update_role_handler,
        menu_service::interface::http_handlers::delete_role_handler,
        menu_service::interface::http_handlers::get_menu_for_role_handler,
        menu_service::interface::http_handlers::get_role_permission_matrix_handler,
        menu_service::interface::http_handlers::update_role_permissions_handler,
        menu_service::interface::http_handlers::toggle_permission_handler,
        menu_service::interface::http_handlers::bulk_assign_permissions_handler,
        menu_service::interface::http_handlers::get_role_permissions_summary_handler,
        menu_service::interface::http_handlers::set_permission_handler,
    ),
    components(schemas(
        MenuItemRequest, MenuItemResponse, MenuItemDetailResponse, MenuItemsListResponse,
        MenuNodeResponse, MenuTreeResponse, MenuEntryResponse, MenuEntriesResponse,
        ParentOptionResponse, ParentOptionsResponse, DeleteMenuItemResponse,
        RoleRequest, RoleResponse, RolesListResponse,
        SetPermissionRequest, TogglePermissionRequest, UpdateRolePermissionsRequest,
        BulkAssignRequest, PermissionResponse, PermissionCountResponse, PermissionMatrixRowResponse,
        PermissionMatrixResponse, SummaryEntryResponse, PermissionSummaryResponse,
        ErrorResponse, FieldErrorResponse
    )),
    tags(
        (name = "Menu Items", description = "Menu hierarchy management endpoints"),
        (name = "Roles", description = "Role management and role menu endpoints"),
        (name = "Permissions", description = "Role to menu item permission endpoints")
    )
)]
pub struct ApiDoc;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load environment variables
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let pool = PgPool::connect(&config.database_url).await?;

    if config.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations complete");
    }

    let app_state = AppStateBuilder::new()
        .with_pool(pool)
        .with_config(config.clone())
        .build()
        .await?;

    let http_addr = config.http_address();

    let app = Router::new()
        .nest("/v1", v1_routes())
        .merge(SwaggerUi::new("/swagger").url("/openapi.json", ApiDoc::openapi()))
        .with_state(app_state);

    let listener = TcpListener::bind(&http_addr)
        .await
        .map_err(|e| AppError::Initialization(format!("Failed to bind {http_addr}: {e}")))?;
    info!("HTTP server running at http://{http_addr}");
    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Initialization(format!("HTTP server failed: {e}")))?;

    Ok(())
}
