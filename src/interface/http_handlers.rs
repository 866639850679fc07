use crate::application::command_bus::BusError;
use crate::application::commands::CommandFactory;
use crate::application::queries::{
    MenuEntryReadModel, MenuItemReadModel, ParentOptionReadModel, QueryFactory,
    RolePermissionMatrix, RolePermissionsSummary, RoleReadModel,
};
use crate::application::services::MenuError;
use crate::domain::menu_item::MenuItem;
use crate::domain::menu_tree::TreeNode;
use crate::domain::permission::RoleMenuPermission;
use crate::domain::role::Role;
use crate::interface::app_state::AppState;
use crate::interface::{
    AvailableParentsParams, BulkAssignRequest, DeleteMenuItemResponse, ErrorResponse,
    MenuEntriesResponse, MenuItemDetailResponse, MenuItemRequest, MenuItemResponse,
    MenuItemsListResponse, MenuTreeResponse, ParentOptionsResponse, PermissionCountResponse,
    PermissionMatrixResponse, PermissionResponse, PermissionSummaryResponse, RoleRequest,
    RoleResponse, RolesListResponse, SetPermissionRequest, TogglePermissionRequest,
    UpdateRolePermissionsRequest,
};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use std::sync::Arc;
use tracing::error;

/// Maps a bus failure onto a status code: validation 422, missing 404,
/// cycle 409, everything else 500.
fn error_response(err: BusError) -> Response {
    match err.downcast::<MenuError>() {
        Ok(menu_error) => {
            let status = match *menu_error {
                MenuError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                MenuError::NotFound { .. } => StatusCode::NOT_FOUND,
                MenuError::CycleRisk { .. } => StatusCode::CONFLICT,
                MenuError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(ErrorResponse::from(menu_error.as_ref()))).into_response()
        }
        Err(other) => {
            error!(error = %other, "Request dispatch failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(other.to_string())),
            )
                .into_response()
        }
    }
}

/// All versioned routes; mounted under `/v1`.
pub fn v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/menu-items",
            get(list_menu_items_handler).post(create_menu_item_handler),
        )
        .route("/menu-items/tree", get(get_menu_tree_handler))
        .route("/menu-items/roots", get(get_root_items_handler))
        .route(
            "/menu-items/available-parents",
            get(get_available_parents_handler),
        )
        .route(
            "/menu-items/{id}",
            get(get_menu_item_handler)
                .put(update_menu_item_handler)
                .delete(delete_menu_item_handler),
        )
        .route("/menu-items/{id}/children", get(get_children_handler))
        .route("/roles", get(list_roles_handler).post(create_role_handler))
        .route("/roles/active", get(list_active_roles_handler))
        .route(
            "/roles/{id}",
            get(get_role_handler)
                .put(update_role_handler)
                .delete(delete_role_handler),
        )
        .route("/roles/{id}/menu", get(get_menu_for_role_handler))
        .route(
            "/roles/{id}/permissions",
            get(get_role_permission_matrix_handler).put(update_role_permissions_handler),
        )
        .route(
            "/roles/{id}/permissions/toggle",
            post(toggle_permission_handler),
        )
        .route(
            "/roles/{id}/permissions/bulk",
            post(bulk_assign_permissions_handler),
        )
        .route(
            "/roles/{id}/permissions/summary",
            get(get_role_permissions_summary_handler),
        )
        .route("/permissions", put(set_permission_handler))
}

// --- MENU ITEM HANDLERS ---

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/v1/menu-items",
    responses(
        (status = 200, description = "All menu items ordered by full path", body = MenuItemsListResponse),
    ),
    tags = ["Menu Items"],
    description = "List every menu item, active or not, with its level and full path."
)]
pub async fn list_menu_items_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state
        .query_bus
        .dispatch::<_, Vec<MenuItemReadModel>>(QueryFactory::list_menu_items())
        .await
    {
        Ok(items) => Json(MenuItemsListResponse {
            items: items.into_iter().map(Into::into).collect(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

#[axum::debug_handler]
#[utoipa::path(
    post,
    path = "/v1/menu-items",
    request_body = MenuItemRequest,
    responses(
        (status = 201, description = "Menu item created", body = MenuItemResponse),
        (status = 404, description = "Parent not found", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse),
    ),
    tags = ["Menu Items"],
    description = "Create a menu item under an optional parent."
)]
pub async fn create_menu_item_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<MenuItemRequest>,
) -> impl IntoResponse {
    let cmd = CommandFactory::create_menu_item(payload.into());
    match state.command_bus.dispatch::<_, MenuItem>(cmd).await {
        Ok(item) => (StatusCode::CREATED, Json(MenuItemResponse::from(item))).into_response(),
        Err(e) => error_response(e),
    }
}

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/v1/menu-items/tree",
    responses(
        (status = 200, description = "Forest of active menu items", body = MenuTreeResponse),
    ),
    tags = ["Menu Items"]
)]
pub async fn get_menu_tree_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state
        .query_bus
        .dispatch::<_, Vec<TreeNode>>(QueryFactory::get_menu_tree())
        .await
    {
        Ok(forest) => Json(MenuTreeResponse::from(forest)).into_response(),
        Err(e) => error_response(e),
    }
}

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/v1/menu-items/roots",
    responses(
        (status = 200, description = "Active root items", body = MenuEntriesResponse),
    ),
    tags = ["Menu Items"]
)]
pub async fn get_root_items_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state
        .query_bus
        .dispatch::<_, Vec<MenuEntryReadModel>>(QueryFactory::get_root_items())
        .await
    {
        Ok(entries) => Json(MenuEntriesResponse {
            items: entries.into_iter().map(Into::into).collect(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/v1/menu-items/available-parents",
    params(AvailableParentsParams),
    responses(
        (status = 200, description = "Valid parent choices ordered by name", body = ParentOptionsResponse),
        (status = 404, description = "Menu item not found", body = ErrorResponse),
    ),
    tags = ["Menu Items"],
    description = "Items that may become the parent of `item_id`: everything but the item and its descendants."
)]
pub async fn get_available_parents_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AvailableParentsParams>,
) -> impl IntoResponse {
    let query = QueryFactory::get_available_parents(params.item_id);
    match state
        .query_bus
        .dispatch::<_, Vec<ParentOptionReadModel>>(query)
        .await
    {
        Ok(parents) => Json(ParentOptionsResponse {
            parents: parents.into_iter().map(Into::into).collect(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/v1/menu-items/{id}",
    params(("id" = i64, Path, description = "Menu item id")),
    responses(
        (status = 200, description = "Menu item", body = MenuItemDetailResponse),
        (status = 404, description = "Menu item not found", body = ErrorResponse),
    ),
    tags = ["Menu Items"]
)]
pub async fn get_menu_item_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state
        .query_bus
        .dispatch::<_, MenuItemReadModel>(QueryFactory::get_menu_item(id))
        .await
    {
        Ok(model) => Json(MenuItemDetailResponse::from(model)).into_response(),
        Err(e) => error_response(e),
    }
}

#[axum::debug_handler]
#[utoipa::path(
    put,
    path = "/v1/menu-items/{id}",
    params(("id" = i64, Path, description = "Menu item id")),
    request_body = MenuItemRequest,
    responses(
        (status = 200, description = "Menu item updated", body = MenuItemResponse),
        (status = 404, description = "Menu item or parent not found", body = ErrorResponse),
        (status = 409, description = "New parent is the item itself or one of its descendants", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse),
    ),
    tags = ["Menu Items"]
)]
pub async fn update_menu_item_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<MenuItemRequest>,
) -> impl IntoResponse {
    let cmd = CommandFactory::update_menu_item(id, payload.into());
    match state.command_bus.dispatch::<_, MenuItem>(cmd).await {
        Ok(item) => Json(MenuItemResponse::from(item)).into_response(),
        Err(e) => error_response(e),
    }
}

#[axum::debug_handler]
#[utoipa::path(
    delete,
    path = "/v1/menu-items/{id}",
    params(("id" = i64, Path, description = "Menu item id")),
    responses(
        (status = 200, description = "Item and descendants deleted", body = DeleteMenuItemResponse),
        (status = 404, description = "Menu item not found", body = ErrorResponse),
    ),
    tags = ["Menu Items"],
    description = "Delete a menu item together with all of its descendants and their permission links."
)]
pub async fn delete_menu_item_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state
        .command_bus
        .dispatch::<_, usize>(CommandFactory::delete_menu_item(id))
        .await
    {
        Ok(removed) => Json(DeleteMenuItemResponse { removed }).into_response(),
        Err(e) => error_response(e),
    }
}

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/v1/menu-items/{id}/children",
    params(("id" = i64, Path, description = "Parent menu item id")),
    responses(
        (status = 200, description = "Active children ordered by order", body = MenuEntriesResponse),
        (status = 404, description = "Menu item not found", body = ErrorResponse),
    ),
    tags = ["Menu Items"]
)]
pub async fn get_children_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state
        .query_bus
        .dispatch::<_, Vec<MenuEntryReadModel>>(QueryFactory::get_children(id))
        .await
    {
        Ok(entries) => Json(MenuEntriesResponse {
            items: entries.into_iter().map(Into::into).collect(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

// --- ROLE HANDLERS ---

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/v1/roles",
    responses(
        (status = 200, description = "All roles with their visible menu count", body = RolesListResponse),
    ),
    tags = ["Roles"]
)]
pub async fn list_roles_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state
        .query_bus
        .dispatch::<_, Vec<RoleReadModel>>(QueryFactory::list_roles())
        .await
    {
        Ok(roles) => Json(RolesListResponse {
            roles: roles.into_iter().map(Into::into).collect(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

#[axum::debug_handler]
#[utoipa::path(
    post,
    path = "/v1/roles",
    request_body = RoleRequest,
    responses(
        (status = 201, description = "Role created", body = RoleResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse),
    ),
    tags = ["Roles"]
)]
pub async fn create_role_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RoleRequest>,
) -> impl IntoResponse {
    let cmd = CommandFactory::create_role(payload.into());
    match state.command_bus.dispatch::<_, Role>(cmd).await {
        Ok(role) => (StatusCode::CREATED, Json(RoleResponse::from(role))).into_response(),
        Err(e) => error_response(e),
    }
}

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/v1/roles/active",
    responses(
        (status = 200, description = "Active roles ordered by name", body = RolesListResponse),
    ),
    tags = ["Roles"]
)]
pub async fn list_active_roles_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state
        .query_bus
        .dispatch::<_, Vec<Role>>(QueryFactory::list_active_roles())
        .await
    {
        Ok(roles) => Json(RolesListResponse {
            roles: roles.into_iter().map(Into::into).collect(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/v1/roles/{id}",
    params(("id" = i64, Path, description = "Role id")),
    responses(
        (status = 200, description = "Role", body = RoleResponse),
        (status = 404, description = "Role not found", body = ErrorResponse),
    ),
    tags = ["Roles"]
)]
pub async fn get_role_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state
        .query_bus
        .dispatch::<_, RoleReadModel>(QueryFactory::get_role(id))
        .await
    {
        Ok(role) => Json(RoleResponse::from(role)).into_response(),
        Err(e) => error_response(e),
    }
}

#[axum::debug_handler]
#[utoipa::path(
    put,
    path = "/v1/roles/{id}",
    params(("id" = i64, Path, description = "Role id")),
    request_body = RoleRequest,
    responses(
        (status = 200, description = "Role updated", body = RoleResponse),
        (status = 404, description = "Role not found", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse),
    ),
    tags = ["Roles"]
)]
pub async fn update_role_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<RoleRequest>,
) -> impl IntoResponse {
    let cmd = CommandFactory::update_role(id, payload.into());
    match state.command_bus.dispatch::<_, Role>(cmd).await {
        Ok(role) => Json(RoleResponse::from(role)).into_response(),
        Err(e) => error_response(e),
    }
}

#[axum::debug_handler]
#[utoipa::path(
    delete,
    path = "/v1/roles/{id}",
    params(("id" = i64, Path, description = "Role id")),
    responses(
        (status = 204, description = "Role and its permission links deleted"),
        (status = 404, description = "Role not found", body = ErrorResponse),
    ),
    tags = ["Roles"]
)]
pub async fn delete_role_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state
        .command_bus
        .dispatch::<_, ()>(CommandFactory::delete_role(id))
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/v1/roles/{id}/menu",
    params(("id" = i64, Path, description = "Role id")),
    responses(
        (status = 200, description = "Menu forest visible to the role", body = MenuTreeResponse),
        (status = 404, description = "Role not found", body = ErrorResponse),
    ),
    tags = ["Roles"],
    description = "Active items the role has an active link to. Items whose parent is hidden are shown as roots."
)]
pub async fn get_menu_for_role_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state
        .query_bus
        .dispatch::<_, Vec<TreeNode>>(QueryFactory::get_menu_for_role(id))
        .await
    {
        Ok(forest) => Json(MenuTreeResponse::from(forest)).into_response(),
        Err(e) => error_response(e),
    }
}

// --- PERMISSION HANDLERS ---

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/v1/roles/{id}/permissions",
    params(("id" = i64, Path, description = "Role id")),
    responses(
        (status = 200, description = "Permission matrix over all active items", body = PermissionMatrixResponse),
        (status = 404, description = "Role not found", body = ErrorResponse),
    ),
    tags = ["Permissions"]
)]
pub async fn get_role_permission_matrix_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state
        .query_bus
        .dispatch::<_, RolePermissionMatrix>(QueryFactory::get_role_permission_matrix(id))
        .await
    {
        Ok(matrix) => Json(PermissionMatrixResponse::from(matrix)).into_response(),
        Err(e) => error_response(e),
    }
}

#[axum::debug_handler]
#[utoipa::path(
    put,
    path = "/v1/roles/{id}/permissions",
    params(("id" = i64, Path, description = "Role id")),
    request_body = UpdateRolePermissionsRequest,
    responses(
        (status = 200, description = "Selection applied", body = PermissionCountResponse),
        (status = 404, description = "Role or menu item not found", body = ErrorResponse),
    ),
    tags = ["Permissions"],
    description = "Activate links for the selected active items and deactivate the role's other links to active items."
)]
pub async fn update_role_permissions_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateRolePermissionsRequest>,
) -> impl IntoResponse {
    let cmd = CommandFactory::update_role_permissions(id, payload.selected_menu_ids);
    match state.command_bus.dispatch::<_, usize>(cmd).await {
        Ok(count) => Json(PermissionCountResponse { role_id: id, count }).into_response(),
        Err(e) => error_response(e),
    }
}

#[axum::debug_handler]
#[utoipa::path(
    post,
    path = "/v1/roles/{id}/permissions/toggle",
    params(("id" = i64, Path, description = "Role id")),
    request_body = TogglePermissionRequest,
    responses(
        (status = 200, description = "Link after the toggle", body = PermissionResponse),
        (status = 404, description = "Role or menu item not found", body = ErrorResponse),
    ),
    tags = ["Permissions"]
)]
pub async fn toggle_permission_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<TogglePermissionRequest>,
) -> impl IntoResponse {
    let cmd = CommandFactory::toggle_permission(id, payload.menu_item_id);
    match state
        .command_bus
        .dispatch::<_, RoleMenuPermission>(cmd)
        .await
    {
        Ok(link) => Json(PermissionResponse::from(link)).into_response(),
        Err(e) => error_response(e),
    }
}

#[axum::debug_handler]
#[utoipa::path(
    post,
    path = "/v1/roles/{id}/permissions/bulk",
    params(("id" = i64, Path, description = "Role id")),
    request_body = BulkAssignRequest,
    responses(
        (status = 200, description = "Links written", body = PermissionCountResponse),
        (status = 404, description = "Role not found", body = ErrorResponse),
    ),
    tags = ["Permissions"]
)]
pub async fn bulk_assign_permissions_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<BulkAssignRequest>,
) -> impl IntoResponse {
    let cmd = CommandFactory::bulk_assign_permissions(id, &payload.action);
    match state.command_bus.dispatch::<_, usize>(cmd).await {
        Ok(count) => Json(PermissionCountResponse { role_id: id, count }).into_response(),
        Err(e) => error_response(e),
    }
}

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/v1/roles/{id}/permissions/summary",
    params(("id" = i64, Path, description = "Role id")),
    responses(
        (status = 200, description = "Items visible to the role", body = PermissionSummaryResponse),
        (status = 404, description = "Role not found", body = ErrorResponse),
    ),
    tags = ["Permissions"]
)]
pub async fn get_role_permissions_summary_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state
        .query_bus
        .dispatch::<_, RolePermissionsSummary>(QueryFactory::get_role_permissions_summary(id))
        .await
    {
        Ok(summary) => Json(PermissionSummaryResponse::from(summary)).into_response(),
        Err(e) => error_response(e),
    }
}

#[axum::debug_handler]
#[utoipa::path(
    put,
    path = "/v1/permissions",
    request_body = SetPermissionRequest,
    responses(
        (status = 200, description = "Link created or updated", body = PermissionResponse),
        (status = 404, description = "Role or menu item not found", body = ErrorResponse),
    ),
    tags = ["Permissions"]
)]
pub async fn set_permission_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SetPermissionRequest>,
) -> impl IntoResponse {
    let cmd = CommandFactory::set_permission(payload.role_id, payload.menu_item_id, payload.is_active);
    match state
        .command_bus
        .dispatch::<_, RoleMenuPermission>(cmd)
        .await
    {
        Ok(link) => Json(PermissionResponse::from(link)).into_response(),
        Err(e) => error_response(e),
    }
}
