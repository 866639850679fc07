use menu_service::application::commands::{CommandFactory, MenuItemDraft, RoleDraft};
use menu_service::application::queries::{
    MenuEntryReadModel, MenuItemReadModel, ParentOptionReadModel, QueryFactory,
    RolePermissionMatrix, RolePermissionsSummary, RoleReadModel,
};
use menu_service::application::services::MenuError;
use menu_service::domain::menu_item::{MenuItem, OpenMode};
use menu_service::domain::menu_tree::{TreeNode, forest_size};
use menu_service::domain::role::Role;
use menu_service::infrastructure::PermissionRepository;
use menu_service::interface::AppState;
use menu_service::test_utils::{
    ADMIN_ROLE_ID, DISABLED_ROLE_ID, VIEWER_ROLE_ID, create_empty_app_state,
    create_test_app_state,
};
use std::sync::Arc;

fn draft(name: &str, order: i32, parent_id: Option<i64>) -> MenuItemDraft {
    MenuItemDraft {
        name: name.to_string(),
        link: None,
        open_mode: None,
        order,
        parent_id,
        is_active: true,
    }
}

fn menu_error(err: Box<dyn std::error::Error + Send + Sync>) -> MenuError {
    *err.downcast::<MenuError>().unwrap()
}

async fn create(state: &Arc<AppState>, draft: MenuItemDraft) -> Result<MenuItem, MenuError> {
    state
        .command_bus
        .dispatch::<_, MenuItem>(CommandFactory::create_menu_item(draft))
        .await
        .map_err(menu_error)
}

async fn role_menu(state: &Arc<AppState>, role_id: i64) -> Vec<TreeNode> {
    state
        .query_bus
        .dispatch(QueryFactory::get_menu_for_role(role_id))
        .await
        .unwrap()
}

// ===== MENU ITEM COMMANDS =====

#[tokio::test]
async fn test_sibling_order_clash_is_a_field_error() {
    let state = create_empty_app_state().await;
    let parent_one = create(&state, draft("One", 1, None)).await.unwrap();
    let parent_two = create(&state, draft("Two", 2, None)).await.unwrap();
    create(&state, draft("First", 1, Some(parent_one.id)))
        .await
        .unwrap();

    let err = create(&state, draft("Second", 1, Some(parent_one.id)))
        .await
        .unwrap_err();
    assert_eq!(err.field_errors().len(), 1);
    assert_eq!(err.field_errors()[0].field, "order");

    let elsewhere = create(&state, draft("Second", 1, Some(parent_two.id))).await;
    assert!(elsewhere.is_ok());
}

#[tokio::test]
async fn test_create_normalizes_link_fields() {
    let state = create_empty_app_state().await;
    let mut input = draft("  Docs  ", 1, None);
    input.link = Some(" https://docs.rs ".to_string());
    input.open_mode = Some("NewTab".to_string());
    let item = create(&state, input).await.unwrap();
    assert_eq!(item.name, "Docs");
    assert_eq!(item.link.as_deref(), Some("https://docs.rs"));
    assert_eq!(item.open_mode, Some(OpenMode::NewTab));

    let mut missing_mode = draft("Blog", 2, None);
    missing_mode.link = Some("/blog".to_string());
    let err = create(&state, missing_mode).await.unwrap_err();
    assert_eq!(err.field_errors()[0].field, "open_mode");
}

#[tokio::test]
async fn test_create_under_missing_parent() {
    let state = create_empty_app_state().await;
    let err = create(&state, draft("Lost", 1, Some(77))).await.unwrap_err();
    assert!(matches!(err, MenuError::NotFound { id: 77, .. }));
}

#[tokio::test]
async fn test_update_into_own_subtree_is_cycle_risk() {
    let state = create_test_app_state().await;
    let err = state
        .command_bus
        .dispatch::<_, MenuItem>(CommandFactory::update_menu_item(2, draft("Admin", 2, Some(4))))
        .await
        .map_err(menu_error)
        .unwrap_err();
    assert!(matches!(err, MenuError::CycleRisk { item_id: 2, parent_id: 4 }));

    let err = state
        .command_bus
        .dispatch::<_, MenuItem>(CommandFactory::update_menu_item(2, draft("Admin", 2, Some(2))))
        .await
        .map_err(menu_error)
        .unwrap_err();
    assert!(matches!(err, MenuError::CycleRisk { .. }));
}

#[tokio::test]
async fn test_delete_cascades_through_bus() {
    let state = create_test_app_state().await;
    let removed: usize = state
        .command_bus
        .dispatch(CommandFactory::delete_menu_item(2))
        .await
        .unwrap();
    assert_eq!(removed, 3);

    let admin_links = state
        .permission_repo
        .list_permissions_by_role(ADMIN_ROLE_ID)
        .await
        .unwrap();
    assert_eq!(admin_links.len(), 3);
}

// ===== MENU QUERIES =====

#[tokio::test]
async fn test_menu_tree_skips_inactive_items() {
    let state = create_test_app_state().await;
    let forest: Vec<TreeNode> = state
        .query_bus
        .dispatch(QueryFactory::get_menu_tree())
        .await
        .unwrap();
    assert_eq!(forest_size(&forest), 5);
    let roots: Vec<&str> = forest.iter().map(|n| n.item.name.as_str()).collect();
    assert_eq!(roots, vec!["Dashboard", "Admin", "Reports"]);
}

#[tokio::test]
async fn test_list_menu_items_is_ordered_by_path() {
    let state = create_test_app_state().await;
    let items: Vec<MenuItemReadModel> = state
        .query_bus
        .dispatch(QueryFactory::list_menu_items())
        .await
        .unwrap();
    let paths: Vec<&str> = items.iter().map(|m| m.full_path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "Admin",
            "Admin > Roles",
            "Admin > Users",
            "Archived",
            "Dashboard",
            "Reports"
        ]
    );
    assert_eq!(items[1].level, 1);
}

#[tokio::test]
async fn test_roots_and_children_report_has_children() {
    let state = create_test_app_state().await;
    let roots: Vec<MenuEntryReadModel> = state
        .query_bus
        .dispatch(QueryFactory::get_root_items())
        .await
        .unwrap();
    let flags: Vec<(i64, bool)> = roots.iter().map(|e| (e.id, e.has_children)).collect();
    assert_eq!(flags, vec![(1, false), (2, true), (5, false)]);

    let children: Vec<MenuEntryReadModel> = state
        .query_bus
        .dispatch(QueryFactory::get_children(2))
        .await
        .unwrap();
    assert_eq!(children.iter().map(|e| e.id).collect::<Vec<_>>(), vec![3, 4]);

    let err = state
        .query_bus
        .dispatch::<_, Vec<MenuEntryReadModel>>(QueryFactory::get_children(404))
        .await
        .map_err(menu_error)
        .unwrap_err();
    assert!(matches!(err, MenuError::NotFound { .. }));
}

#[tokio::test]
async fn test_available_parents_for_edit() {
    let state = create_test_app_state().await;
    let parents: Vec<ParentOptionReadModel> = state
        .query_bus
        .dispatch(QueryFactory::get_available_parents(Some(2)))
        .await
        .unwrap();
    let ids: Vec<i64> = parents.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![6, 1, 5]);
}

// ===== ROLES AND PERMISSIONS =====

#[tokio::test]
async fn test_role_menu_views() {
    let state = create_test_app_state().await;

    let admin = role_menu(&state, ADMIN_ROLE_ID).await;
    assert_eq!(forest_size(&admin), 5);

    let viewer = role_menu(&state, VIEWER_ROLE_ID).await;
    let roots: Vec<&str> = viewer.iter().map(|n| n.item.name.as_str()).collect();
    assert_eq!(roots, vec!["Dashboard", "Users"]);

    assert!(role_menu(&state, DISABLED_ROLE_ID).await.is_empty());

    let err = state
        .query_bus
        .dispatch::<_, Vec<TreeNode>>(QueryFactory::get_menu_for_role(404))
        .await
        .map_err(menu_error)
        .unwrap_err();
    assert!(matches!(err, MenuError::NotFound { entity: "role", .. }));
}

#[tokio::test]
async fn test_list_roles_counts_visible_items() {
    let state = create_test_app_state().await;
    let roles: Vec<RoleReadModel> = state
        .query_bus
        .dispatch(QueryFactory::list_roles())
        .await
        .unwrap();
    let counts: Vec<(&str, usize)> = roles
        .iter()
        .map(|r| (r.name.as_str(), r.menu_count))
        .collect();
    assert_eq!(
        counts,
        vec![("Administrator", 5), ("Disabled", 0), ("Viewer", 2)]
    );

    let active: Vec<Role> = state
        .query_bus
        .dispatch(QueryFactory::list_active_roles())
        .await
        .unwrap();
    assert_eq!(active.len(), 2);
}

#[tokio::test]
async fn test_duplicate_role_name_is_a_field_error() {
    let state = create_test_app_state().await;
    let err = state
        .command_bus
        .dispatch::<_, Role>(CommandFactory::create_role(RoleDraft {
            name: "viewer".to_string(),
            description: None,
            is_active: true,
        }))
        .await
        .map_err(menu_error)
        .unwrap_err();
    assert_eq!(err.field_errors()[0].field, "name");
}

#[tokio::test]
async fn test_update_role_permissions_replaces_selection() {
    let state = create_test_app_state().await;
    let count: usize = state
        .command_bus
        .dispatch(CommandFactory::update_role_permissions(
            VIEWER_ROLE_ID,
            vec![2, 4, 4],
        ))
        .await
        .unwrap();
    assert_eq!(count, 2);

    let viewer = role_menu(&state, VIEWER_ROLE_ID).await;
    assert_eq!(viewer.len(), 1);
    assert_eq!(viewer[0].item.name, "Admin");
    assert_eq!(viewer[0].children.len(), 1);
    assert_eq!(viewer[0].children[0].item.name, "Roles");

    let err = state
        .command_bus
        .dispatch::<_, usize>(CommandFactory::update_role_permissions(
            VIEWER_ROLE_ID,
            vec![1, 999],
        ))
        .await
        .map_err(menu_error)
        .unwrap_err();
    assert!(matches!(err, MenuError::NotFound { id: 999, .. }));
    assert_eq!(role_menu(&state, VIEWER_ROLE_ID).await.len(), 1);
}

#[tokio::test]
async fn test_update_role_permissions_ignores_inactive_items() {
    let state = create_test_app_state().await;
    let count: usize = state
        .command_bus
        .dispatch(CommandFactory::update_role_permissions(VIEWER_ROLE_ID, vec![6]))
        .await
        .unwrap();
    assert_eq!(count, 0);
    let viewer_links = state
        .permission_repo
        .list_permissions_by_role(VIEWER_ROLE_ID)
        .await
        .unwrap();
    assert!(viewer_links.iter().all(|link| link.menu_item_id != 6));
    assert!(role_menu(&state, VIEWER_ROLE_ID).await.is_empty());

    // The administrator's existing link to the archived item stays as it is.
    let count: usize = state
        .command_bus
        .dispatch(CommandFactory::update_role_permissions(ADMIN_ROLE_ID, vec![1, 6]))
        .await
        .unwrap();
    assert_eq!(count, 1);
    let admin_links = state
        .permission_repo
        .list_permissions_by_role(ADMIN_ROLE_ID)
        .await
        .unwrap();
    let mut active: Vec<i64> = admin_links
        .iter()
        .filter(|link| link.is_active)
        .map(|link| link.menu_item_id)
        .collect();
    active.sort_unstable();
    assert_eq!(active, vec![1, 6]);
}

#[tokio::test]
async fn test_bulk_assign_and_matrix() {
    let state = create_test_app_state().await;
    let written: usize = state
        .command_bus
        .dispatch(CommandFactory::bulk_assign_permissions(VIEWER_ROLE_ID, "grant"))
        .await
        .unwrap();
    assert_eq!(written, 5);

    let matrix: RolePermissionMatrix = state
        .query_bus
        .dispatch(QueryFactory::get_role_permission_matrix(VIEWER_ROLE_ID))
        .await
        .unwrap();
    assert_eq!(matrix.role_name, "Viewer");
    assert_eq!(matrix.rows.len(), 5);
    assert!(matrix.rows.iter().all(|r| r.has_permission));

    let _: usize = state
        .command_bus
        .dispatch(CommandFactory::bulk_assign_permissions(VIEWER_ROLE_ID, "revoke"))
        .await
        .unwrap();
    let summary: RolePermissionsSummary = state
        .query_bus
        .dispatch(QueryFactory::get_role_permissions_summary(VIEWER_ROLE_ID))
        .await
        .unwrap();
    assert_eq!(summary.total_menus, 0);
    assert!(summary.menu_items.is_empty());
}

#[tokio::test]
async fn test_summary_lists_paths() {
    let state = create_test_app_state().await;
    let summary: RolePermissionsSummary = state
        .query_bus
        .dispatch(QueryFactory::get_role_permissions_summary(VIEWER_ROLE_ID))
        .await
        .unwrap();
    assert_eq!(summary.total_menus, 2);
    let paths: Vec<&str> = summary
        .menu_items
        .iter()
        .map(|e| e.full_path.as_str())
        .collect();
    assert_eq!(paths, vec!["Admin > Users", "Dashboard"]);
}
