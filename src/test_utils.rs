use crate::AppStateBuilder;
use crate::domain::menu_item::{MenuItem, MenuItemData, OpenMode};
use crate::domain::permission::RoleMenuPermission;
use crate::domain::role::{Role, RoleData};
use crate::infrastructure::InMemoryStore;
use crate::interface::app_state::AppState;
use chrono::Utc;
use std::sync::Arc;

pub const ADMIN_ROLE_ID: i64 = 1;
pub const VIEWER_ROLE_ID: i64 = 2;
pub const DISABLED_ROLE_ID: i64 = 3;

/// Active menu item without a link
pub fn menu_item(id: i64, name: &str, parent_id: Option<i64>, order: i32) -> MenuItem {
    MenuItem::from_data(
        id,
        MenuItemData {
            name: name.to_string(),
            link: None,
            open_mode: None,
            order,
            parent_id,
            is_active: true,
        },
        Utc::now(),
    )
}

/// Active menu item that redirects to `link`
pub fn linked_menu_item(
    id: i64,
    name: &str,
    parent_id: Option<i64>,
    order: i32,
    link: &str,
) -> MenuItem {
    let mut item = menu_item(id, name, parent_id, order);
    item.link = Some(link.to_string());
    item.open_mode = Some(OpenMode::Redirect);
    item
}

pub fn role(id: i64, name: &str, is_active: bool) -> Role {
    Role::from_data(
        id,
        RoleData {
            name: name.to_string(),
            description: None,
            is_active,
        },
        Utc::now(),
    )
}

pub fn grant(role_id: i64, menu_item_id: i64) -> RoleMenuPermission {
    RoleMenuPermission::new(role_id, menu_item_id, true)
}

/// Dashboard(1), Admin(2) > [Users(3), Roles(4)], Reports(5), Archived(6, inactive)
pub fn sample_menu() -> Vec<MenuItem> {
    let mut archived = linked_menu_item(6, "Archived", None, 4, "/archived");
    archived.is_active = false;
    vec![
        linked_menu_item(1, "Dashboard", None, 1, "/dashboard"),
        menu_item(2, "Admin", None, 2),
        linked_menu_item(3, "Users", Some(2), 1, "/admin/users"),
        linked_menu_item(4, "Roles", Some(2), 2, "/admin/roles"),
        linked_menu_item(5, "Reports", None, 3, "https://reports.example.com"),
        archived,
    ]
}

/// Administrator, Viewer and an inactive Disabled role
pub fn sample_roles() -> Vec<Role> {
    vec![
        role(ADMIN_ROLE_ID, "Administrator", true),
        role(VIEWER_ROLE_ID, "Viewer", true),
        role(DISABLED_ROLE_ID, "Disabled", false),
    ]
}

/// Administrator sees every item; Viewer sees Dashboard and Users (without
/// Admin) and holds a switched-off link to Reports.
pub fn sample_links() -> Vec<RoleMenuPermission> {
    let mut links: Vec<RoleMenuPermission> = (1..=6).map(|id| grant(ADMIN_ROLE_ID, id)).collect();
    links.push(grant(VIEWER_ROLE_ID, 1));
    links.push(grant(VIEWER_ROLE_ID, 3));
    links.push(RoleMenuPermission::new(VIEWER_ROLE_ID, 5, false));
    links
}

pub fn create_test_store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::with_data(
        sample_menu(),
        sample_roles(),
        sample_links(),
    ))
}

/// Creates an application state over the seeded in-memory store
pub async fn create_test_app_state() -> Arc<AppState> {
    app_state_over(create_test_store()).await
}

pub async fn create_empty_app_state() -> Arc<AppState> {
    app_state_over(Arc::new(InMemoryStore::new())).await
}

async fn app_state_over(store: Arc<InMemoryStore>) -> Arc<AppState> {
    AppStateBuilder::new()
        .with_repositories(store.clone(), store.clone(), store)
        .build()
        .await
        .expect("in-memory application state should build")
}
