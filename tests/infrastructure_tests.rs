use menu_service::domain::menu_item::MenuItemData;
use menu_service::domain::role::RoleData;
use menu_service::infrastructure::{
    InMemoryStore, MenuRepository, PermissionRepository, PostgresMenuRepository,
    PostgresPermissionRepository, PostgresRoleRepository, RepositoryError, RoleRepository,
};
use menu_service::test_utils::{ADMIN_ROLE_ID, VIEWER_ROLE_ID, create_test_store};
use sqlx::PgPool;

fn data(name: &str, order: i32, parent_id: Option<i64>) -> MenuItemData {
    MenuItemData {
        name: name.to_string(),
        link: None,
        open_mode: None,
        order,
        parent_id,
        is_active: true,
    }
}

fn role_data(name: &str) -> RoleData {
    RoleData {
        name: name.to_string(),
        description: None,
        is_active: true,
    }
}

// ===== IN-MEMORY STORE =====

#[tokio::test]
async fn test_duplicate_order_is_scoped_to_siblings() {
    let store = InMemoryStore::new();
    let parent_a = store.create_menu_item(data("A", 1, None)).await.unwrap();
    let parent_b = store.create_menu_item(data("B", 2, None)).await.unwrap();
    store
        .create_menu_item(data("A1", 1, Some(parent_a.id)))
        .await
        .unwrap();

    let clash = store.create_menu_item(data("A2", 1, Some(parent_a.id))).await;
    assert!(matches!(clash, Err(RepositoryError::DuplicateOrder { order: 1, .. })));

    let other_parent = store.create_menu_item(data("B1", 1, Some(parent_b.id))).await;
    assert!(other_parent.is_ok());

    let root_clash = store.create_menu_item(data("C", 2, None)).await;
    assert!(matches!(root_clash, Err(RepositoryError::DuplicateOrder { parent_id: None, .. })));
}

#[tokio::test]
async fn test_update_excludes_self_from_order_check() {
    let store = create_test_store();
    let renamed = store
        .update_menu_item(4, data("Role List", 2, Some(2)))
        .await
        .unwrap();
    assert_eq!(renamed.name, "Role List");
    assert!(renamed.updated_at.is_some());

    let clash = store.update_menu_item(4, data("Roles", 1, Some(2))).await;
    assert!(matches!(clash, Err(RepositoryError::DuplicateOrder { .. })));
}

#[tokio::test]
async fn test_update_rejects_descendant_parent() {
    let store = create_test_store();
    let result = store.update_menu_item(2, data("Admin", 2, Some(3))).await;
    assert!(matches!(
        result,
        Err(RepositoryError::WouldCreateCycle { item_id: 2, parent_id: 3 })
    ));

    let result = store.update_menu_item(2, data("Admin", 2, Some(2))).await;
    assert!(matches!(result, Err(RepositoryError::WouldCreateCycle { .. })));
}

#[tokio::test]
async fn test_missing_parent_is_not_found() {
    let store = InMemoryStore::new();
    let result = store.create_menu_item(data("Orphan", 1, Some(42))).await;
    assert!(matches!(result, Err(RepositoryError::NotFound { id: 42, .. })));
}

#[tokio::test]
async fn test_cascade_delete_removes_subtree_and_links() {
    let store = create_test_store();
    let mut removed = store.delete_menu_item_cascade(2).await.unwrap();
    removed.sort();
    assert_eq!(removed, vec![2, 3, 4]);

    let remaining: Vec<i64> = store.list_all().await.unwrap().iter().map(|m| m.id).collect();
    assert_eq!(remaining, vec![1, 5, 6]);

    let links = store.list_permissions().await.unwrap();
    assert!(links.iter().all(|l| ![2, 3, 4].contains(&l.menu_item_id)));

    let again = store.delete_menu_item_cascade(2).await;
    assert!(matches!(again, Err(RepositoryError::NotFound { .. })));
}

#[tokio::test]
async fn test_list_by_parent() {
    let store = create_test_store();
    let roots = store.list_by_parent(None).await.unwrap();
    assert_eq!(roots.len(), 4);
    let children: Vec<i64> = store
        .list_by_parent(Some(2))
        .await
        .unwrap()
        .iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(children, vec![3, 4]);
}

#[tokio::test]
async fn test_role_names_are_case_insensitive() {
    let store = create_test_store();
    let result = store.create_role(role_data("administrator")).await;
    assert!(matches!(result, Err(RepositoryError::DuplicateRoleName(_))));

    let kept = store
        .update_role(ADMIN_ROLE_ID, role_data("ADMINISTRATOR"))
        .await
        .unwrap();
    assert_eq!(kept.name, "ADMINISTRATOR");
}

#[tokio::test]
async fn test_delete_role_removes_links() {
    let store = create_test_store();
    store.delete_role(VIEWER_ROLE_ID).await.unwrap();
    assert!(store.find_role(VIEWER_ROLE_ID).await.unwrap().is_none());
    assert!(
        store
            .list_permissions_by_role(VIEWER_ROLE_ID)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_upsert_keeps_one_link_per_pair() {
    let store = create_test_store();
    store.upsert_permission(VIEWER_ROLE_ID, 4, true).await.unwrap();
    store.upsert_permission(VIEWER_ROLE_ID, 4, false).await.unwrap();
    let links: Vec<_> = store
        .list_permissions_by_role(VIEWER_ROLE_ID)
        .await
        .unwrap()
        .into_iter()
        .filter(|l| l.menu_item_id == 4)
        .collect();
    assert_eq!(links.len(), 1);
    assert!(!links[0].is_active);
}

#[tokio::test]
async fn test_toggle_flips_and_creates() {
    let store = create_test_store();
    let off = store.toggle_permission(VIEWER_ROLE_ID, 1).await.unwrap();
    assert!(!off.is_active);
    let on = store.toggle_permission(VIEWER_ROLE_ID, 1).await.unwrap();
    assert!(on.is_active);
    let created = store.toggle_permission(VIEWER_ROLE_ID, 4).await.unwrap();
    assert!(created.is_active);

    let missing = store.toggle_permission(99, 1).await;
    assert!(matches!(missing, Err(RepositoryError::NotFound { entity: "role", .. })));
}

// ===== POSTGRES =====

async fn connect() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("Skipping Postgres test - no DATABASE_URL");
        return None;
    };
    let pool = PgPool::connect(&database_url).await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    Some(pool)
}

fn unique_suffix() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default() % 1_000_000_000
}

#[tokio::test]
async fn test_postgres_menu_hierarchy_round() {
    let Some(pool) = connect().await else {
        return;
    };
    let menus = PostgresMenuRepository::new(pool.clone());
    let roles = PostgresRoleRepository::new(pool.clone());
    let permissions = PostgresPermissionRepository::new(pool);

    let suffix = unique_suffix();
    let root_order = (suffix % 1_000_000) as i32 + 10_000;
    let root = menus
        .create_menu_item(data("PgRoot", root_order, None))
        .await
        .unwrap();
    let child = menus
        .create_menu_item(data("PgChild", 1, Some(root.id)))
        .await
        .unwrap();
    let grandchild = menus
        .create_menu_item(data("PgGrandchild", 1, Some(child.id)))
        .await
        .unwrap();

    let clash = menus.create_menu_item(data("PgClash", 1, Some(root.id))).await;
    assert!(matches!(clash, Err(RepositoryError::DuplicateOrder { .. })));

    let cycle = menus
        .update_menu_item(root.id, data("PgRoot", root_order, Some(grandchild.id)))
        .await;
    assert!(matches!(cycle, Err(RepositoryError::WouldCreateCycle { .. })));

    let role = roles
        .create_role(role_data(&format!("pg-role-{suffix}")))
        .await
        .unwrap();
    permissions
        .upsert_permission(role.id, grandchild.id, true)
        .await
        .unwrap();
    let toggled = permissions
        .toggle_permission(role.id, grandchild.id)
        .await
        .unwrap();
    assert!(!toggled.is_active);

    let mut removed = menus.delete_menu_item_cascade(root.id).await.unwrap();
    removed.sort();
    assert_eq!(removed, vec![root.id, child.id, grandchild.id]);
    assert!(
        permissions
            .list_permissions_by_role(role.id)
            .await
            .unwrap()
            .is_empty()
    );
    assert!(menus.find_menu_item(child.id).await.unwrap().is_none());

    roles.delete_role(role.id).await.unwrap();
}

#[tokio::test]
async fn test_postgres_failed_cascade_keeps_subtree() {
    let Some(pool) = connect().await else {
        return;
    };
    let menus = PostgresMenuRepository::new(pool.clone());
    let roles = PostgresRoleRepository::new(pool.clone());
    let permissions = PostgresPermissionRepository::new(pool.clone());

    let suffix = unique_suffix();
    let root = menus
        .create_menu_item(data("PgKeepRoot", (suffix % 1_000_000) as i32 + 2_000_000, None))
        .await
        .unwrap();
    let child = menus
        .create_menu_item(data("PgKeepChild", 1, Some(root.id)))
        .await
        .unwrap();
    let role = roles
        .create_role(role_data(&format!("pg-keep-{suffix}")))
        .await
        .unwrap();
    permissions
        .upsert_permissions(role.id, &[(root.id, true), (child.id, true)])
        .await
        .unwrap();

    // Make the menu row delete fail after the link delete has already run.
    let function = format!("block_menu_delete_{suffix}");
    sqlx::query(&format!(
        r#"
        CREATE FUNCTION {function}() RETURNS trigger AS $$
        BEGIN
            IF OLD.id = {root_id} THEN
                RAISE EXCEPTION 'menu item delete blocked';
            END IF;
            RETURN OLD;
        END;
        $$ LANGUAGE plpgsql
        "#,
        root_id = root.id
    ))
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(&format!(
        "CREATE TRIGGER {function} BEFORE DELETE ON menu_items FOR EACH ROW EXECUTE FUNCTION {function}()"
    ))
    .execute(&pool)
    .await
    .unwrap();

    let result = menus.delete_menu_item_cascade(root.id).await;

    sqlx::query(&format!("DROP TRIGGER {function} ON menu_items"))
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(&format!("DROP FUNCTION {function}()"))
        .execute(&pool)
        .await
        .unwrap();

    assert!(matches!(result, Err(RepositoryError::Database(_))));
    assert!(menus.find_menu_item(root.id).await.unwrap().is_some());
    assert!(menus.find_menu_item(child.id).await.unwrap().is_some());
    let mut linked: Vec<i64> = permissions
        .list_permissions_by_role(role.id)
        .await
        .unwrap()
        .iter()
        .filter(|link| link.is_active)
        .map(|link| link.menu_item_id)
        .collect();
    linked.sort_unstable();
    assert_eq!(linked, vec![root.id, child.id]);

    menus.delete_menu_item_cascade(root.id).await.unwrap();
    roles.delete_role(role.id).await.unwrap();
}

#[tokio::test]
async fn test_postgres_link_write_racing_cascade_delete() {
    let Some(pool) = connect().await else {
        return;
    };
    let menus = PostgresMenuRepository::new(pool.clone());
    let roles = PostgresRoleRepository::new(pool.clone());
    let permissions = PostgresPermissionRepository::new(pool);

    let suffix = unique_suffix();
    let role = roles
        .create_role(role_data(&format!("pg-race-{suffix}")))
        .await
        .unwrap();

    for round in 0..5 {
        let order = (suffix % 1_000_000) as i32 + 3_000_000 + round;
        let item = menus
            .create_menu_item(data("PgRace", order, None))
            .await
            .unwrap();

        let grants = [(item.id, true)];
        let (deleted, linked) = tokio::join!(
            menus.delete_menu_item_cascade(item.id),
            permissions.upsert_permissions(role.id, &grants),
        );
        assert_eq!(deleted.unwrap(), vec![item.id]);
        match linked {
            Ok(()) | Err(RepositoryError::NotFound { entity: "menu item", .. }) => {}
            other => panic!("unexpected link write result: {other:?}"),
        }
        assert!(menus.find_menu_item(item.id).await.unwrap().is_none());
        assert!(
            permissions
                .list_permissions_by_role(role.id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    roles.delete_role(role.id).await.unwrap();
}
