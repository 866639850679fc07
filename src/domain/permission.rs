use crate::domain::menu_item::MenuItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Link granting a role visibility of one menu item.
///
/// A link can be switched off instead of deleted; only active links count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RoleMenuPermission {
    pub role_id: i64,
    pub menu_item_id: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl RoleMenuPermission {
    pub fn new(role_id: i64, menu_item_id: i64, is_active: bool) -> Self {
        Self {
            role_id,
            menu_item_id,
            is_active,
            created_at: Utc::now(),
        }
    }

    pub fn grants(&self, role_id: i64) -> bool {
        self.role_id == role_id && self.is_active
    }
}

/// Menu items `role_id` may see: an active link to an active item.
///
/// The result is unordered; [`crate::domain::menu_tree::build_tree`] imposes
/// the final ordering.
pub fn menus_for_role(
    role_id: i64,
    permission_links: &[RoleMenuPermission],
    all_menu_items: &[MenuItem],
) -> Vec<MenuItem> {
    let by_id: HashMap<i64, &MenuItem> = all_menu_items.iter().map(|m| (m.id, m)).collect();
    permission_links
        .iter()
        .filter(|link| link.grants(role_id))
        .filter_map(|link| by_id.get(&link.menu_item_id).copied())
        .filter(|item| item.is_active)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::menu_item::MenuItemData;

    fn item(id: i64, is_active: bool) -> MenuItem {
        MenuItem::from_data(
            id,
            MenuItemData {
                name: format!("menu-{id}"),
                link: None,
                open_mode: None,
                order: id as i32,
                parent_id: None,
                is_active,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_menus_for_role_filters_links_and_items() {
        let items = vec![item(1, true), item(2, false), item(3, true), item(4, true)];
        let links = vec![
            RoleMenuPermission::new(10, 1, true),
            RoleMenuPermission::new(10, 2, true),
            RoleMenuPermission::new(10, 3, false),
            RoleMenuPermission::new(11, 4, true),
        ];
        let visible: Vec<i64> = menus_for_role(10, &links, &items).iter().map(|m| m.id).collect();
        assert_eq!(visible, vec![1]);
    }

    #[test]
    fn test_menus_for_role_without_links_is_empty() {
        let items = vec![item(1, true)];
        assert!(menus_for_role(10, &[], &items).is_empty());
    }

    #[test]
    fn test_dangling_link_is_ignored() {
        let links = vec![RoleMenuPermission::new(10, 42, true)];
        assert!(menus_for_role(10, &links, &[item(1, true)]).is_empty());
    }
}
