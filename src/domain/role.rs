use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ROLE_NAME_MAX_LEN: usize = 50;
pub const ROLE_DESCRIPTION_MAX_LEN: usize = 200;

/// Role entity: a group of visitors that share one menu view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Role {
    pub fn from_data(id: i64, data: RoleData, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: data.name,
            description: data.description,
            is_active: data.is_active,
            created_at,
        }
    }

    pub fn apply(&mut self, data: RoleData) {
        self.name = data.name;
        self.description = data.description;
        self.is_active = data.is_active;
    }

    /// Role names are unique regardless of case.
    pub fn has_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

/// Validated field values for creating or updating a role.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleData {
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_role() -> Role {
        Role::from_data(
            1,
            RoleData {
                name: "Editor".to_string(),
                description: None,
                is_active: true,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_has_name_ignores_case() {
        let role = test_role();
        assert!(role.has_name("editor"));
        assert!(role.has_name("EDITOR"));
        assert!(!role.has_name("viewer"));
    }

    #[test]
    fn test_apply() {
        let mut role = test_role();
        role.apply(RoleData {
            name: "Viewer".to_string(),
            description: Some("Read only".to_string()),
            is_active: false,
        });
        assert_eq!(role.name, "Viewer");
        assert_eq!(role.description.as_deref(), Some("Read only"));
        assert!(!role.is_active);
    }
}
