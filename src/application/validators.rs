use crate::application::commands::{MenuItemDraft, RoleDraft};
use crate::application::services::{FieldError, MenuError};
use crate::domain::menu_item::{LINK_MAX_LEN, MenuItemData, NAME_MAX_LEN, OpenMode, is_valid_link};
use crate::domain::role::{ROLE_DESCRIPTION_MAX_LEN, ROLE_NAME_MAX_LEN, RoleData};

/// Turns raw command input into validated data, or reports every failing field.
pub trait CommandValidator<C>: Send + Sync {
    type Output;

    fn validate(&self, command: &C) -> Result<Self::Output, MenuError>;
}

/// Collects field errors before deciding the outcome.
#[derive(Debug, Default)]
struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    fn finish<T>(self, value: T) -> Result<T, MenuError> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(MenuError::Validation(self.0))
        }
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Menu item rules: name, link format, open mode and order.
///
/// Sibling order uniqueness and parent checks need the store and run inside
/// the repository write.
pub struct MenuItemValidator;

impl MenuItemValidator {
    fn validate_name(name: &str, errors: &mut FieldErrors) -> String {
        let name = name.trim();
        if name.is_empty() {
            errors.add("name", "Name is required");
        } else if name.chars().count() > NAME_MAX_LEN {
            errors.add("name", format!("Name cannot exceed {NAME_MAX_LEN} characters"));
        }
        name.to_string()
    }

    fn validate_link(link: Option<&str>, errors: &mut FieldErrors) -> Option<String> {
        let link = trimmed(link)?;
        if link.chars().count() > LINK_MAX_LEN {
            errors.add("link", format!("Link cannot exceed {LINK_MAX_LEN} characters"));
        } else if !is_valid_link(&link) {
            errors.add(
                "link",
                "Link must be an absolute URL or start with '/', '~/' or '#'",
            );
        }
        Some(link)
    }

    fn validate_open_mode(
        open_mode: Option<&str>,
        has_link: bool,
        errors: &mut FieldErrors,
    ) -> Option<OpenMode> {
        if !has_link {
            return None;
        }
        match trimmed(open_mode) {
            None => {
                errors.add("open_mode", "Open mode is required when a link is set");
                None
            }
            Some(raw) => match raw.parse::<OpenMode>() {
                Ok(mode) => Some(mode),
                Err(e) => {
                    errors.add("open_mode", e.to_string());
                    None
                }
            },
        }
    }
}

impl CommandValidator<MenuItemDraft> for MenuItemValidator {
    type Output = MenuItemData;

    fn validate(&self, draft: &MenuItemDraft) -> Result<MenuItemData, MenuError> {
        let mut errors = FieldErrors::default();
        let name = Self::validate_name(&draft.name, &mut errors);
        let link = Self::validate_link(draft.link.as_deref(), &mut errors);
        let open_mode =
            Self::validate_open_mode(draft.open_mode.as_deref(), link.is_some(), &mut errors);
        if draft.order < 1 {
            errors.add("order", "Order must be at least 1");
        }
        errors.finish(MenuItemData {
            name,
            link,
            open_mode,
            order: draft.order,
            parent_id: draft.parent_id,
            is_active: draft.is_active,
        })
    }
}

pub struct RoleValidator;

impl CommandValidator<RoleDraft> for RoleValidator {
    type Output = RoleData;

    fn validate(&self, draft: &RoleDraft) -> Result<RoleData, MenuError> {
        let mut errors = FieldErrors::default();
        let name = draft.name.trim().to_string();
        if name.is_empty() {
            errors.add("name", "Name is required");
        } else if name.chars().count() > ROLE_NAME_MAX_LEN {
            errors.add("name", format!("Name cannot exceed {ROLE_NAME_MAX_LEN} characters"));
        }
        let description = trimmed(draft.description.as_deref());
        if description
            .as_ref()
            .is_some_and(|d| d.chars().count() > ROLE_DESCRIPTION_MAX_LEN)
        {
            errors.add(
                "description",
                format!("Description cannot exceed {ROLE_DESCRIPTION_MAX_LEN} characters"),
            );
        }
        errors.finish(RoleData {
            name,
            description,
            is_active: draft.is_active,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, link: Option<&str>, open_mode: Option<&str>, order: i32) -> MenuItemDraft {
        MenuItemDraft {
            name: name.to_string(),
            link: link.map(str::to_string),
            open_mode: open_mode.map(str::to_string),
            order,
            parent_id: None,
            is_active: true,
        }
    }

    fn fields(err: MenuError) -> Vec<String> {
        err.field_errors().iter().map(|e| e.field.clone()).collect()
    }

    #[test]
    fn test_menu_item_is_normalized() {
        let data = MenuItemValidator
            .validate(&draft("  Reports ", Some(" /reports "), Some("newtab"), 3))
            .unwrap();
        assert_eq!(data.name, "Reports");
        assert_eq!(data.link.as_deref(), Some("/reports"));
        assert_eq!(data.open_mode, Some(OpenMode::NewTab));
    }

    #[test]
    fn test_open_mode_cleared_without_link() {
        let data = MenuItemValidator
            .validate(&draft("Group", Some("   "), Some("redirect"), 1))
            .unwrap();
        assert!(data.link.is_none());
        assert!(data.open_mode.is_none());
    }

    #[test]
    fn test_all_failing_fields_are_reported() {
        let err = MenuItemValidator
            .validate(&draft("", Some("relative/path"), None, 0))
            .unwrap_err();
        assert_eq!(fields(err), vec!["name", "link", "open_mode", "order"]);
    }

    #[test]
    fn test_name_and_link_lengths() {
        let long_link = format!("/{}", "a".repeat(LINK_MAX_LEN));
        let err = MenuItemValidator
            .validate(&draft(&"n".repeat(31), Some(&long_link), Some("redirect"), 1))
            .unwrap_err();
        assert_eq!(fields(err), vec!["name", "link"]);
        assert!(
            MenuItemValidator
                .validate(&draft(&"n".repeat(30), None, None, 1))
                .is_ok()
        );
    }

    #[test]
    fn test_unknown_open_mode() {
        let err = MenuItemValidator
            .validate(&draft("Docs", Some("https://docs.rs"), Some("popup"), 1))
            .unwrap_err();
        assert_eq!(fields(err), vec!["open_mode"]);
    }

    #[test]
    fn test_role_rules() {
        let ok = RoleValidator
            .validate(&RoleDraft {
                name: " Editor ".to_string(),
                description: Some(String::new()),
                is_active: true,
            })
            .unwrap();
        assert_eq!(ok.name, "Editor");
        assert!(ok.description.is_none());

        let err = RoleValidator
            .validate(&RoleDraft {
                name: "x".repeat(51),
                description: Some("d".repeat(201)),
                is_active: true,
            })
            .unwrap_err();
        assert_eq!(fields(err), vec!["name", "description"]);
    }
}
