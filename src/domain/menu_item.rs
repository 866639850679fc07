use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const NAME_MAX_LEN: usize = 30;
pub const LINK_MAX_LEN: usize = 200;

/// How the browser should follow a menu link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenMode {
    Redirect,
    NewTab,
}

impl OpenMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpenMode::Redirect => "redirect",
            OpenMode::NewTab => "newtab",
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown open mode '{0}', expected 'redirect' or 'newtab'")]
pub struct UnknownOpenMode(pub String);

impl FromStr for OpenMode {
    type Err = UnknownOpenMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redirect" => Ok(OpenMode::Redirect),
            "newtab" => Ok(OpenMode::NewTab),
            _ => Err(UnknownOpenMode(s.to_string())),
        }
    }
}

/// MenuItem entity: a navigable entry, optionally nested under a parent.
///
/// The parent is referenced by id only. Hierarchies are rebuilt from flat
/// lists on demand (see [`crate::domain::menu_tree`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: i64,
    pub name: String,
    pub link: Option<String>,
    pub open_mode: Option<OpenMode>,
    pub order: i32,
    pub parent_id: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl MenuItem {
    /// Builds a fresh item from validated data.
    pub fn from_data(id: i64, data: MenuItemData, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: data.name,
            link: data.link,
            open_mode: data.open_mode,
            order: data.order,
            parent_id: data.parent_id,
            is_active: data.is_active,
            created_at,
            updated_at: None,
        }
    }

    /// Overwrites the mutable fields and stamps `updated_at`.
    pub fn apply(&mut self, data: MenuItemData, now: DateTime<Utc>) {
        self.name = data.name;
        self.link = data.link;
        self.open_mode = data.open_mode;
        self.order = data.order;
        self.parent_id = data.parent_id;
        self.is_active = data.is_active;
        self.updated_at = Some(now);
    }

    pub fn has_link(&self) -> bool {
        self.link.is_some()
    }

    /// True when this item sits directly under `parent_id` (`None` meaning root level).
    pub fn sits_under(&self, parent_id: Option<i64>) -> bool {
        self.parent_id == parent_id
    }
}

/// Validated, normalized field values for creating or updating a menu item.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItemData {
    pub name: String,
    pub link: Option<String>,
    pub open_mode: Option<OpenMode>,
    pub order: i32,
    pub parent_id: Option<i64>,
    pub is_active: bool,
}

/// Accepts absolute URLs, root-relative (`/`), app-relative (`~/`) paths and fragments (`#`).
pub fn is_valid_link(link: &str) -> bool {
    if link.starts_with('/') || link.starts_with("~/") || link.starts_with('#') {
        return true;
    }
    url::Url::parse(link).is_ok()
}
