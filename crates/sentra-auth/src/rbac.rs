//! Role-based access control
//!
//! Roles form a fixed, totally ordered set and each role carries a static
//! permission table. Permission sets grow monotonically with rank: every
//! permission granted to a role is also granted to every higher role.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Platform roles, ordered from least to most privileged.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Read-only access to catalog and inquiries
    Viewer,
    /// Content and product editing
    Editor,
    /// Catalog curation, inquiry handling, and user visibility
    Manager,
    /// Full control, including user administration and the audit trail
    Admin,
}

/// Fine-grained permissions, named `resource:action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "product:read")]
    ProductRead,
    #[serde(rename = "product:create")]
    ProductCreate,
    #[serde(rename = "product:update")]
    ProductUpdate,
    #[serde(rename = "product:delete")]
    ProductDelete,
    #[serde(rename = "content:update")]
    ContentUpdate,
    #[serde(rename = "inquiry:read")]
    InquiryRead,
    #[serde(rename = "inquiry:update")]
    InquiryUpdate,
    #[serde(rename = "inquiry:export")]
    InquiryExport,
    #[serde(rename = "inquiry:delete")]
    InquiryDelete,
    #[serde(rename = "user:read")]
    UserRead,
    #[serde(rename = "user:manage")]
    UserManage,
    #[serde(rename = "audit:read")]
    AuditRead,
}

const VIEWER_PERMISSIONS: &[Permission] = &[Permission::ProductRead, Permission::InquiryRead];

const EDITOR_PERMISSIONS: &[Permission] = &[
    Permission::ProductRead,
    Permission::InquiryRead,
    Permission::ProductCreate,
    Permission::ProductUpdate,
    Permission::ContentUpdate,
];

const MANAGER_PERMISSIONS: &[Permission] = &[
    Permission::ProductRead,
    Permission::InquiryRead,
    Permission::ProductCreate,
    Permission::ProductUpdate,
    Permission::ContentUpdate,
    Permission::ProductDelete,
    Permission::InquiryUpdate,
    Permission::InquiryExport,
    Permission::UserRead,
];

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::ProductRead,
    Permission::InquiryRead,
    Permission::ProductCreate,
    Permission::ProductUpdate,
    Permission::ContentUpdate,
    Permission::ProductDelete,
    Permission::InquiryUpdate,
    Permission::InquiryExport,
    Permission::UserRead,
    Permission::InquiryDelete,
    Permission::UserManage,
    Permission::AuditRead,
];

impl Role {
    /// All roles, lowest rank first
    pub const fn all() -> &'static [Role] {
        &[Role::Viewer, Role::Editor, Role::Manager, Role::Admin]
    }

    /// Canonical wire name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "VIEWER",
            Role::Editor => "EDITOR",
            Role::Manager => "MANAGER",
            Role::Admin => "ADMIN",
        }
    }

    /// The full permission set granted to this role
    pub const fn permissions(&self) -> &'static [Permission] {
        match self {
            Role::Viewer => VIEWER_PERMISSIONS,
            Role::Editor => EDITOR_PERMISSIONS,
            Role::Manager => MANAGER_PERMISSIONS,
            Role::Admin => ADMIN_PERMISSIONS,
        }
    }

    /// Whether this role grants the given permission
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    /// Whether this role grants at least one of the given permissions.
    /// An empty list never matches.
    pub fn has_any_permission(&self, permissions: &[Permission]) -> bool {
        permissions.iter().any(|p| self.has_permission(*p))
    }

    /// Whether this role grants every one of the given permissions
    pub fn has_all_permissions(&self, permissions: &[Permission]) -> bool {
        permissions.iter().all(|p| self.has_permission(*p))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "VIEWER" => Ok(Role::Viewer),
            "EDITOR" => Ok(Role::Editor),
            "MANAGER" => Ok(Role::Manager),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(AuthError::RoleNotFound {
                role: s.to_string(),
            }),
        }
    }
}

impl Permission {
    /// All permissions
    pub const fn all() -> &'static [Permission] {
        ADMIN_PERMISSIONS
    }

    /// Canonical `resource:action` name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Permission::ProductRead => "product:read",
            Permission::ProductCreate => "product:create",
            Permission::ProductUpdate => "product:update",
            Permission::ProductDelete => "product:delete",
            Permission::ContentUpdate => "content:update",
            Permission::InquiryRead => "inquiry:read",
            Permission::InquiryUpdate => "inquiry:update",
            Permission::InquiryExport => "inquiry:export",
            Permission::InquiryDelete => "inquiry:delete",
            Permission::UserRead => "user:read",
            Permission::UserManage => "user:manage",
            Permission::AuditRead => "audit:read",
        }
    }

    /// The resource half of the permission name
    pub fn resource(&self) -> &'static str {
        match self.as_str().split_once(':') {
            Some((resource, _)) => resource,
            None => self.as_str(),
        }
    }

    /// The action half of the permission name
    pub fn action(&self) -> &'static str {
        match self.as_str().split_once(':') {
            Some((_, action)) => action,
            None => self.as_str(),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::all()
            .iter()
            .find(|p| p.as_str() == s)
            .copied()
            .ok_or_else(|| AuthError::PermissionNotFound {
                permission: s.to_string(),
            })
    }
}
