//! User domain types.

use chrono::{DateTime, Utc};

use clementine_core::{Email, UserId};

/// A storefront user (domain type).
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login name, unique across all users.
    pub username: String,
    /// User's email address. Not unique; login is by username.
    pub email: Email,
    /// Whether the user shops on the storefront.
    pub is_customer: bool,
    /// Whether the user administers the catalog and orders.
    pub is_admin: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether the user holds staff privileges.
    ///
    /// Staff status is derived from the admin flag at the privilege boundary,
    /// never stored separately.
    #[must_use]
    pub const fn is_staff(&self) -> bool {
        self.is_admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(is_admin: bool) -> User {
        User {
            id: UserId::new(1),
            username: "alice".to_string(),
            email: Email::parse("alice@example.com").expect("valid email"),
            is_customer: true,
            is_admin,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_staff_follows_admin_flag() {
        assert!(user(true).is_staff());
        assert!(!user(false).is_staff());
    }
}
