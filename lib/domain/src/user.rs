//! User entity, roles, and the credential hashing seam.

use crate::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Access role for a user.
///
/// Roles are totally ordered: `User < Admin < SuperAdmin`. A role meets a
/// requirement when it is greater than or equal to it, so an admin can do
/// everything a user can.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Standard user: billing and read-only product queries.
    User,
    /// Administrator: inventory management and reporting.
    Admin,
    /// Super administrator: user management on top of everything else.
    SuperAdmin,
}

impl Role {
    /// Returns true if this role satisfies the given minimum.
    #[must_use]
    pub fn meets(&self, minimum: Role) -> bool {
        *self >= minimum
    }

    /// The wire/storage representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "super_admin" => Ok(Self::SuperAdmin),
            other => Err(DomainError::validation(
                "role",
                format!("'{other}' is not one of user, admin, super_admin"),
            )),
        }
    }
}

/// A user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Storage-assigned identifier.
    pub id: i64,
    /// Unique login name.
    pub username: String,
    /// Adaptive hash of the password. Never the plaintext.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Display name.
    pub full_name: String,
    /// Unique email address.
    pub email: String,
    /// Access role.
    pub role: Role,
    /// Inactive accounts cannot authenticate.
    pub is_active: bool,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a user. The password is already hashed by the time
/// it reaches a store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    pub email: String,
    pub role: Role,
}

/// Password hashing seam.
///
/// The server provides the Argon2 implementation; tests substitute a
/// transparent double. Keeping the trait here lets the assistant's
/// `create_user` handler hash without a dependency on any particular
/// algorithm crate.
pub trait CredentialHasher: Send + Sync {
    /// Hashes a plaintext password.
    ///
    /// # Errors
    ///
    /// Returns a storage-kind error if hashing fails.
    fn hash(&self, password: &str) -> Result<String, DomainError>;

    /// Verifies a plaintext password against a stored hash.
    ///
    /// # Errors
    ///
    /// Returns a storage-kind error if the hash is malformed.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, DomainError>;
}
