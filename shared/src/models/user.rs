//! User Model

use super::Role;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Admin-controlled approval state of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown verification status: {other}")),
        }
    }
}

/// User entity (includes password hash, never serialized to clients)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub verification_status: VerificationStatus,
    pub is_active: bool,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: i64,
}

impl User {
    /// Active and verification-approved
    pub fn is_cleared(&self) -> bool {
        self.is_active && self.verification_status == VerificationStatus::Approved
    }
}

/// User as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role: Role,
    pub verification_status: VerificationStatus,
    pub is_active: bool,
    pub created_at: i64,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            role: user.role,
            verification_status: user.verification_status,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

/// Registration payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub phone: Option<String>,
}

/// Login payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

/// Admin: set verification status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationUpdate {
    pub status: VerificationStatus,
}

/// Admin: enable or disable an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveUpdate {
    pub active: bool,
}

/// Admin user listing filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub verification: Option<VerificationStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(active: bool, status: VerificationStatus) -> User {
        User {
            id: "u1".into(),
            name: "Asha".into(),
            email: "asha@example.com".into(),
            phone: None,
            role: Role::Pharmacist,
            verification_status: status,
            is_active: active,
            password_hash: "$argon2id$secret".into(),
            created_at: 0,
        }
    }

    #[test]
    fn test_is_cleared() {
        assert!(user(true, VerificationStatus::Approved).is_cleared());
        assert!(!user(true, VerificationStatus::Pending).is_cleared());
        assert!(!user(false, VerificationStatus::Approved).is_cleared());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_value(user(true, VerificationStatus::Approved)).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["verificationStatus"], "approved");
        assert_eq!(json["isActive"], true);
    }

    #[test]
    fn test_profile_from_user() {
        let u = user(true, VerificationStatus::Rejected);
        let profile = UserProfile::from(&u);
        assert_eq!(profile.id, "u1");
        assert_eq!(profile.verification_status, VerificationStatus::Rejected);
    }
}
