//! Role Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Pharmacist,
    /// Delivery partner
    Delivery,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Pharmacist => "pharmacist",
            Self::Delivery => "delivery",
            Self::Admin => "admin",
        }
    }

    /// Pharmacists and delivery partners. Operators need admin
    /// verification before they may act on orders.
    pub fn is_operator(&self) -> bool {
        matches!(self, Self::Pharmacist | Self::Delivery)
    }

    /// Roles an anonymous caller may register for
    pub fn is_self_registrable(&self) -> bool {
        !matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "pharmacist" => Ok(Self::Pharmacist),
            "delivery" => Ok(Self::Delivery),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_str() {
        for role in [Role::Customer, Role::Pharmacist, Role::Delivery, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&Role::Delivery).unwrap(), "\"delivery\"");
        let role: Role = serde_json::from_str("\"pharmacist\"").unwrap();
        assert_eq!(role, Role::Pharmacist);
    }

    #[test]
    fn test_operator_roles() {
        assert!(Role::Pharmacist.is_operator());
        assert!(Role::Delivery.is_operator());
        assert!(!Role::Customer.is_operator());
        assert!(!Role::Admin.is_operator());
        assert!(!Role::Admin.is_self_registrable());
    }
}
