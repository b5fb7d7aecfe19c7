//! Authenticated caller identity
//!
//! The identity collaborator asserts who is calling and in which role; the
//! engine enforces customer/staff authorization at every operation boundary.

use serde::{Deserialize, Serialize};

use super::jwt::Claims;

/// Caller role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Staff => "staff",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "staff" => Ok(Role::Staff),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Authenticated caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Opaque identity reference (customer_ref or staff_ref)
    pub sub: String,
    pub name: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_staff(&self) -> bool {
        self.role == Role::Staff
    }

    /// Test/dev helper: a customer identity
    pub fn customer(sub: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            name: name.into(),
            role: Role::Customer,
        }
    }

    /// Test/dev helper: a staff identity
    pub fn staff(sub: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            name: name.into(),
            role: Role::Staff,
        }
    }
}

impl TryFrom<Claims> for CurrentUser {
    type Error = String;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let role = claims.role.parse::<Role>()?;
        Ok(Self {
            sub: claims.sub,
            name: claims.name,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("customer".parse::<Role>().unwrap(), Role::Customer);
        assert_eq!("staff".parse::<Role>().unwrap(), Role::Staff);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_try_from_claims() {
        let claims = Claims {
            sub: "staff-1".to_string(),
            name: "Bea".to_string(),
            role: "staff".to_string(),
            exp: 0,
            iat: 0,
            iss: "store-server".to_string(),
            aud: "store-clients".to_string(),
        };
        let user = CurrentUser::try_from(claims).unwrap();
        assert!(user.is_staff());
        assert_eq!(user.sub, "staff-1");
    }
}
