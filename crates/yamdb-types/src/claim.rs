use std::{cmp::Ordering, fmt::Display, str::FromStr, time::SystemTime};

use serde::{Deserialize, Serialize};

/// Privilege tier of a user, ordered by [`Role::rank`]
#[derive(Debug, Hash, PartialEq, Eq, Serialize, Deserialize, Clone, Copy, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Moderator, Role::Admin];

    pub fn rank(&self) -> u8 {
        match self {
            Role::User => 0,
            Role::Moderator => 1,
            Role::Admin => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }

    /// Role actually granted to user - superusers are always admins
    pub fn effective(self, is_superuser: bool) -> Role {
        if is_superuser {
            Role::Admin
        } else {
            self
        }
    }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

pub trait TimeLimited {
    fn set_validity(&mut self, until: SystemTime);
    fn check_validity(&self) -> bool;
}

pub trait Authorization {
    fn role(&self) -> Role;

    fn has_role(&self, role: Role) -> bool {
        self.role() == role
    }

    fn has_at_least(&self, role: Role) -> bool {
        self.role() >= role
    }
}

/// Claims carried by API access token.
///
/// Role is fixed at the time of issue, so change of user role is visible only
/// with newly issued tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiClaim {
    /// username
    pub sub: String,
    pub uid: i64,
    pub exp: u64,
    pub role: Role,
}

impl ApiClaim {
    pub fn new_expired(uid: i64, username: impl Into<String>, role: Role) -> Self {
        ApiClaim {
            sub: username.into(),
            uid,
            exp: 0,
            role,
        }
    }

    pub fn username(&self) -> &str {
        &self.sub
    }
}

impl Authorization for ApiClaim {
    fn role(&self) -> Role {
        self.role
    }
}

fn unix_secs(t: SystemTime) -> u64 {
    t.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl TimeLimited for ApiClaim {
    fn set_validity(&mut self, until: SystemTime) {
        self.exp = unix_secs(until);
    }

    fn check_validity(&self) -> bool {
        self.exp > unix_secs(SystemTime::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_order() {
        assert!(Role::User < Role::Moderator);
        assert!(Role::Moderator < Role::Admin);
        assert_eq!(Role::Admin.max(Role::User), Role::Admin);
        let mut roles = vec![Role::Admin, Role::User, Role::Moderator];
        roles.sort();
        assert_eq!(roles, Role::ALL.to_vec());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" moderator ".parse::<Role>().unwrap(), Role::Moderator);
        assert!("superuser".parse::<Role>().is_err());
        assert_eq!(Role::default(), Role::User);
        assert_eq!(Role::Moderator.to_string(), "moderator");
    }

    #[test]
    fn test_role_serde() {
        let json = serde_json::to_string(&Role::Moderator).unwrap();
        assert_eq!(json, "\"moderator\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
        assert!(serde_json::from_str::<Role>("\"root\"").is_err());
    }

    #[test]
    fn test_superuser_is_admin() {
        assert_eq!(Role::User.effective(true), Role::Admin);
        assert_eq!(Role::Moderator.effective(false), Role::Moderator);
    }

    #[test]
    fn test_claim() {
        let mut claim = ApiClaim::new_expired(1, "bob", Role::Moderator);
        assert!(!claim.check_validity());
        assert!(claim.has_role(Role::Moderator));
        assert!(claim.has_at_least(Role::User));
        assert!(!claim.has_at_least(Role::Admin));
        claim.set_validity(SystemTime::now() + std::time::Duration::from_secs(60));
        assert!(claim.check_validity());
        assert_eq!(claim.username(), "bob");
    }
}
