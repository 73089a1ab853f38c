use std::{fmt::Display, str::FromStr};

use garde::Validate;
use serde::{Deserialize, Serialize};

/// Username reserved for the current user's profile route
pub const RESERVED_USERNAME: &str = "me";
pub const MAX_USERNAME_LEN: usize = 150;
pub const MAX_SLUG_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Validate, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[garde(transparent)]
#[serde(transparent)]
pub struct ValidEmail(#[garde(email, length(max = 254))] String);

#[cfg(feature = "e2e-tests")]
impl ValidEmail {
    pub fn cheat(email: String) -> Self {
        ValidEmail(email)
    }
}

impl FromStr for ValidEmail {
    type Err = garde::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let email = ValidEmail(s.to_string());
        email.validate()?;
        Ok(email)
    }
}

impl AsRef<str> for ValidEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for ValidEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_username_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-')
}

/// Letters, digits and `_.@+-` only, `me` is reserved
pub fn validate_username(value: &str, _ctx: &()) -> garde::Result {
    if value.is_empty() {
        return Err(garde::Error::new("username cannot be empty"));
    }
    if value.chars().count() > MAX_USERNAME_LEN {
        return Err(garde::Error::new(format!(
            "username cannot be longer than {MAX_USERNAME_LEN} characters"
        )));
    }
    if value.eq_ignore_ascii_case(RESERVED_USERNAME) {
        return Err(garde::Error::new(format!(
            "username '{value}' is reserved"
        )));
    }
    if !value.chars().all(is_username_char) {
        return Err(garde::Error::new(
            "username may contain only letters, digits and _.@+- characters",
        ));
    }
    Ok(())
}

pub fn validate_slug(value: &str, _ctx: &()) -> garde::Result {
    if value.is_empty() || value.len() > MAX_SLUG_LEN {
        return Err(garde::Error::new(format!(
            "slug must have 1 to {MAX_SLUG_LEN} characters"
        )));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(garde::Error::new(
            "slug may contain only latin letters, digits, hyphens and underscores",
        ));
    }
    Ok(())
}
