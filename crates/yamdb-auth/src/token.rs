use std::time::{Duration, SystemTime};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Serialize};
use yamdb_types::claim::TimeLimited;

use crate::error::Result;

/// Issues and validates HS256 signed access tokens.
///
/// Tokens carry `sub` and `exp`, expiration is checked without leeway.
pub struct TokenManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validity: Duration,
    validation: Validation,
}

impl TokenManager {
    pub fn new(secret: impl AsRef<[u8]>, validity: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(secret.as_ref()),
            decoding: DecodingKey::from_secret(secret.as_ref()),
            validity,
            validation,
        }
    }

    pub fn issue(&self, claims: impl Serialize + TimeLimited) -> Result<String> {
        self.issue_at(claims, SystemTime::now())
    }

    /// Token as if issued at `issued`, it expires after configured validity
    pub fn issue_at(
        &self,
        mut claims: impl Serialize + TimeLimited,
        issued: SystemTime,
    ) -> Result<String> {
        claims.set_validity(issued + self.validity);
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    pub fn validate<T: DeserializeOwned>(&self, token: &str) -> Result<T> {
        Ok(decode::<T>(token, &self.decoding, &self.validation)?.claims)
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }
}

#[cfg(test)]
mod tests {
    use yamdb_types::claim::{ApiClaim, Role};

    use super::*;
    use crate::Error;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_token() {
        let claim = ApiClaim::new_expired(123, "bob", Role::Moderator);
        let manager = TokenManager::new("secret", HOUR);
        let token = manager.issue(claim).unwrap();
        let claim = manager.validate::<ApiClaim>(&token).unwrap();
        assert_eq!(claim.sub, "bob");
        assert_eq!(claim.uid, 123);
        assert_eq!(claim.role, Role::Moderator);
        assert!(claim.check_validity());
    }

    #[test]
    fn test_token_expiration() {
        let claim = ApiClaim::new_expired(123, "bob", Role::User);
        let manager = TokenManager::new("secret", HOUR);
        let issued = SystemTime::now() - 2 * HOUR;
        let token = manager.issue_at(claim, issued).unwrap();

        match manager.validate::<ApiClaim>(&token) {
            Err(Error::JwtError(e)) => assert!(matches!(
                e.kind(),
                jsonwebtoken::errors::ErrorKind::ExpiredSignature
            )),
            Ok(_) => panic!("Expired token accepted"),
        }
    }

    #[test]
    fn test_token_other_secret() {
        let claim = ApiClaim::new_expired(1, "alice", Role::Admin);
        let manager = TokenManager::new("secret", HOUR);
        let token = manager.issue(claim).unwrap();
        let other = TokenManager::new("other secret", HOUR);
        assert!(other.validate::<ApiClaim>(&token).is_err());
        assert!(manager.validate::<ApiClaim>("not.a.token").is_err());
    }
}
