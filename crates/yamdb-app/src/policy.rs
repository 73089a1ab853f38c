//! Access control rules shared by all API handlers.
//!
//! Decision depends only on actor's role (none for anonymous caller), resource scope,
//! action derived from HTTP method and ownership of the target object.

use std::future::Future;

use http::Method;
use yamdb_types::claim::{ApiClaim, Role};

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// categories, genres, titles
    Catalog,
    /// reviews, comments
    Authored,
    /// user accounts
    Account,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl From<&Method> for Action {
    fn from(method: &Method) -> Self {
        if method == Method::POST {
            Action::Create
        } else if method == Method::PUT || method == Method::PATCH {
            Action::Update
        } else if method == Method::DELETE {
            Action::Delete
        } else {
            Action::Read
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Unauthenticated,
    Forbidden,
}

pub fn decide(role: Option<Role>, scope: Scope, action: Action, is_owner: bool) -> Decision {
    if action == Action::Read && scope != Scope::Account {
        return Decision::Allow;
    }
    let Some(role) = role else {
        return Decision::Unauthenticated;
    };
    let allowed = match (scope, action) {
        (Scope::Catalog, _) => role >= Role::Admin,
        (Scope::Authored, Action::Create) => true,
        (Scope::Authored, _) => is_owner || role >= Role::Moderator,
        (Scope::Account, Action::Read | Action::Update) => is_owner || role >= Role::Admin,
        (Scope::Account, _) => role >= Role::Admin,
    };
    if allowed {
        Decision::Allow
    } else {
        Decision::Forbidden
    }
}

pub fn check(actor: Option<&ApiClaim>, scope: Scope, action: Action, is_owner: bool) -> ApiResult<()> {
    match decide(actor.map(|a| a.role), scope, action, is_owner) {
        Decision::Allow => Ok(()),
        Decision::Unauthenticated => Err(ApiError::unauthenticated()),
        Decision::Forbidden => Err(ApiError::Forbidden),
    }
}

/// Requires authenticated actor
pub fn authenticated(actor: Option<ApiClaim>) -> ApiResult<ApiClaim> {
    actor.ok_or_else(ApiError::unauthenticated)
}

/// Loads target object and checks access to it.
///
/// If the object does not exist, the caller learns it only when it is allowed to act
/// on objects it does not own, others get 403.
pub async fn authorize_target<T, F>(
    actor: &ApiClaim,
    scope: Scope,
    action: Action,
    target: F,
    owner_id: impl FnOnce(&T) -> i64,
) -> ApiResult<T>
where
    F: Future<Output = Result<T, yamdb_dal::Error>>,
{
    match target.await {
        Ok(object) => {
            let is_owner = owner_id(&object) == actor.uid;
            check(Some(actor), scope, action, is_owner)?;
            Ok(object)
        }
        Err(e) if e.is_not_found() => {
            check(Some(actor), scope, action, false)?;
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}
