use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{Result as HashResult, SaltString, rand_core::OsRng},
};

use futures::TryStreamExt as _;
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Executor, Pool};
use tracing::{debug, warn};
use yamdb_types::{
    ValidationError,
    claim::Role,
    general::{ValidEmail, validate_username},
};

use crate::{
    Batch, ChosenConnection, ChosenDB, Error, ListingParams,
    error::{Result, is_unique_violation},
};

const VALID_ORDER_FIELDS: &[&str] = &["id", "username", "email", "role"];
const USER_COLUMNS: &str = "id, username, email, first_name, last_name, bio, role, is_superuser";

fn hash_code(code: &str) -> HashResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let code_hash = argon2.hash_password(code.as_bytes(), &salt)?.to_string();
    Ok(code_hash)
}

fn verify_code(code: &str, code_hash: &str) -> HashResult<bool> {
    let parsed_hash = PasswordHash::new(code_hash)?;
    let res = Argon2::default().verify_password(code.as_bytes(), &parsed_hash);
    if let Err(e) = res {
        debug!("Invalid confirmation code, error {e}");
    }
    Ok(res.is_ok())
}

/// User created by admin
#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateUser {
    #[garde(custom(validate_username))]
    pub username: String,
    #[garde(dive)]
    pub email: ValidEmail,
    #[garde(length(max = 150))]
    #[serde(default)]
    pub first_name: Option<String>,
    #[garde(length(max = 150))]
    #[serde(default)]
    pub last_name: Option<String>,
    #[garde(length(max = 5000))]
    #[serde(default)]
    pub bio: Option<String>,
    #[garde(skip)]
    #[serde(default)]
    pub role: Option<Role>,
    /// only settable from command line
    #[garde(skip)]
    #[serde(skip)]
    pub is_superuser: bool,
}

/// Self registration request
#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SignupUser {
    #[garde(custom(validate_username))]
    pub username: String,
    #[garde(dive)]
    pub email: ValidEmail,
}

/// Partial update of user profile, missing fields are kept
#[derive(Debug, Serialize, Deserialize, Clone, Validate, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateUser {
    #[garde(inner(custom(validate_username)))]
    #[serde(default)]
    pub username: Option<String>,
    #[garde(dive)]
    #[serde(default)]
    pub email: Option<ValidEmail>,
    #[garde(length(max = 150))]
    #[serde(default)]
    pub first_name: Option<String>,
    #[garde(length(max = 150))]
    #[serde(default)]
    pub last_name: Option<String>,
    #[garde(length(max = 5000))]
    #[serde(default)]
    pub bio: Option<String>,
    #[garde(skip)]
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserInt {
    id: i64,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    bio: Option<String>,
    role: String,
    is_superuser: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing)]
    pub is_superuser: bool,
}

impl User {
    /// Role used for authorization
    pub fn effective_role(&self) -> Role {
        self.role.effective(self.is_superuser)
    }
}

impl From<UserInt> for User {
    fn from(value: UserInt) -> Self {
        let role = value.role.parse().unwrap_or_else(|e| {
            warn!("User {} has invalid role in database: {e}", value.id);
            Role::User
        });
        Self {
            id: value.id,
            username: value.username,
            email: value.email,
            first_name: value.first_name,
            last_name: value.last_name,
            bio: value.bio,
            role,
            is_superuser: value.is_superuser,
        }
    }
}

fn unique_pair_error() -> ValidationError {
    let mut errors = ValidationError::new();
    errors.add("username", "A user with this username or email already exists.");
    errors.add("email", "A user with this username or email already exists.");
    errors
}

fn map_unique(e: sqlx::Error) -> Error {
    if is_unique_violation(&e) {
        unique_pair_error().into()
    } else {
        e.into()
    }
}

async fn find_id<'c, E>(column: &'static str, value: &str, executor: E) -> Result<Option<i64>>
where
    E: Executor<'c, Database = ChosenDB>,
{
    let id = sqlx::query_scalar::<_, i64>(&format!("SELECT id FROM users WHERE {column} = ?"))
        .bind(value)
        .fetch_optional(executor)
        .await?;
    Ok(id)
}

async fn get_by<'c, E>(column: &'static str, value: impl ToString, executor: E) -> Result<User>
where
    E: Executor<'c, Database = ChosenDB>,
{
    let user: User = sqlx::query_as::<_, UserInt>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE {column} = ?"
    ))
    .bind(value.to_string())
    .fetch_one(executor)
    .await
    .map_err(Error::not_found("User"))?
    .into();
    Ok(user)
}

/// Checks that username and email are not used by other user than `own_id`
async fn check_unique(
    conn: &mut ChosenConnection,
    username: &str,
    email: &str,
    own_id: Option<i64>,
) -> Result<()> {
    let mut errors = ValidationError::new();
    if let Some(id) = find_id("username", username, &mut *conn).await? {
        if Some(id) != own_id {
            errors.add("username", "A user with that username already exists.");
        }
    }
    if let Some(id) = find_id("email", email, &mut *conn).await? {
        if Some(id) != own_id {
            errors.add("email", "A user with that email already exists.");
        }
    }
    errors.into_result().map_err(Error::from)
}

pub type UserRepository = UserRepositoryImpl<Pool<ChosenDB>>;

pub struct UserRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> UserRepositoryImpl<E>
where
    for<'a> &'a E: Executor<'c, Database = ChosenDB> + Acquire<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateUser) -> Result<User> {
        let mut transaction = self.executor.begin().await?;
        check_unique(
            &mut transaction,
            &payload.username,
            payload.email.as_ref(),
            None,
        )
        .await?;
        let role = payload.role.unwrap_or_default();
        let result = sqlx::query(
            "INSERT INTO users (username, email, first_name, last_name, bio, role, is_superuser) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&payload.username)
        .bind(payload.email.as_ref())
        .bind(payload.first_name.unwrap_or_default())
        .bind(payload.last_name.unwrap_or_default())
        .bind(payload.bio)
        .bind(role.as_str())
        .bind(payload.is_superuser)
        .execute(&mut *transaction)
        .await
        .map_err(map_unique)?;

        let id = result.last_insert_rowid();
        let user = get_by("id", id, &mut *transaction).await?;
        transaction.commit().await?;
        Ok(user)
    }

    /// Finds or creates user with given username and email and stores new confirmation code.
    ///
    /// Fails with validation error if username or email already belongs to a different user.
    pub async fn register(&self, payload: SignupUser, confirmation_code: &str) -> Result<User> {
        let code_hash = hash_code(confirmation_code)?;
        let email = payload.email.as_ref();
        let mut transaction = self.executor.begin().await?;

        let by_username = find_id("username", &payload.username, &mut *transaction).await?;
        let by_email = find_id("email", email, &mut *transaction).await?;

        let id = match (by_username, by_email) {
            (Some(a), Some(b)) if a == b => {
                debug!("Signup of existing user {}", payload.username);
                sqlx::query("UPDATE users SET confirmation_code = ? WHERE id = ?")
                    .bind(&code_hash)
                    .bind(a)
                    .execute(&mut *transaction)
                    .await?;
                a
            }
            (None, None) => sqlx::query(
                "INSERT INTO users (username, email, role, confirmation_code) VALUES (?, ?, ?, ?)",
            )
            .bind(&payload.username)
            .bind(email)
            .bind(Role::User.as_str())
            .bind(&code_hash)
            .execute(&mut *transaction)
            .await
            .map_err(map_unique)?
            .last_insert_rowid(),
            (by_username, by_email) => {
                let mut errors = ValidationError::new();
                if by_username.is_some() {
                    errors.add(
                        "username",
                        "A user with that username is registered with different email.",
                    );
                }
                if by_email.is_some() {
                    errors.add(
                        "email",
                        "A user with that email is registered with different username.",
                    );
                }
                return Err(errors.into());
            }
        };

        let user = get_by("id", id, &mut *transaction).await?;
        transaction.commit().await?;
        Ok(user)
    }

    /// Verifies confirmation code, on success the code is consumed
    pub async fn check_confirmation_code(&self, username: &str, code: &str) -> Result<User> {
        let mut transaction = self.executor.begin().await?;
        let (id, code_hash): (i64, Option<String>) =
            sqlx::query_as("SELECT id, confirmation_code FROM users WHERE username = ?")
                .bind(username)
                .fetch_one(&mut *transaction)
                .await
                .map_err(Error::not_found("User"))?;

        let valid = match code_hash {
            Some(code_hash) => verify_code(code, &code_hash)?,
            None => false,
        };
        if !valid {
            return Err(Error::InvalidConfirmationCode);
        }

        sqlx::query("UPDATE users SET confirmation_code = NULL WHERE id = ?")
            .bind(id)
            .execute(&mut *transaction)
            .await?;
        let user = get_by("id", id, &mut *transaction).await?;
        transaction.commit().await?;
        Ok(user)
    }

    pub async fn list(
        &self,
        params: ListingParams,
        search: Option<&str>,
    ) -> Result<Batch<User>> {
        let order = params.order_by(VALID_ORDER_FIELDS, "id DESC", "")?;
        let total: i64 = sqlx::query_scalar(
            "SELECT count(*) FROM users WHERE (?1 IS NULL OR instr(lower(username), lower(?1)) > 0)",
        )
        .bind(search)
        .fetch_one(&self.executor)
        .await?;
        let rows = sqlx::query_as::<_, UserInt>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE (?1 IS NULL OR instr(lower(username), lower(?1)) > 0) {order} LIMIT ?2 OFFSET ?3"
        ))
        .bind(search)
        .bind(params.limit())
        .bind(params.offset)
        .fetch(&self.executor)
        .map_ok(User::from)
        .try_collect::<Vec<_>>()
        .await?;
        Ok(Batch {
            offset: params.offset,
            limit: params.limit(),
            rows,
            total: total as u64,
        })
    }

    pub async fn update(&self, id: i64, payload: UpdateUser) -> Result<User> {
        let mut transaction = self.executor.begin().await?;
        let current = get_by("id", id, &mut *transaction).await?;
        let username = payload.username.unwrap_or(current.username);
        let email = payload
            .email
            .map(|e| e.as_ref().to_string())
            .unwrap_or(current.email);
        check_unique(&mut transaction, &username, &email, Some(id)).await?;
        let role = payload.role.unwrap_or(current.role);

        sqlx::query(
            "UPDATE users SET username = ?, email = ?, first_name = ?, last_name = ?, bio = ?, role = ? WHERE id = ?",
        )
        .bind(&username)
        .bind(&email)
        .bind(payload.first_name.unwrap_or(current.first_name))
        .bind(payload.last_name.unwrap_or(current.last_name))
        .bind(payload.bio.or(current.bio))
        .bind(role.as_str())
        .bind(id)
        .execute(&mut *transaction)
        .await
        .map_err(map_unique)?;

        let user = get_by("id", id, &mut *transaction).await?;
        transaction.commit().await?;
        Ok(user)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("User".to_string()))
        } else {
            Ok(())
        }
    }

    pub async fn get(&self, id: i64) -> Result<User> {
        get_by("id", id, &self.executor).await
    }

    pub async fn get_by_username(&self, username: &str) -> Result<User> {
        get_by("username", username, &self.executor).await
    }

    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM users")
            .fetch_one(&self.executor)
            .await?;
        Ok(count as u64)
    }
}
