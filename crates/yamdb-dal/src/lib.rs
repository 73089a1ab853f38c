pub mod category;
pub mod comment;
pub mod error;
pub mod genre;
pub mod import;
pub mod review;
mod slug_entity;
pub mod title;
pub mod user;

use std::{fmt::Display, str::FromStr as _};

pub use error::Error;
pub use sqlx::Error as SqlxError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::Result;

pub type ChosenDB = sqlx::Sqlite;
pub type ChosenRow = sqlx::sqlite::SqliteRow;
pub type ChosenConnection = sqlx::SqliteConnection;
pub type Pool = sqlx::Pool<ChosenDB>;

pub const MAX_LIMIT: usize = 10_000;

pub async fn new_pool(database_url: &str) -> Result<Pool, Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(50)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Applies pending schema migrations
pub async fn migrate(pool: &Pool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

#[derive(Debug, Clone)]
pub enum Order {
    Asc(String),
    Desc(String),
}

impl Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Order::Asc(s) => write!(f, "{}", s),
            Order::Desc(s) => write!(f, "{} DESC", s),
        }
    }
}

impl AsRef<str> for Order {
    fn as_ref(&self) -> &str {
        match self {
            Order::Asc(s) => s.as_str(),
            Order::Desc(s) => s.as_str(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListingParams {
    pub offset: i64,
    pub limit: i64,
    pub order: Option<Vec<Order>>,
}

impl Default for ListingParams {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: MAX_LIMIT as i64,
            order: None,
        }
    }
}

impl ListingParams {
    pub fn new(offset: i64, limit: i64) -> Self {
        Self {
            offset,
            limit,
            order: None,
        }
    }
    pub fn with_order(mut self, order: Vec<Order>) -> Self {
        self.order = Some(order);
        self
    }

    pub fn ordering(&self, valid_fields: &[&str]) -> Result<String> {
        let ordering = self
            .order
            .as_ref()
            .map(|o| {
                o.iter()
                    .map(|o| {
                        if valid_fields.contains(&o.as_ref()) {
                            Ok(o.to_string())
                        } else {
                            Err(Error::InvalidOrderByField(o.as_ref().to_string()))
                        }
                    })
                    .collect::<Result<Vec<String>>>()
                    .map(|o| o.join(", "))
            })
            .transpose()?
            .unwrap_or_default();
        Ok(ordering)
    }

    /// Complete ORDER BY clause, field names are checked against `valid_fields`,
    /// `prefix` qualifies columns with table alias
    pub(crate) fn order_by(&self, valid_fields: &[&str], default: &str, prefix: &str) -> Result<String> {
        let ordering = self.ordering(valid_fields)?;
        if ordering.is_empty() {
            Ok(format!("ORDER BY {default}"))
        } else {
            let qualified = ordering
                .split(", ")
                .map(|o| format!("{prefix}{o}"))
                .collect::<Vec<_>>()
                .join(", ");
            let has_id = self
                .order
                .iter()
                .flatten()
                .any(|o| o.as_ref() == "id");
            if has_id {
                Ok(format!("ORDER BY {qualified}"))
            } else {
                // stable paging
                Ok(format!("ORDER BY {qualified}, {prefix}id"))
            }
        }
    }

    pub(crate) fn limit(&self) -> i64 {
        self.limit.clamp(0, MAX_LIMIT as i64)
    }
}

/// One page of listed records with total count of all matching records
#[derive(Debug, Clone)]
pub struct Batch<T> {
    pub offset: i64,
    pub limit: i64,
    pub rows: Vec<T>,
    pub total: u64,
}

impl<T> Batch<T> {
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Batch<U> {
        Batch {
            offset: self.offset,
            limit: self.limit,
            rows: self.rows.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        let params = ListingParams::new(0, 10)
            .with_order(vec![Order::Desc("score".into()), Order::Asc("id".into())]);
        assert_eq!(params.ordering(&["id", "score"]).unwrap(), "score DESC, id");
        assert_eq!(
            params.order_by(&["id", "score"], "id", "r.").unwrap(),
            "ORDER BY r.score DESC, r.id"
        );
        let params = ListingParams::new(0, 10).with_order(vec![Order::Asc("name".into())]);
        assert_eq!(
            params.order_by(&["name"], "id", "").unwrap(),
            "ORDER BY name, id"
        );
        let res = params.ordering(&["id"]);
        assert!(matches!(res, Err(Error::InvalidOrderByField(f)) if f == "name"));
    }

    #[test]
    fn test_default_order() {
        let params = ListingParams::default();
        assert_eq!(params.order_by(&["id"], "id DESC", "").unwrap(), "ORDER BY id DESC");
        assert_eq!(params.limit(), MAX_LIMIT as i64);
    }
}
