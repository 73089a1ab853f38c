//! Bulk load of catalog data with original record ids preserved.
//!
//! All records are written in single transaction, which is committed only
//! when every record is accepted.

use std::str::FromStr as _;

use serde::Deserialize;
use sqlx::Transaction;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::debug;
use yamdb_types::claim::Role;

use crate::{ChosenDB, Error, Pool, error::Result};

#[derive(Debug, Clone, Deserialize)]
pub struct SlugRecord {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TitleRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub year: Option<i32>,
    /// category id
    #[serde(default)]
    pub category: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Genre assignment, genres of a title keep order of records
#[derive(Debug, Clone, Deserialize)]
pub struct GenreTitleRecord {
    pub title_id: i64,
    pub genre_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRecord {
    pub id: i64,
    pub title_id: i64,
    pub text: String,
    /// author's user id
    pub author: i64,
    pub score: i64,
    pub pub_date: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentRecord {
    pub id: i64,
    pub review_id: i64,
    pub text: String,
    /// author's user id
    pub author: i64,
    pub pub_date: String,
}

fn parse_date(value: &str, record: &str, id: i64) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(value.trim(), &Rfc3339)
        .map_err(|e| Error::InvalidImportRecord(format!("{record} {id}: invalid pub_date: {e}")))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub struct Importer {
    transaction: Transaction<'static, ChosenDB>,
}

impl Importer {
    pub async fn begin(pool: &Pool) -> Result<Self> {
        let transaction = pool.begin().await?;
        Ok(Importer { transaction })
    }

    pub async fn commit(self) -> Result<()> {
        self.transaction.commit().await?;
        Ok(())
    }

    async fn slug_records(
        &mut self,
        table: &str,
        records: impl IntoIterator<Item = SlugRecord>,
    ) -> Result<u64> {
        let sql = format!("INSERT INTO {table} (id, name, slug) VALUES (?, ?, ?)");
        let mut count = 0;
        for record in records {
            sqlx::query(&sql)
                .bind(record.id)
                .bind(record.name)
                .bind(record.slug)
                .execute(&mut *self.transaction)
                .await?;
            count += 1;
        }
        debug!("Imported {count} records into {table}");
        Ok(count)
    }

    pub async fn categories(&mut self, records: impl IntoIterator<Item = SlugRecord>) -> Result<u64> {
        self.slug_records("category", records).await
    }

    pub async fn genres(&mut self, records: impl IntoIterator<Item = SlugRecord>) -> Result<u64> {
        self.slug_records("genre", records).await
    }

    pub async fn titles(&mut self, records: impl IntoIterator<Item = TitleRecord>) -> Result<u64> {
        let mut count = 0;
        for record in records {
            sqlx::query(
                "INSERT INTO title (id, name, year, description, category_id) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(record.id)
            .bind(record.name)
            .bind(record.year)
            .bind(non_empty(record.description))
            .bind(record.category)
            .execute(&mut *self.transaction)
            .await?;
            count += 1;
        }
        debug!("Imported {count} titles");
        Ok(count)
    }

    pub async fn genre_titles(
        &mut self,
        records: impl IntoIterator<Item = GenreTitleRecord>,
    ) -> Result<u64> {
        let mut count = 0;
        for record in records {
            sqlx::query(
                "INSERT INTO title_genre (title_id, genre_id, position) VALUES (?1, ?2, (SELECT count(*) FROM title_genre WHERE title_id = ?1))",
            )
            .bind(record.title_id)
            .bind(record.genre_id)
            .execute(&mut *self.transaction)
            .await?;
            count += 1;
        }
        debug!("Imported {count} genre assignments");
        Ok(count)
    }

    pub async fn users(&mut self, records: impl IntoIterator<Item = UserRecord>) -> Result<u64> {
        let mut count = 0;
        for record in records {
            let role = match non_empty(record.role) {
                Some(role) => Role::from_str(&role).map_err(|e| {
                    Error::InvalidImportRecord(format!("user {}: {e}", record.id))
                })?,
                None => Role::default(),
            };
            sqlx::query(
                "INSERT INTO users (id, username, email, first_name, last_name, bio, role) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(record.id)
            .bind(record.username)
            .bind(record.email)
            .bind(record.first_name.unwrap_or_default())
            .bind(record.last_name.unwrap_or_default())
            .bind(non_empty(record.bio))
            .bind(role.as_str())
            .execute(&mut *self.transaction)
            .await?;
            count += 1;
        }
        debug!("Imported {count} users");
        Ok(count)
    }

    pub async fn reviews(&mut self, records: impl IntoIterator<Item = ReviewRecord>) -> Result<u64> {
        let mut count = 0;
        for record in records {
            let pub_date = parse_date(&record.pub_date, "review", record.id)?;
            sqlx::query(
                "INSERT INTO review (id, title_id, author_id, text, score, pub_date) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(record.id)
            .bind(record.title_id)
            .bind(record.author)
            .bind(record.text)
            .bind(record.score)
            .bind(pub_date)
            .execute(&mut *self.transaction)
            .await?;
            count += 1;
        }
        debug!("Imported {count} reviews");
        Ok(count)
    }

    pub async fn comments(&mut self, records: impl IntoIterator<Item = CommentRecord>) -> Result<u64> {
        let mut count = 0;
        for record in records {
            let pub_date = parse_date(&record.pub_date, "comment", record.id)?;
            sqlx::query(
                "INSERT INTO comment (id, review_id, author_id, text, pub_date) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(record.id)
            .bind(record.review_id)
            .bind(record.author)
            .bind(record.text)
            .bind(pub_date)
            .execute(&mut *self.transaction)
            .await?;
            count += 1;
        }
        debug!("Imported {count} comments");
        Ok(count)
    }
}
