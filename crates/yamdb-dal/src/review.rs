use futures::TryStreamExt as _;
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Executor, Pool};
use time::OffsetDateTime;
use tracing::debug;
use yamdb_types::ValidationError;

use crate::{
    Batch, ChosenConnection, ChosenDB, Error, ListingParams,
    error::{Result, is_unique_violation},
};

const VALID_ORDER_FIELDS: &[&str] = &["id", "score", "pub_date"];
pub const MIN_SCORE: i64 = 1;
pub const MAX_SCORE: i64 = 10;
const DUPLICATE_REVIEW: &str = "Only one review per title is allowed.";

pub fn validate_score(value: &i64, _ctx: &()) -> garde::Result {
    if *value < MIN_SCORE {
        Err(garde::Error::new(format!(
            "score cannot be less than {MIN_SCORE}"
        )))
    } else if *value > MAX_SCORE {
        Err(garde::Error::new(format!(
            "score cannot be more than {MAX_SCORE}"
        )))
    } else {
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateReview {
    #[garde(length(min = 1, max = 10_000))]
    pub text: String,
    #[garde(custom(validate_score))]
    pub score: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateReview {
    #[garde(inner(length(min = 1, max = 10_000)))]
    #[serde(default)]
    pub text: Option<String>,
    #[garde(inner(custom(validate_score)))]
    #[serde(default)]
    pub score: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Review {
    pub id: i64,
    pub text: String,
    /// author's username
    pub author: String,
    pub score: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub pub_date: OffsetDateTime,
    #[serde(skip)]
    pub author_id: i64,
    #[serde(skip)]
    pub title_id: i64,
}

const REVIEW_SELECT: &str = r#"
SELECT r.id, r.text, u.username AS author, r.score, r.pub_date, r.author_id, r.title_id
FROM review r
JOIN users u ON r.author_id = u.id
"#;

fn duplicate_review() -> Error {
    ValidationError::non_field(DUPLICATE_REVIEW).into()
}

/// Concurrent insert losing on `UNIQUE(title_id, author_id)` reports the same error as the pre-check
fn map_review_insert(e: sqlx::Error) -> Error {
    if is_unique_violation(&e) {
        duplicate_review()
    } else {
        e.into()
    }
}

async fn get(title_id: i64, id: i64, conn: &mut ChosenConnection) -> Result<Review> {
    sqlx::query_as::<_, Review>(&format!(
        "{REVIEW_SELECT} WHERE r.id = ? AND r.title_id = ?"
    ))
    .bind(id)
    .bind(title_id)
    .fetch_one(conn)
    .await
    .map_err(Error::not_found("Review"))
}

async fn ensure_title<'c, E>(title_id: i64, executor: E) -> Result<()>
where
    E: Executor<'c, Database = ChosenDB>,
{
    sqlx::query_scalar::<_, i64>("SELECT id FROM title WHERE id = ?")
        .bind(title_id)
        .fetch_one(executor)
        .await
        .map_err(Error::not_found("Title"))?;
    Ok(())
}

pub type ReviewRepository = ReviewRepositoryImpl<Pool<ChosenDB>>;

pub struct ReviewRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> ReviewRepositoryImpl<E>
where
    for<'a> &'a E: Executor<'c, Database = ChosenDB> + Acquire<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Creates review of the title, each author can review the title only once
    pub async fn create(&self, title_id: i64, author_id: i64, payload: CreateReview) -> Result<Review> {
        let mut transaction = self.executor.begin().await?;
        ensure_title(title_id, &mut *transaction).await?;

        let existing: Option<i64> =
            sqlx::query_scalar("SELECT id FROM review WHERE title_id = ? AND author_id = ?")
                .bind(title_id)
                .bind(author_id)
                .fetch_optional(&mut *transaction)
                .await?;
        if existing.is_some() {
            debug!("User {author_id} already reviewed title {title_id}");
            return Err(duplicate_review());
        }

        let result = sqlx::query(
            "INSERT INTO review (title_id, author_id, text, score, pub_date) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(title_id)
        .bind(author_id)
        .bind(&payload.text)
        .bind(payload.score)
        .bind(OffsetDateTime::now_utc())
        .execute(&mut *transaction)
        .await
        .map_err(map_review_insert)?;

        let review = get(title_id, result.last_insert_rowid(), &mut transaction).await?;
        transaction.commit().await?;
        Ok(review)
    }

    pub async fn list(&self, title_id: i64, params: ListingParams) -> Result<Batch<Review>> {
        ensure_title(title_id, &self.executor).await?;
        let order = params.order_by(VALID_ORDER_FIELDS, "r.id", "r.")?;
        let total: i64 = sqlx::query_scalar("SELECT count(*) FROM review WHERE title_id = ?")
            .bind(title_id)
            .fetch_one(&self.executor)
            .await?;
        let rows = sqlx::query_as::<_, Review>(&format!(
            "{REVIEW_SELECT} WHERE r.title_id = ? {order} LIMIT ? OFFSET ?"
        ))
        .bind(title_id)
        .bind(params.limit())
        .bind(params.offset)
        .fetch(&self.executor)
        .try_collect::<Vec<_>>()
        .await?;
        Ok(Batch {
            offset: params.offset,
            limit: params.limit(),
            rows,
            total: total as u64,
        })
    }

    pub async fn get(&self, title_id: i64, id: i64) -> Result<Review> {
        let mut conn = self.executor.acquire().await?;
        get(title_id, id, &mut *conn).await
    }

    pub async fn update(&self, title_id: i64, id: i64, payload: UpdateReview) -> Result<Review> {
        let mut transaction = self.executor.begin().await?;
        let current = get(title_id, id, &mut transaction).await?;
        sqlx::query("UPDATE review SET text = ?, score = ? WHERE id = ?")
            .bind(payload.text.unwrap_or(current.text))
            .bind(payload.score.unwrap_or(current.score))
            .bind(id)
            .execute(&mut *transaction)
            .await?;
        let review = get(title_id, id, &mut transaction).await?;
        transaction.commit().await?;
        Ok(review)
    }

    pub async fn delete(&self, title_id: i64, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM review WHERE id = ? AND title_id = ?")
            .bind(id)
            .bind(title_id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("Review".to_string()))
        } else {
            Ok(())
        }
    }

    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM review")
            .fetch_one(&self.executor)
            .await?;
        Ok(count as u64)
    }
}
