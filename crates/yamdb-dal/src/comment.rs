use futures::TryStreamExt as _;
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Executor, Pool};
use time::OffsetDateTime;

use crate::{Batch, ChosenConnection, ChosenDB, Error, ListingParams, error::Result};

const VALID_ORDER_FIELDS: &[&str] = &["id", "pub_date"];

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateComment {
    #[garde(length(min = 1, max = 10_000))]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateComment {
    #[garde(inner(length(min = 1, max = 10_000)))]
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub author: String,
    #[serde(with = "time::serde::rfc3339")]
    pub pub_date: OffsetDateTime,
    #[serde(skip)]
    pub author_id: i64,
    #[serde(skip)]
    pub review_id: i64,
}

const COMMENT_SELECT: &str = r#"
SELECT c.id, c.text, u.username AS author, c.pub_date, c.author_id, c.review_id
FROM comment c
JOIN users u ON c.author_id = u.id
JOIN review r ON c.review_id = r.id
"#;

/// Review must exist and belong to the title
async fn ensure_review<'c, E>(title_id: i64, review_id: i64, executor: E) -> Result<()>
where
    E: Executor<'c, Database = ChosenDB>,
{
    sqlx::query_scalar::<_, i64>("SELECT id FROM review WHERE id = ? AND title_id = ?")
        .bind(review_id)
        .bind(title_id)
        .fetch_one(executor)
        .await
        .map_err(Error::not_found("Review"))?;
    Ok(())
}

async fn get(title_id: i64, review_id: i64, id: i64, conn: &mut ChosenConnection) -> Result<Comment> {
    sqlx::query_as::<_, Comment>(&format!(
        "{COMMENT_SELECT} WHERE c.id = ? AND c.review_id = ? AND r.title_id = ?"
    ))
    .bind(id)
    .bind(review_id)
    .bind(title_id)
    .fetch_one(conn)
    .await
    .map_err(Error::not_found("Comment"))
}

pub type CommentRepository = CommentRepositoryImpl<Pool<ChosenDB>>;

pub struct CommentRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> CommentRepositoryImpl<E>
where
    for<'a> &'a E: Executor<'c, Database = ChosenDB> + Acquire<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(
        &self,
        title_id: i64,
        review_id: i64,
        author_id: i64,
        payload: CreateComment,
    ) -> Result<Comment> {
        let mut transaction = self.executor.begin().await?;
        ensure_review(title_id, review_id, &mut *transaction).await?;
        let result = sqlx::query(
            "INSERT INTO comment (review_id, author_id, text, pub_date) VALUES (?, ?, ?, ?)",
        )
        .bind(review_id)
        .bind(author_id)
        .bind(&payload.text)
        .bind(OffsetDateTime::now_utc())
        .execute(&mut *transaction)
        .await?;
        let comment = get(title_id, review_id, result.last_insert_rowid(), &mut transaction).await?;
        transaction.commit().await?;
        Ok(comment)
    }

    pub async fn list(
        &self,
        title_id: i64,
        review_id: i64,
        params: ListingParams,
    ) -> Result<Batch<Comment>> {
        ensure_review(title_id, review_id, &self.executor).await?;
        let order = params.order_by(VALID_ORDER_FIELDS, "c.id", "c.")?;
        let total: i64 = sqlx::query_scalar("SELECT count(*) FROM comment WHERE review_id = ?")
            .bind(review_id)
            .fetch_one(&self.executor)
            .await?;
        let rows = sqlx::query_as::<_, Comment>(&format!(
            "{COMMENT_SELECT} WHERE c.review_id = ? {order} LIMIT ? OFFSET ?"
        ))
        .bind(review_id)
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

    pub async fn get(&self, title_id: i64, review_id: i64, id: i64) -> Result<Comment> {
        let mut conn = self.executor.acquire().await?;
        get(title_id, review_id, id, &mut *conn).await
    }

    pub async fn update(
        &self,
        title_id: i64,
        review_id: i64,
        id: i64,
        payload: UpdateComment,
    ) -> Result<Comment> {
        let mut transaction = self.executor.begin().await?;
        let current = get(title_id, review_id, id, &mut transaction).await?;
        sqlx::query("UPDATE comment SET text = ? WHERE id = ?")
            .bind(payload.text.unwrap_or(current.text))
            .bind(id)
            .execute(&mut *transaction)
            .await?;
        let comment = get(title_id, review_id, id, &mut transaction).await?;
        transaction.commit().await?;
        Ok(comment)
    }

    pub async fn delete(&self, title_id: i64, review_id: i64, id: i64) -> Result<()> {
        let res = sqlx::query(
            "DELETE FROM comment WHERE id = ? AND review_id IN (SELECT id FROM review WHERE id = ? AND title_id = ?)",
        )
        .bind(id)
        .bind(review_id)
        .bind(title_id)
        .execute(&self.executor)
        .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("Comment".to_string()))
        } else {
            Ok(())
        }
    }
}
