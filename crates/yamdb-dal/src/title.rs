use std::collections::HashMap;

use futures::TryStreamExt as _;
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Executor, Pool, QueryBuilder, Row};
use tracing::debug;
use yamdb_types::ValidationError;

use crate::{
    Batch, ChosenConnection, ChosenDB, ChosenRow, Error, ListingParams, category::Category,
    error::Result, genre::Genre,
};

const VALID_ORDER_FIELDS: &[&str] = &["id", "name", "year"];
pub const MIN_YEAR: i32 = 1000;

/// Year of release, must be between [`MIN_YEAR`] and current year
pub fn validate_year(value: &i32, _ctx: &()) -> garde::Result {
    let current = time::OffsetDateTime::now_utc().year();
    if *value < MIN_YEAR {
        Err(garde::Error::new(format!(
            "year cannot be earlier than {MIN_YEAR}"
        )))
    } else if *value > current {
        Err(garde::Error::new(format!(
            "year cannot be later than current year {current}"
        )))
    } else {
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateTitle {
    #[garde(length(min = 1, max = 256))]
    pub name: String,
    #[garde(inner(custom(validate_year)))]
    #[serde(default)]
    pub year: Option<i32>,
    #[garde(skip)]
    #[serde(default)]
    pub description: Option<String>,
    /// category slug
    #[garde(skip)]
    #[serde(default)]
    pub category: Option<String>,
    /// genre slugs, order is kept
    #[garde(skip)]
    #[serde(default)]
    pub genre: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateTitle {
    #[garde(inner(length(min = 1, max = 256)))]
    #[serde(default)]
    pub name: Option<String>,
    #[garde(inner(custom(validate_year)))]
    #[serde(default)]
    pub year: Option<i32>,
    #[garde(skip)]
    #[serde(default)]
    pub description: Option<String>,
    #[garde(skip)]
    #[serde(default)]
    pub category: Option<String>,
    #[garde(skip)]
    #[serde(default)]
    pub genre: Option<Vec<String>>,
}

/// Listing filters, all optional and combined with AND
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct TitleFilter {
    /// substring of title name
    pub name: Option<String>,
    /// category slug
    pub category: Option<String>,
    /// genre slug
    pub genre: Option<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Title {
    pub id: i64,
    pub name: String,
    pub year: Option<i32>,
    pub description: Option<String>,
    /// average review score, none if there are no reviews
    pub rating: Option<f64>,
    pub category: Option<Category>,
    pub genre: Vec<Genre>,
}

impl sqlx::FromRow<'_, ChosenRow> for Title {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        let category = match row.try_get::<Option<String>, _>("category_slug")? {
            Some(slug) => Some(Category {
                id: row.try_get("category_id")?,
                name: row.try_get("category_name")?,
                slug,
            }),
            None => None,
        };
        Ok(Title {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            year: row.try_get("year")?,
            description: row.try_get("description")?,
            rating: row.try_get("rating")?,
            category,
            genre: Vec::new(),
        })
    }
}

const TITLE_SELECT: &str = r#"
SELECT t.id, t.name, t.year, t.description,
(SELECT AVG(r.score) FROM review r WHERE r.title_id = t.id) AS rating,
t.category_id, c.name AS category_name, c.slug AS category_slug
FROM title t
LEFT JOIN category c ON t.category_id = c.id
"#;

const TITLE_FILTER: &str = r#"
WHERE (?1 IS NULL OR instr(t.name, ?1) > 0)
AND (?2 IS NULL OR c.slug = ?2)
AND (?3 IS NULL OR EXISTS (
    SELECT 1 FROM title_genre tg JOIN genre g ON tg.genre_id = g.id
    WHERE tg.title_id = t.id AND g.slug = ?3))
AND (?4 IS NULL OR t.year = ?4)
"#;

async fn load_genres<'c, E>(title_ids: &[i64], executor: E) -> Result<HashMap<i64, Vec<Genre>>>
where
    E: Executor<'c, Database = ChosenDB>,
{
    let mut genres: HashMap<i64, Vec<Genre>> = HashMap::new();
    if title_ids.is_empty() {
        return Ok(genres);
    }
    let mut query = QueryBuilder::<ChosenDB>::new(
        "SELECT tg.title_id, g.id, g.name, g.slug FROM title_genre tg JOIN genre g ON tg.genre_id = g.id WHERE tg.title_id IN (",
    );
    let mut ids = query.separated(", ");
    for id in title_ids {
        ids.push_bind(*id);
    }
    ids.push_unseparated(") ORDER BY tg.title_id, tg.position");

    let rows: Vec<(i64, i64, String, String)> =
        query.build_query_as().fetch_all(executor).await?;
    for (title_id, id, name, slug) in rows {
        genres
            .entry(title_id)
            .or_default()
            .push(Genre { id, name, slug });
    }
    Ok(genres)
}

async fn get(id: i64, conn: &mut ChosenConnection) -> Result<Title> {
    let mut title = sqlx::query_as::<_, Title>(&format!("{TITLE_SELECT} WHERE t.id = ?"))
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .map_err(Error::not_found("Title"))?;
    let mut genres = load_genres(&[id], &mut *conn).await?;
    title.genre = genres.remove(&id).unwrap_or_default();
    Ok(title)
}

/// Translates category and genre slugs to ids, unknown slugs are reported as field errors
async fn resolve_category(
    slug: &str,
    conn: &mut ChosenConnection,
    errors: &mut ValidationError,
) -> Result<Option<i64>> {
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM category WHERE slug = ?")
        .bind(slug)
        .fetch_optional(&mut *conn)
        .await?;
    if id.is_none() {
        errors.add("category", format!("Object with slug={slug} does not exist."));
    }
    Ok(id)
}

async fn resolve_genres(
    slugs: &[String],
    conn: &mut ChosenConnection,
    errors: &mut ValidationError,
) -> Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(slugs.len());
    for slug in slugs {
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM genre WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&mut *conn)
            .await?;
        match id {
            Some(id) if !ids.contains(&id) => ids.push(id),
            Some(_) => debug!("Duplicate genre {slug} ignored"),
            None => errors.add("genre", format!("Object with slug={slug} does not exist.")),
        }
    }
    Ok(ids)
}

async fn set_genres(title_id: i64, genre_ids: &[i64], conn: &mut ChosenConnection) -> Result<()> {
    sqlx::query("DELETE FROM title_genre WHERE title_id = ?")
        .bind(title_id)
        .execute(&mut *conn)
        .await?;
    for (position, genre_id) in genre_ids.iter().enumerate() {
        sqlx::query("INSERT INTO title_genre (title_id, genre_id, position) VALUES (?, ?, ?)")
            .bind(title_id)
            .bind(genre_id)
            .bind(position as i64)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub type TitleRepository = TitleRepositoryImpl<Pool<ChosenDB>>;

pub struct TitleRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> TitleRepositoryImpl<E>
where
    for<'a> &'a E: Executor<'c, Database = ChosenDB> + Acquire<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateTitle) -> Result<Title> {
        let mut transaction = self.executor.begin().await?;
        let mut errors = ValidationError::new();
        let category_id = match payload.category.as_deref() {
            Some(slug) => resolve_category(slug, &mut transaction, &mut errors).await?,
            None => None,
        };
        let genre_ids = resolve_genres(&payload.genre, &mut transaction, &mut errors).await?;
        errors.into_result()?;

        let result = sqlx::query(
            "INSERT INTO title (name, year, description, category_id) VALUES (?, ?, ?, ?)",
        )
        .bind(&payload.name)
        .bind(payload.year)
        .bind(&payload.description)
        .bind(category_id)
        .execute(&mut *transaction)
        .await?;
        let id = result.last_insert_rowid();
        set_genres(id, &genre_ids, &mut transaction).await?;

        let title = get(id, &mut transaction).await?;
        transaction.commit().await?;
        debug!("Created title {id}");
        Ok(title)
    }

    pub async fn update(&self, id: i64, payload: UpdateTitle) -> Result<Title> {
        let mut transaction = self.executor.begin().await?;
        let (name, year, description, category_id): (String, Option<i32>, Option<String>, Option<i64>) =
            sqlx::query_as("SELECT name, year, description, category_id FROM title WHERE id = ?")
                .bind(id)
                .fetch_one(&mut *transaction)
                .await
                .map_err(Error::not_found("Title"))?;

        let mut errors = ValidationError::new();
        let category_id = match payload.category.as_deref() {
            Some(slug) => resolve_category(slug, &mut transaction, &mut errors).await?,
            None => category_id,
        };
        let genre_ids = match payload.genre.as_deref() {
            Some(slugs) => Some(resolve_genres(slugs, &mut transaction, &mut errors).await?),
            None => None,
        };
        errors.into_result()?;

        sqlx::query("UPDATE title SET name = ?, year = ?, description = ?, category_id = ? WHERE id = ?")
            .bind(payload.name.unwrap_or(name))
            .bind(payload.year.or(year))
            .bind(payload.description.or(description))
            .bind(category_id)
            .bind(id)
            .execute(&mut *transaction)
            .await?;
        if let Some(genre_ids) = genre_ids {
            set_genres(id, &genre_ids, &mut transaction).await?;
        }

        let title = get(id, &mut transaction).await?;
        transaction.commit().await?;
        Ok(title)
    }

    pub async fn list(&self, params: ListingParams, filter: &TitleFilter) -> Result<Batch<Title>> {
        let order = params.order_by(VALID_ORDER_FIELDS, "t.id", "t.")?;
        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT count(*) FROM title t LEFT JOIN category c ON t.category_id = c.id {TITLE_FILTER}"
        ))
        .bind(&filter.name)
        .bind(&filter.category)
        .bind(&filter.genre)
        .bind(filter.year)
        .fetch_one(&self.executor)
        .await?;

        let mut rows = sqlx::query_as::<_, Title>(&format!(
            "{TITLE_SELECT} {TITLE_FILTER} {order} LIMIT ?5 OFFSET ?6"
        ))
        .bind(&filter.name)
        .bind(&filter.category)
        .bind(&filter.genre)
        .bind(filter.year)
        .bind(params.limit())
        .bind(params.offset)
        .fetch(&self.executor)
        .try_collect::<Vec<_>>()
        .await?;

        let ids = rows.iter().map(|t| t.id).collect::<Vec<_>>();
        let mut genres = load_genres(&ids, &self.executor).await?;
        for title in rows.iter_mut() {
            title.genre = genres.remove(&title.id).unwrap_or_default();
        }

        Ok(Batch {
            offset: params.offset,
            limit: params.limit(),
            rows,
            total: total as u64,
        })
    }

    pub async fn get(&self, id: i64) -> Result<Title> {
        let mut conn = self.executor.acquire().await?;
        get(id, &mut *conn).await
    }

    pub async fn exists(&self, id: i64) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM title WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.executor)
            .await?;
        Ok(found.is_some())
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM title WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("Title".to_string()))
        } else {
            Ok(())
        }
    }

    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM title")
            .fetch_one(&self.executor)
            .await?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_validation() {
        let current = time::OffsetDateTime::now_utc().year();
        assert!(validate_year(&1000, &()).is_ok());
        assert!(validate_year(&current, &()).is_ok());
        assert!(validate_year(&999, &()).is_err());
        assert!(validate_year(&(current + 1), &()).is_err());
    }

    #[test]
    fn test_title_payload() {
        let payload: CreateTitle = serde_json::from_str(r#"{"name": "Dune", "year": 1965}"#).unwrap();
        assert!(payload.validate().is_ok());
        assert!(payload.genre.is_empty());
        assert!(payload.category.is_none());

        let payload = CreateTitle {
            name: String::new(),
            year: Some(3000),
            description: None,
            category: None,
            genre: vec![],
        };
        let errors: ValidationError = payload.validate().unwrap_err().into();
        assert!(errors.field("name").is_some());
        assert!(errors.field("year").is_some());
    }
}
