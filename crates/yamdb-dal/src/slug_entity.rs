/// Generates record type, create payload and repository for a simple catalog
/// entity identified by unique slug (categories and genres share the same shape)
macro_rules! slug_entity {
    ($entity:ident, $create:ident, $repo_impl:ident, $repo:ident, table = $table:literal, label = $label:literal) => {
        use futures::TryStreamExt as _;

        const VALID_ORDER_FIELDS: &[&str] = &["id", "name", "slug"];

        #[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, sqlx::FromRow)]
        #[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
        pub struct $entity {
            #[serde(skip)]
            pub id: i64,
            pub name: String,
            pub slug: String,
        }

        #[derive(Debug, serde::Serialize, serde::Deserialize, Clone, garde::Validate)]
        #[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
        pub struct $create {
            #[garde(length(min = 1, max = 256))]
            pub name: String,
            #[garde(custom(yamdb_types::general::validate_slug))]
            pub slug: String,
        }

        pub type $repo = $repo_impl<sqlx::Pool<$crate::ChosenDB>>;

        pub struct $repo_impl<E> {
            executor: E,
        }

        impl<'c, E> $repo_impl<E>
        where
            for<'a> &'a E: sqlx::Executor<'c, Database = $crate::ChosenDB>
                + sqlx::Acquire<'c, Database = $crate::ChosenDB>,
        {
            pub fn new(executor: E) -> Self {
                Self { executor }
            }

            pub async fn create(&self, payload: $create) -> $crate::error::Result<$entity> {
                let result = sqlx::query(concat!("INSERT INTO ", $table, " (name, slug) VALUES (?, ?)"))
                    .bind(&payload.name)
                    .bind(&payload.slug)
                    .execute(&self.executor)
                    .await
                    .map_err(|e| {
                        if $crate::error::is_unique_violation(&e) {
                            yamdb_types::ValidationError::single(
                                "slug",
                                concat!($label, " with this slug already exists."),
                            )
                            .into()
                        } else {
                            $crate::Error::from(e)
                        }
                    })?;

                tracing::debug!("Created {} {}", $label, payload.slug);
                Ok($entity {
                    id: result.last_insert_rowid(),
                    name: payload.name,
                    slug: payload.slug,
                })
            }

            pub async fn list(
                &self,
                params: $crate::ListingParams,
                search: Option<&str>,
            ) -> $crate::error::Result<$crate::Batch<$entity>> {
                let order = params.order_by(VALID_ORDER_FIELDS, "slug DESC", "")?;
                let total: i64 = sqlx::query_scalar(concat!(
                    "SELECT count(*) FROM ",
                    $table,
                    " WHERE (?1 IS NULL OR instr(lower(name), lower(?1)) > 0)"
                ))
                .bind(search)
                .fetch_one(&self.executor)
                .await?;
                let rows = sqlx::query_as::<_, $entity>(&format!(
                    concat!(
                        "SELECT id, name, slug FROM ",
                        $table,
                        " WHERE (?1 IS NULL OR instr(lower(name), lower(?1)) > 0) {} LIMIT ?2 OFFSET ?3"
                    ),
                    order
                ))
                .bind(search)
                .bind(params.limit())
                .bind(params.offset)
                .fetch(&self.executor)
                .try_collect::<Vec<_>>()
                .await?;
                Ok($crate::Batch {
                    offset: params.offset,
                    limit: params.limit(),
                    rows,
                    total: total as u64,
                })
            }

            pub async fn get_by_slug(&self, slug: &str) -> $crate::error::Result<$entity> {
                sqlx::query_as::<_, $entity>(concat!(
                    "SELECT id, name, slug FROM ",
                    $table,
                    " WHERE slug = ?"
                ))
                .bind(slug)
                .fetch_one(&self.executor)
                .await
                .map_err($crate::Error::not_found($label))
            }

            pub async fn delete_by_slug(&self, slug: &str) -> $crate::error::Result<()> {
                let res = sqlx::query(concat!("DELETE FROM ", $table, " WHERE slug = ?"))
                    .bind(slug)
                    .execute(&self.executor)
                    .await?;

                if res.rows_affected() == 0 {
                    Err($crate::Error::RecordNotFound($label.to_string()))
                } else {
                    Ok(())
                }
            }

            pub async fn count(&self) -> $crate::error::Result<u64> {
                let count: i64 = sqlx::query_scalar(concat!("SELECT count(*) FROM ", $table))
                    .fetch_one(&self.executor)
                    .await?;
                Ok(count as u64)
            }
        }
    };
}

pub(crate) use slug_entity;
