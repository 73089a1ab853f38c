use crate::error::{ApiError, ApiResult};
use garde::Validate;
use serde::Serialize;
use yamdb_dal::{Batch, ListingParams};

#[derive(Debug, Clone, Default, Validate, serde::Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi",into_params(parameter_in = Query))]
pub struct Paging {
    /// page number, starting from 1
    #[garde(range(min = 1))]
    page: Option<u32>,
    #[garde(range(min = 1, max = 1000))]
    page_size: Option<u32>,
    /// comma separated field names, prefix `-` for descending order
    #[garde(length(max = 255))]
    sort: Option<String>,
    #[garde(length(max = 255))]
    search: Option<String>,
}

impl Paging {
    pub fn into_listing_params(self, default_page_size: u32) -> ApiResult<ListingParams> {
        let page = self.page.unwrap_or(1).max(1);
        let page_size = self.page_size.unwrap_or(default_page_size);
        let offset = i64::from(page - 1) * i64::from(page_size);
        let order = self
            .sort
            .map(|orderings| {
                orderings
                    .split(',')
                    .map(|name| {
                        let (field_name, descending) = match name.trim() {
                            "" => {
                                return Err(ApiError::InvalidQuery(
                                    "Empty ordering name".to_string(),
                                ))
                            }
                            name if name.len() > 100 => {
                                return Err(ApiError::InvalidQuery(
                                    "Ordering name too long".to_string(),
                                ))
                            }
                            name if name.starts_with('+') => (&name[1..], false),
                            name if name.starts_with('-') => (&name[1..], true),
                            name => (name, false),
                        };

                        let order = if descending {
                            yamdb_dal::Order::Desc(field_name.to_string())
                        } else {
                            yamdb_dal::Order::Asc(field_name.to_string())
                        };

                        Ok(order)
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        Ok(ListingParams {
            offset,
            limit: page_size.into(),
            order,
        })
    }

    pub fn page_size(&self, default_page_size: u32) -> u32 {
        self.page_size.unwrap_or(default_page_size)
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Serialize, serde::Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Page<T> {
    pub page: u64,
    pub page_size: u32,
    pub total_pages: u64,
    pub total: u64,
    pub rows: Vec<T>,
}

impl<T> Page<T>
where
    T: Serialize,
{
    pub fn from_batch(batch: Batch<T>, page_size: u32) -> Self {
        let size = u64::from(page_size.max(1));
        Self {
            page: batch.offset.max(0) as u64 / size + 1,
            page_size,
            total_pages: batch.total.div_ceil(size),
            total: batch.total,
            rows: batch.rows,
        }
    }
}
