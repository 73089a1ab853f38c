use crate::slug_api;
#[cfg(feature = "openapi")]
use yamdb_dal::category::Category;
use yamdb_dal::category::{CategoryRepository, CreateCategory};

slug_api!(Category);
