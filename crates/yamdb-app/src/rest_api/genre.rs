use crate::slug_api;
#[cfg(feature = "openapi")]
use yamdb_dal::genre::Genre;
use yamdb_dal::genre::{CreateGenre, GenreRepository};

slug_api!(Genre);
