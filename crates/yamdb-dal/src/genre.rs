use crate::slug_entity::slug_entity;

slug_entity!(
    Genre,
    CreateGenre,
    GenreRepositoryImpl,
    GenreRepository,
    table = "genre",
    label = "Genre"
);
