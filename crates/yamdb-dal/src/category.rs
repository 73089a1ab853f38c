use crate::slug_entity::slug_entity;

slug_entity!(
    Category,
    CreateCategory,
    CategoryRepositoryImpl,
    CategoryRepository,
    table = "category",
    label = "Category"
);
