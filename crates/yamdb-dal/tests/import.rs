use yamdb_dal::{
    ListingParams,
    category::CategoryRepository,
    import::{
        CommentRecord, GenreTitleRecord, Importer, ReviewRecord, SlugRecord, TitleRecord,
        UserRecord,
    },
    title::{TitleFilter, TitleRepository},
    user::UserRepository,
};

async fn empty_db() -> yamdb_dal::Pool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .connect_with(
            "sqlite::memory:"
                .parse::<sqlx::sqlite::SqliteConnectOptions>()
                .unwrap()
                .foreign_keys(true),
        )
        .await
        .unwrap();
    yamdb_dal::migrate(&pool).await.unwrap();
    pool
}

fn slug(id: i64, name: &str) -> SlugRecord {
    SlugRecord {
        id,
        name: name.to_string(),
        slug: name.to_lowercase(),
    }
}

fn user(id: i64, username: &str, role: &str) -> UserRecord {
    UserRecord {
        id,
        username: username.to_string(),
        email: format!("{username}@example.com"),
        role: Some(role.to_string()),
        bio: Some(String::new()),
        first_name: None,
        last_name: None,
    }
}

#[tokio::test]
async fn test_import_catalog() {
    let pool = empty_db().await;
    let mut importer = Importer::begin(&pool).await.unwrap();
    importer.categories([slug(5, "Music")]).await.unwrap();
    importer
        .genres([slug(7, "Rock"), slug(8, "Jazz")])
        .await
        .unwrap();
    importer
        .titles([TitleRecord {
            id: 42,
            name: "Kind of Blue".to_string(),
            year: Some(1959),
            category: Some(5),
            description: None,
        }])
        .await
        .unwrap();
    importer
        .genre_titles([
            GenreTitleRecord {
                title_id: 42,
                genre_id: 8,
            },
            GenreTitleRecord {
                title_id: 42,
                genre_id: 7,
            },
        ])
        .await
        .unwrap();
    importer
        .users([user(10, "miles", "user"), user(11, "john", "moderator")])
        .await
        .unwrap();
    importer
        .reviews([
            ReviewRecord {
                id: 100,
                title_id: 42,
                text: "Classic".to_string(),
                author: 10,
                score: 10,
                pub_date: "2019-09-24T21:08:21.567Z".to_string(),
            },
            ReviewRecord {
                id: 101,
                title_id: 42,
                text: "Good".to_string(),
                author: 11,
                score: 7,
                pub_date: "2019-09-25T10:00:00Z".to_string(),
            },
        ])
        .await
        .unwrap();
    importer
        .comments([CommentRecord {
            id: 1000,
            review_id: 100,
            text: "Agree".to_string(),
            author: 11,
            pub_date: "2019-09-26T10:00:00Z".to_string(),
        }])
        .await
        .unwrap();
    importer.commit().await.unwrap();

    let title = TitleRepository::new(pool.clone()).get(42).await.unwrap();
    assert_eq!(title.category.unwrap().slug, "music");
    let genres: Vec<_> = title.genre.iter().map(|g| g.slug.as_str()).collect();
    assert_eq!(genres, vec!["jazz", "rock"]);
    assert_eq!(title.rating, Some(8.5));

    let john = UserRepository::new(pool.clone())
        .get_by_username("john")
        .await
        .unwrap();
    assert_eq!(john.id, 11);
    assert_eq!(john.role, yamdb_types::claim::Role::Moderator);
    assert_eq!(john.bio, None);
}

#[tokio::test]
async fn test_import_is_atomic() {
    let pool = empty_db().await;
    let mut importer = Importer::begin(&pool).await.unwrap();
    importer.categories([slug(1, "Books")]).await.unwrap();
    let res = importer.users([user(1, "bob", "superhero")]).await;
    assert!(matches!(
        res,
        Err(yamdb_dal::Error::InvalidImportRecord(_))
    ));
    drop(importer);

    let categories = CategoryRepository::new(pool.clone())
        .list(ListingParams::new(0, 10), None)
        .await
        .unwrap();
    assert_eq!(categories.total, 0);

    let mut importer = Importer::begin(&pool).await.unwrap();
    let res = importer
        .titles([TitleRecord {
            id: 1,
            name: "Orphan".to_string(),
            year: None,
            category: Some(99),
            description: None,
        }])
        .await;
    assert!(res.is_err());
    drop(importer);
    let titles = TitleRepository::new(pool)
        .list(ListingParams::new(0, 10), &TitleFilter::default())
        .await
        .unwrap();
    assert_eq!(titles.total, 0);
}
