use yamdb_dal::{
    ListingParams, Order,
    comment::{CommentRepositoryImpl, CreateComment, UpdateComment},
    review::{CreateReview, ReviewRepositoryImpl, UpdateReview},
    title::TitleRepositoryImpl,
};

mod common;

fn review(text: &str, score: i64) -> CreateReview {
    CreateReview {
        text: text.into(),
        score,
    }
}

#[tokio::test]
async fn test_one_review_per_title() {
    let conn = common::init_db().await;
    let repo = ReviewRepositoryImpl::new(conn);

    let first = repo.create(1, 2, review("Great", 9)).await.unwrap();
    assert_eq!(first.author, "bob");
    assert_eq!(first.score, 9);

    let res = repo.create(1, 2, review("Again", 3)).await;
    match res {
        Err(yamdb_dal::Error::Validation(e)) => {
            assert!(e.field(yamdb_types::error::NON_FIELD_ERRORS).is_some())
        }
        other => panic!("Expected validation error, got {other:?}"),
    }

    // other title is fine
    repo.create(2, 2, review("Nice", 7)).await.unwrap();
    assert_eq!(repo.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_review_of_missing_title() {
    let conn = common::init_db().await;
    let repo = ReviewRepositoryImpl::new(conn);
    let res = repo.create(100, 2, review("Ghost", 5)).await;
    assert!(res.unwrap_err().is_not_found());
    let res = repo.list(100, ListingParams::default()).await;
    assert!(res.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_rating() {
    let conn = common::init_db().await;
    let reviews = ReviewRepositoryImpl::new(conn.clone());
    let titles = TitleRepositoryImpl::new(conn);

    reviews.create(1, 1, review("Ok", 5)).await.unwrap();
    reviews.create(1, 2, review("Good", 8)).await.unwrap();
    let created = reviews.create(1, 3, review("Best", 10)).await.unwrap();

    let title = titles.get(1).await.unwrap();
    let rating = title.rating.unwrap();
    assert!((rating - 23.0 / 3.0).abs() < 1e-9);

    reviews
        .update(
            1,
            created.id,
            UpdateReview {
                score: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let title = titles.get(1).await.unwrap();
    assert!((title.rating.unwrap() - 14.0 / 3.0).abs() < 1e-9);

    assert!(titles.get(2).await.unwrap().rating.is_none());
}

#[tokio::test]
async fn test_review_scoped_to_title() {
    let conn = common::init_db().await;
    let repo = ReviewRepositoryImpl::new(conn);

    let created = repo.create(1, 2, review("Great", 9)).await.unwrap();
    assert_eq!(repo.get(1, created.id).await.unwrap(), created);
    assert!(repo.get(2, created.id).await.unwrap_err().is_not_found());
    assert!(repo.delete(2, created.id).await.unwrap_err().is_not_found());

    let updated = repo
        .update(
            1,
            created.id,
            UpdateReview {
                text: Some("Even better".into()),
                score: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.text, "Even better");
    assert_eq!(updated.score, 9);
    assert_eq!(updated.pub_date, created.pub_date);

    repo.delete(1, created.id).await.unwrap();
    assert!(repo.get(1, created.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_review_listing() {
    let conn = common::init_db().await;
    let repo = ReviewRepositoryImpl::new(conn);
    repo.create(1, 1, review("Ok", 5)).await.unwrap();
    repo.create(1, 2, review("Good", 8)).await.unwrap();
    repo.create(2, 3, review("Other", 2)).await.unwrap();

    let batch = repo.list(1, ListingParams::default()).await.unwrap();
    assert_eq!(batch.total, 2);
    assert_eq!(batch.rows[0].author, "admin");

    let batch = repo
        .list(
            1,
            ListingParams::default().with_order(vec![Order::Desc("score".into())]),
        )
        .await
        .unwrap();
    assert_eq!(batch.rows[0].score, 8);

    let res = repo
        .list(
            1,
            ListingParams::default().with_order(vec![Order::Asc("text".into())]),
        )
        .await;
    assert!(matches!(res, Err(yamdb_dal::Error::InvalidOrderByField(_))));
}

#[tokio::test]
async fn test_comments() {
    let conn = common::init_db().await;
    let reviews = ReviewRepositoryImpl::new(conn.clone());
    let comments = CommentRepositoryImpl::new(conn);

    let r = reviews.create(1, 2, review("Great", 9)).await.unwrap();
    let c = comments
        .create(
            1,
            r.id,
            3,
            CreateComment {
                text: "Agree".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(c.author, "alice");

    // review does not belong to title 2
    let res = comments
        .create(2, r.id, 3, CreateComment { text: "x".into() })
        .await;
    assert!(res.unwrap_err().is_not_found());
    assert!(comments.list(2, r.id, ListingParams::default()).await.unwrap_err().is_not_found());

    let updated = comments
        .update(
            1,
            r.id,
            c.id,
            UpdateComment {
                text: Some("Totally agree".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.text, "Totally agree");

    let batch = comments.list(1, r.id, ListingParams::default()).await.unwrap();
    assert_eq!(batch.total, 1);

    // deleting review removes its comments
    reviews.delete(1, r.id).await.unwrap();
    assert!(comments.get(1, r.id, c.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_duplicate_review_in_one_transaction() {
    let conn = common::init_db().await;
    let mut transaction = conn.begin().await.unwrap();
    let insert = "INSERT INTO review (title_id, author_id, text, score, pub_date) \
                  VALUES (1, 3, 'Text', 5, '2024-01-01T00:00:00Z')";
    sqlx::query(insert).execute(&mut *transaction).await.unwrap();
    let err = sqlx::query(insert)
        .execute(&mut *transaction)
        .await
        .unwrap_err();
    assert!(matches!(&err, sqlx::Error::Database(e) if e.is_unique_violation()));
    transaction.rollback().await.unwrap();

    let repo = ReviewRepositoryImpl::new(conn);
    assert_eq!(repo.count().await.unwrap(), 0);
}
