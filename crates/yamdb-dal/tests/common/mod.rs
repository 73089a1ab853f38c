use futures::TryStreamExt as _;
use sqlx::Executor;

pub const TEST_DATA: &str = r#"
INSERT INTO users (id, username, email, role) VALUES (1, 'admin', 'admin@example.com', 'admin');
INSERT INTO users (id, username, email, role) VALUES (2, 'bob', 'bob@example.com', 'user');
INSERT INTO users (id, username, email, role) VALUES (3, 'alice', 'alice@example.com', 'moderator');

INSERT INTO category (id, name, slug) VALUES (1, 'Books', 'books');
INSERT INTO category (id, name, slug) VALUES (2, 'Films', 'films');

INSERT INTO genre (id, name, slug) VALUES (1, 'Drama', 'drama');
INSERT INTO genre (id, name, slug) VALUES (2, 'Comedy', 'comedy');
INSERT INTO genre (id, name, slug) VALUES (3, 'Fantasy', 'fantasy');

INSERT INTO title (id, name, year, description, category_id) VALUES (1, 'The Hobbit', 1937, NULL, 1);
INSERT INTO title_genre (title_id, genre_id, position) VALUES (1, 3, 0);
INSERT INTO title_genre (title_id, genre_id, position) VALUES (1, 1, 1);
INSERT INTO title (id, name, year, description, category_id) VALUES (2, 'Amelie', 2001, 'Paris', 2);
INSERT INTO title_genre (title_id, genre_id, position) VALUES (2, 2, 0);
"#;

pub async fn init_db() -> sqlx::Pool<sqlx::Sqlite> {
    const DB_URL: &str = "sqlite::memory:";
    let conn = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .connect(DB_URL)
        .await
        .unwrap();
    conn.execute("PRAGMA foreign_keys = ON").await.unwrap();
    sqlx::migrate!("../../migrations").run(&conn).await.unwrap();

    conn.execute_many(TEST_DATA)
        .try_collect::<Vec<_>>()
        .await
        .unwrap();

    conn
}
