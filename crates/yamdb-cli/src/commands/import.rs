use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use serde::de::DeserializeOwned;
use tracing::info;
use yamdb_dal::import::Importer;
use yamdb_types::config::BackendConfig;

use crate::commands::{open_db, Executor};

#[derive(Parser, Debug)]
pub struct ImportCmd {
    #[command(flatten)]
    backend: BackendConfig,
    #[arg(
        short,
        long,
        help = "Directory with CSV files (category.csv, genre.csv, titles.csv, genre_title.csv, users.csv, review.csv, comments.csv), missing files are skipped"
    )]
    dir: PathBuf,
}

fn read_records<T: DeserializeOwned>(dir: &Path, file_name: &str) -> anyhow::Result<Vec<T>> {
    let path = dir.join(file_name);
    if !path.is_file() {
        info!("{file_name} not found, skipping");
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(&path)
        .with_context(|| format!("Cannot open {path:?}"))?;
    let records = reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .with_context(|| format!("Invalid record in {file_name}"))?;
    Ok(records)
}

impl Executor for ImportCmd {
    async fn run(self) -> anyhow::Result<()> {
        let dir = self.dir.as_path();
        let categories = read_records(dir, "category.csv")?;
        let genres = read_records(dir, "genre.csv")?;
        let titles = read_records(dir, "titles.csv")?;
        let genre_titles = read_records(dir, "genre_title.csv")?;
        let users = read_records(dir, "users.csv")?;
        let reviews = read_records(dir, "review.csv")?;
        let comments = read_records(dir, "comments.csv")?;

        let pool = open_db(&self.backend).await?;
        let mut importer = Importer::begin(&pool).await?;
        // referenced records go first
        let counts = [
            ("categories", importer.categories(categories).await?),
            ("genres", importer.genres(genres).await?),
            ("titles", importer.titles(titles).await?),
            ("genre assignments", importer.genre_titles(genre_titles).await?),
            ("users", importer.users(users).await?),
            ("reviews", importer.reviews(reviews).await?),
            ("comments", importer.comments(comments).await?),
        ];
        importer.commit().await?;

        for (name, count) in counts {
            println!("Imported {count} {name}");
        }
        Ok(())
    }
}
