use yamdb_types::config::BackendConfig;

pub mod create_user;
pub mod import;

#[allow(async_fn_in_trait)]
pub trait Executor {
    async fn run(self) -> anyhow::Result<()>;
}

/// Opens database and brings its schema up to date
pub(crate) async fn open_db(backend: &BackendConfig) -> anyhow::Result<yamdb_dal::Pool> {
    let data_dir = backend.data_dir();
    if !data_dir.is_dir() {
        tokio::fs::create_dir_all(&data_dir).await?;
    }
    let pool = yamdb_dal::new_pool(&backend.database_url()).await?;
    yamdb_dal::migrate(&pool).await?;
    Ok(pool)
}
