use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
pub struct BackendConfig {
    #[arg(
        long,
        env = "YAMDB_DATABASE_URL",
        help = "Database URL e.g. sqlite://file.db, default is sqlite://[data-dir]/yamdb.db, where data-dir is set by --data-dir"
    )]
    database_url: Option<String>,

    #[arg(
        long,
        env = "YAMDB_DATA_DIR",
        help = "Data directory (database, secret), default is system default like ~/.local/share/yamdb",
        default_value_t = default_data_dir()
    )]
    data_dir: String,
}

/// Platform data directory for yamdb; it is created on first use by server or CLI
pub fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("yamdb"))
        .unwrap_or_else(|| PathBuf::from("yamdb"))
        .to_string_lossy()
        .into_owned()
}

impl BackendConfig {
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| format!("sqlite://{}/yamdb.db", self.data_dir))
    }
}
