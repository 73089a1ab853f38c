#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid arguments: {0}")]
    Args(#[from] clap::Error),
    #[error("Invalid listen address: {0}")]
    Address(#[from] std::net::AddrParseError),
    #[error("Database error: {0}")]
    Database(#[from] yamdb_dal::Error),
    #[error("Mail error: {0}")]
    Mail(#[from] yamdb_app::mail::MailError),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
