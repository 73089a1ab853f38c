pub mod config;
pub mod error;
pub mod run;

use std::path::Path;

use config::{MailBackend, ServerConfig};
pub use error::{Error, Result};
use tokio::{fs, io::AsyncWriteExt as _};
use tracing::info;
use yamdb_app::{
    mail::Mailer,
    state::{AppConfig, AppState},
};

const SECRET_SIZE: usize = 32;

pub fn build_mailer(config: &ServerConfig) -> Result<Mailer> {
    let mailer = match config.mail_backend {
        MailBackend::Log => Mailer::Log,
        MailBackend::Memory => Mailer::memory(),
        MailBackend::Smtp => {
            let url = config.smtp_url.as_deref().ok_or_else(|| {
                Error::Config("SMTP URL is required for smtp mail backend".to_string())
            })?;
            Mailer::smtp(url)?
        }
    };
    Ok(mailer)
}

/// Prepares database (with migrations applied), token signing secret and mailer
pub async fn build_state(config: &ServerConfig) -> Result<AppState> {
    let data_dir = config.data_dir();
    if !data_dir.is_dir() {
        fs::create_dir_all(&data_dir).await?;
        info!("Created data directory {data_dir:?}");
    }

    let pool = yamdb_dal::new_pool(&config.database_url()).await?;
    yamdb_dal::migrate(&pool).await?;

    let secret = read_secret(&data_dir).await?;
    if secret.len() < SECRET_SIZE {
        return Err(Error::Config("Secret file is too short".to_string()));
    }
    let tokens = yamdb_auth::token::TokenManager::new(&secret, config.token_validity);
    let app_config = AppConfig {
        default_page_size: config.default_page_size,
        mail_from: config.mail_from.clone(),
    };
    let mailer = build_mailer(config)?;
    Ok(AppState::new(app_config, pool, tokens, mailer))
}

async fn read_secret(data_dir: &Path) -> Result<Vec<u8>, std::io::Error> {
    let secret_file = data_dir.join("secret");

    let secret = if fs::try_exists(&secret_file).await? {
        fs::read(&secret_file).await?
    } else {
        let random_bytes = rand::random::<[u8; SECRET_SIZE]>();
        #[cfg(unix)]
        let mut file = {
            use std::fs::OpenOptions;
            use std::os::unix::fs::OpenOptionsExt;
            {
                // Only current user can read the secret
                let _f = OpenOptions::new()
                    .mode(0o600)
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(&secret_file)?;
            }
            fs::File::options().write(true).open(&secret_file).await?
        };
        #[cfg(not(unix))]
        let mut file = fs::File::create(&secret_file).await?;

        file.write_all(&random_bytes).await?;
        random_bytes.as_ref().to_vec()
    };
    Ok(secret)
}
