use anyhow::anyhow;
use clap::Parser;
use garde::Validate as _;
use yamdb_types::{claim::Role, config::BackendConfig, general::ValidEmail};

use crate::commands::{open_db, Executor};

#[derive(Parser, Debug)]
pub struct CreateUserCmd {
    #[command(flatten)]
    backend: BackendConfig,
    #[arg(short, long, help = "User name")]
    username: String,
    #[arg(short, long, help = "User email, confirmation codes are sent there")]
    pub email: ValidEmail,
    #[arg(short, long, default_value = "user", help = "Role of the user: user, moderator or admin")]
    pub role: Role,
    #[arg(long, help = "Superuser has always admin rights, whatever role is set")]
    pub superuser: bool,
}

impl Executor for CreateUserCmd {
    async fn run(self) -> anyhow::Result<()> {
        let pool = open_db(&self.backend).await?;
        let repository = yamdb_dal::user::UserRepository::new(pool);
        let new_user = yamdb_dal::user::CreateUser {
            username: self.username,
            email: self.email,
            first_name: None,
            last_name: None,
            bio: None,
            role: Some(self.role),
            is_superuser: self.superuser,
        };
        new_user
            .validate()
            .map_err(|e| anyhow!("Invalid user: {e}"))?;
        let user = repository.create(new_user).await?;
        println!(
            "Created user {} (id {}) with role {}",
            user.username,
            user.id,
            user.effective_role()
        );

        Ok(())
    }
}
