pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "recipe")]
#[command(about = "Recipe CLI - administrative commands for the Recipe API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Block until the database accepts connections")]
    WaitForDb {
        #[arg(long, help = "Maximum number of connection attempts (defaults to config)")]
        attempts: Option<u32>,
        #[arg(long, help = "Delay between attempts in milliseconds (defaults to config)")]
        delay_ms: Option<u64>,
    },

    #[command(about = "Create an account with staff and superuser rights")]
    CreateSuperuser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    #[command(about = "Create a regular account")]
    CreateUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = crate::config::config();

    match cli.command {
        Commands::Migrate => commands::db::migrate(config, output_format).await,
        Commands::WaitForDb { attempts, delay_ms } => {
            commands::db::wait(config, attempts, delay_ms, output_format).await
        }
        Commands::CreateSuperuser { email, password } => {
            commands::user::create_superuser(config, &email, &password, output_format).await
        }
        Commands::CreateUser { email, password, name } => {
            commands::user::create_user(config, &email, &password, name.as_deref(), output_format).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wait_for_db_flags() {
        let cli = Cli::try_parse_from(["recipe", "wait-for-db", "--attempts", "5", "--delay-ms", "250"]).unwrap();
        match cli.command {
            Commands::WaitForDb { attempts, delay_ms } => {
                assert_eq!(attempts, Some(5));
                assert_eq!(delay_ms, Some(250));
            }
            _ => panic!("expected wait-for-db"),
        }
    }

    #[test]
    fn create_user_requires_email_and_password() {
        assert!(Cli::try_parse_from(["recipe", "create-user", "--email", "a@b.c"]).is_err());
        let cli = Cli::try_parse_from([
            "recipe", "--json", "create-user", "--email", "a@b.c", "--password", "secret", "--name", "A",
        ])
        .unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
    }
}
