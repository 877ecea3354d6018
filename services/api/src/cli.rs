use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use matricula::config::AppConfig;
use matricula::error::AppError;

use crate::server;
use crate::store::Database;

#[derive(Parser, Debug)]
#[command(
    name = "Matricula Service",
    about = "Run and provision the school enrollment administration service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Create the database file and schema, then exit
    InitDb(InitDbArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct InitDbArgs {
    /// Override the configured database path
    #[arg(long)]
    path: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::InitDb(args) => init_db(args),
    }
}

fn init_db(args: InitDbArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let path = args.path.unwrap_or(config.database_path);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Database::open(&path)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))?;

    println!("database initialized at {}", path.display());
    Ok(())
}
