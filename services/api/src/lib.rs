mod cli;
mod infra;
mod routes;
mod server;
pub mod store;

pub use infra::DiskFileStore;
pub use server::build_api_router;

use matricula::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
