mod cli;
mod infra;
mod routes;
mod server;

use prereg_demographic::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
