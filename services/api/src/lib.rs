mod cli;
mod infra;
mod routes;
mod server;

use talent_onboarding::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
