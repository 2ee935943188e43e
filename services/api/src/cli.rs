use crate::server;
use clap::{Args, Parser, Subcommand};
use talent_onboarding::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Talent Onboarding",
    about = "Serve the model and hostess onboarding API or manage its administrators",
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
    /// Seed an administrator account for the moderation endpoints
    CreateAdmin(CreateAdminArgs),
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

#[derive(Args, Debug)]
pub(crate) struct CreateAdminArgs {
    /// Login name used on /admin/login
    #[arg(long)]
    pub(crate) username: String,
    #[arg(long)]
    pub(crate) email: String,
    #[arg(long)]
    pub(crate) full_name: String,
    /// Plain-text password; hashed before it is stored
    #[arg(long, env = "ADMIN_PASSWORD")]
    pub(crate) password: String,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::CreateAdmin(args) => server::create_admin(args).await,
    }
}
