use crate::demo::{run_matrix_report, run_organization_demo, DemoArgs, MatrixArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use riskwatch::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Riskwatch",
    about = "Score organizational security risk and serve the scoring engine over HTTP",
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
    /// Build an impact/likelihood matrix from a CSV or JSON export of risk records
    Matrix(MatrixArgs),
    /// Score the seeded demo organization and its entities against the configured oracle
    ScoreOrg(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the configured scoring oracle base URL
    #[arg(long)]
    pub(crate) oracle_url: Option<String>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Matrix(args) => run_matrix_report(args),
        Command::ScoreOrg(args) => run_organization_demo(args).await,
    }
}
