use crate::report::{run_report, run_score, run_template, ReportArgs, ScoreArgs, TemplateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use hmpi_monitor::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "HMPI Monitor",
    about = "Serve and query heavy metal pollution index data for water-quality projects",
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
    /// Score a single set of readings
    Score(ScoreArgs),
    /// Write the bulk sample import template
    Template(TemplateArgs),
    /// Score an import file offline and print chart summaries
    Report(ReportArgs),
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

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args),
        Command::Template(args) => run_template(args),
        Command::Report(args) => run_report(args),
    }
}
