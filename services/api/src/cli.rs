use crate::demo::{run_demo, run_ledger_preview, DemoArgs, LedgerPreviewArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use rentdesk::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Rental Desk",
    about = "Demonstrate and run the rental schedule desk from the command line",
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
    /// Inspect projected payment ledgers without touching a store
    Ledger {
        #[command(subcommand)]
        command: LedgerCommand,
    },
    /// Run an end-to-end CLI demo covering links, schedules, and statements
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum LedgerCommand {
    /// Project the monthly ledger a lease window would generate
    Preview(LedgerPreviewArgs),
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
        Command::Ledger {
            command: LedgerCommand::Preview(args),
        } => run_ledger_preview(args),
        Command::Demo(args) => run_demo(args).await,
    }
}
