use crate::demo::{run_calc, run_dda, run_demo, CalcArgs, DdaArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use delhi_duty::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Delhi Duty Calculator",
    about = "Compute Delhi circle-rate valuations and stamp duty, or serve the calculator API",
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
    /// Compute a plotted residential/commercial valuation
    Calc(CalcArgs),
    /// Compute a DDA/CGHS built-up flat valuation
    Dda(DdaArgs),
    /// Run an end-to-end CLI demo covering valuation, history and accounts
    Demo(DemoArgs),
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
        Command::Calc(args) => run_calc(args),
        Command::Dda(args) => run_dda(args),
        Command::Demo(args) => run_demo(args),
    }
}
