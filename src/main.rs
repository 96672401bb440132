use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fundsync::cli::project::ProjectArgs;
use fundsync::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Refresh market data for every watchlist symbol
    Refresh {
        /// Ignore the batch cooldown
        #[arg(short, long)]
        force: bool,
    },
    /// Show price and trailing returns for a fund
    Fund {
        /// Ticker, e.g. VWRL.L
        symbol: String,
    },
    /// Show exchange rates
    Rates,
    /// Show cache status without fetching
    Status,
    /// Rank funds by risk-adjusted performance and flag declining trends
    Monitor {
        /// Symbols to compare; defaults to the watchlist
        symbols: Vec<String>,
    },
    /// Project the future value of regular contributions
    Project {
        /// Derive the annual return from this fund's history
        #[arg(short, long)]
        symbol: Option<String>,
        /// Initial lump sum
        #[arg(long)]
        initial: Option<f64>,
        /// Monthly contribution
        #[arg(long)]
        monthly: Option<f64>,
        /// Number of years
        #[arg(long)]
        years: Option<u32>,
        /// Annual return as a fraction, e.g. 0.07
        #[arg(long = "return")]
        annual_return: Option<f64>,
        /// Fund expense ratio as a fraction
        #[arg(long)]
        expense_ratio: Option<f64>,
        /// Dividend yield as a fraction
        #[arg(long)]
        dividend_yield: Option<f64>,
    },
}

impl From<Commands> for fundsync::AppCommand {
    fn from(cmd: Commands) -> fundsync::AppCommand {
        match cmd {
            Commands::Refresh { force } => fundsync::AppCommand::Refresh { force },
            Commands::Fund { symbol } => fundsync::AppCommand::Fund { symbol },
            Commands::Rates => fundsync::AppCommand::Rates,
            Commands::Status => fundsync::AppCommand::Status,
            Commands::Monitor { symbols } => fundsync::AppCommand::Monitor { symbols },
            Commands::Project {
                symbol,
                initial,
                monthly,
                years,
                annual_return,
                expense_ratio,
                dividend_yield,
            } => fundsync::AppCommand::Project(ProjectArgs {
                symbol,
                initial_investment: initial,
                monthly_contribution: monthly,
                years,
                annual_return_rate: annual_return,
                expense_ratio,
                dividend_yield,
            }),
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fundsync::cli::setup::setup(),
        Some(cmd) => fundsync::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
