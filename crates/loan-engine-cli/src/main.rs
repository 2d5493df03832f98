mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use commands::eligibility::EligibilityArgs;
use commands::loan::{AnalyzeArgs, EmiArgs, ScheduleArgs};
use commands::scenarios::{MoratoriumArgs, PrepayArgs, RateShockArgs};

/// Loan amortization and scenario calculations
#[derive(Parser)]
#[command(
    name = "loancalc",
    version,
    about = "Loan amortization and scenario calculations",
    long_about = "A CLI for loan repayment planning with decimal precision. Computes \
                  level instalments, amortization schedules, prepayment and rate-shock \
                  scenarios, moratorium capitalization and income-based eligibility."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Emit debug logs on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve the level monthly instalment (EMI)
    Emi(EmiArgs),
    /// Build the month-by-month amortization schedule
    Schedule(ScheduleArgs),
    /// Simulate annual prepayments
    Prepay(PrepayArgs),
    /// Re-price the loan after an interest-rate change
    RateShock(RateShockArgs),
    /// Capitalize interest accrued during a repayment moratorium
    Moratorium(MoratoriumArgs),
    /// Evaluate affordability against monthly income
    Eligibility(EligibilityArgs),
    /// Run the full pipeline from a JSON input
    Analyze(AnalyzeArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Emi(args) => commands::loan::run_emi(args),
        Commands::Schedule(args) => commands::loan::run_schedule(args),
        Commands::Prepay(args) => commands::scenarios::run_prepay(args),
        Commands::RateShock(args) => commands::scenarios::run_rate_shock(args),
        Commands::Moratorium(args) => commands::scenarios::run_moratorium(args),
        Commands::Eligibility(args) => commands::eligibility::run_eligibility(args),
        Commands::Analyze(args) => commands::loan::run_analyze(args),
        Commands::Version => {
            println!("loancalc {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
