use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use closecast::application::analysis::AnalysisEngine;
use closecast::config::{Config, parse_file_assignment, parse_symbol_list};
use closecast::infrastructure::spreadsheet::{SpreadsheetLoader, load_all, resolve_inputs};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "Stationarity, ARIMA and cointegration analysis of 3-minute closing prices", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis pipeline
    Run {
        #[command(flatten)]
        input: InputArgs,

        /// Forecast horizon in steps
        #[arg(long)]
        horizon: Option<usize>,

        /// Directory for charts and the JSON report
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Skip PNG chart generation
        #[arg(long)]
        no_plots: bool,

        /// Write analysis_report.json to the output directory
        #[arg(long)]
        json_report: bool,
    },
    /// Show which file each symbol resolves to and its invalid-value counts
    Inputs {
        #[command(flatten)]
        input: InputArgs,
    },
}

#[derive(Args)]
struct InputArgs {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory searched for "<SYMBOL> 3min" spreadsheets
    #[arg(short, long)]
    input_dir: Option<PathBuf>,

    /// Explicit input file as SYMBOL=PATH (repeatable)
    #[arg(short, long = "file", value_name = "SYMBOL=PATH")]
    files: Vec<String>,

    /// Symbols to analyse (comma separated)
    #[arg(short, long)]
    symbols: Option<String>,

    /// Header of the closing price column
    #[arg(long)]
    close_column: Option<String>,
}

impl InputArgs {
    /// Loads file/env configuration and applies these flags on top.
    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(Some(path))?,
            None => Config::from_env()?,
        };
        if let Some(dir) = &self.input_dir {
            config.input.input_dir = dir.clone();
        }
        if let Some(symbols) = &self.symbols {
            config.input.symbols = parse_symbol_list(symbols);
        }
        if let Some(column) = &self.close_column {
            config.input.close_column = column.clone();
        }
        for raw in &self.files {
            let (symbol, path) = parse_file_assignment(raw).context("Invalid --file argument")?;
            config.input.files.insert(symbol, path);
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries the analysis report
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            horizon,
            output_dir,
            no_plots,
            json_report,
        } => {
            let mut config = input.load_config()?;
            if let Some(horizon) = horizon {
                config.analysis.horizon = horizon;
            }
            if let Some(dir) = output_dir {
                config.output.output_dir = dir;
            }
            if no_plots {
                config.output.plots_enabled = false;
            }
            if json_report {
                config.output.json_report = true;
            }
            config.validate()?;

            info!(
                "Analysing {} with horizon {}",
                config.input.symbols.join(", "),
                config.analysis.horizon
            );
            let series = load_all(&config.input).context("Failed to load input data")?;
            let mut engine = AnalysisEngine::new(&config);
            engine.run(series)?;
        }
        Commands::Inputs { input } => {
            let config = input.load_config()?;
            config.validate()?;
            let loader = SpreadsheetLoader::new(&config.input.close_column);
            println!("\n{}", "=".repeat(80));
            println!("📂 INPUT FILES");
            println!("{}", "=".repeat(80));
            for (symbol, path) in resolve_inputs(&config.input)? {
                let series = loader.load(&symbol, &path)?;
                let counts = series.invalid_counts();
                println!(
                    "{:<8} | {:>7} rows | NaN {:>5} | Inf {:>5} | {}",
                    symbol,
                    series.len(),
                    counts.nan_count,
                    counts.inf_count,
                    path.display()
                );
            }
            println!("{}", "=".repeat(80));
        }
    }

    Ok(())
}
