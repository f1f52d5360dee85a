//! Stock Year Predictor CLI
//!
//! A command-line tool for querying the prediction service, running its
//! smoke test and launching a local demo server.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{demo, predict, smoke};
use predictor_lib::StockPrices;
use std::path::PathBuf;
use std::time::Duration;

/// Stock Year Predictor CLI
#[derive(Parser)]
#[command(name = "spx")]
#[command(author, version, about = "CLI for the Stock Year Predictor API", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via SPX_API_URL env var)
    #[arg(long, env = "SPX_API_URL", default_value = "http://localhost:5000")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show service health
    Health,

    /// Show the loaded model
    Info,

    /// Predict the year for a set of closing prices
    Predict {
        /// Microsoft closing price
        #[arg(long)]
        msft: f64,

        /// IBM closing price
        #[arg(long)]
        ibm: f64,

        /// Starbucks closing price
        #[arg(long)]
        sbux: f64,

        /// Apple closing price
        #[arg(long)]
        aapl: f64,

        /// S&P 500 index level
        #[arg(long)]
        gspc: f64,

        /// Observation date (YYYY-MM-DD); the server uses today when omitted
        #[arg(long)]
        date: Option<String>,
    },

    /// Run the end-to-end smoke test against a running service
    Smoke {
        /// Historical CSV providing the sample prediction input
        #[arg(long, default_value = "stockdata.csv")]
        data: PathBuf,
    },

    /// Start a local server and keep it running until Ctrl-C
    Demo {
        /// Server binary to launch
        #[arg(long, default_value = "predictor-server")]
        server_bin: PathBuf,

        /// Model artifact
        #[arg(long, default_value = "best_random_forest.json")]
        model: PathBuf,

        /// Historical CSV
        #[arg(long, default_value = "stockdata.csv")]
        data: PathBuf,

        /// HTML page served on /
        #[arg(long, default_value = "index.html")]
        index: PathBuf,

        /// Seconds to wait for the server to answer
        #[arg(long, default_value_t = 30)]
        startup_timeout: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize client
    let client = client::ApiClient::new(&cli.api_url)?;

    // Execute command
    match cli.command {
        Commands::Health => {
            predict::show_health(&client, cli.format).await?;
        }
        Commands::Info => {
            predict::show_model_info(&client, cli.format).await?;
        }
        Commands::Predict {
            msft,
            ibm,
            sbux,
            aapl,
            gspc,
            date,
        } => {
            let prices = StockPrices {
                msft,
                ibm,
                sbux,
                aapl,
                gspc,
            };
            predict::predict(&client, prices, date, cli.format).await?;
        }
        Commands::Smoke { data } => {
            smoke::run(&client, &data, cli.format).await?;
        }
        Commands::Demo {
            server_bin,
            model,
            data,
            index,
            startup_timeout,
        } => {
            let options = demo::DemoOptions {
                server_bin,
                model,
                data,
                index,
                startup_timeout: Duration::from_secs(startup_timeout),
            };
            demo::run(&client, options).await?;
        }
    }

    Ok(())
}
