/*!
salesviz Command Line Interface

Runs the warehouse sales reports and writes their charts to the output directory.
*/

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use salesviz::config::Settings;
use salesviz::export::Exporter;
use salesviz::reader::{Params, Reader, SnowflakeReader};
use salesviz::report::{self, sql, DateWindow, RunOptions};
use salesviz::VERSION;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "salesviz")]
#[command(about = "Warehouse sales reports as Vega-Lite charts")]
#[command(version = VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run reports and export their charts
    Run {
        /// Report to run (repeatable); all reports when omitted
        #[arg(long)]
        only: Vec<String>,

        /// Output directory
        #[arg(long, env = "SF_OUTPUT")]
        output: Option<PathBuf>,

        /// Start of the date window for windowed reports (YYYY-MM-DD)
        #[arg(long, requires = "end_date")]
        start_date: Option<NaiveDate>,

        /// End of the date window for windowed reports (YYYY-MM-DD)
        #[arg(long, requires = "start_date")]
        end_date: Option<NaiveDate>,

        /// Continue with the next report when one fails
        #[arg(long)]
        keep_going: bool,

        /// Write HTML only, skip PNG rendering
        #[arg(long)]
        no_image: bool,
    },

    /// List the available reports
    List,

    /// Connect and count the rows of the weekly fact table
    Check,
}

fn main() -> anyhow::Result<()> {
    // Before parsing, so `.env` values reach env-backed flags
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run {
            only,
            output,
            start_date,
            end_date,
            keep_going,
            no_image,
        } => {
            let window = match (start_date, end_date) {
                (Some(start), Some(end)) => Some(DateWindow::new(start, end)?),
                _ => None,
            };
            let mut settings = Settings::from_env();
            if let Some(output) = output {
                settings = settings.with_output_dir(output);
            }
            tracing::debug!("{:?}", settings);

            let mut exporter = Exporter::new(&settings.output_dir);
            if no_image {
                exporter = exporter.without_image();
            }
            let options = RunOptions {
                only,
                window,
                keep_going,
            };

            let mut reader = SnowflakeReader::connect(&settings)
                .context("Failed to connect to the warehouse")?;
            let summary =
                report::run_and_close(&mut reader, &exporter, &report::catalog(), &options)?;

            println!(
                "{} chart(s) written to {}",
                summary.exported.len(),
                exporter.output_dir().display()
            );
            if !summary.is_success() {
                for (name, error) in &summary.failed {
                    eprintln!("{}: {}", name, error);
                }
                anyhow::bail!("{} report(s) failed", summary.failed.len());
            }
        }

        Commands::List => {
            for report in report::catalog() {
                match report.window {
                    Some(window) => println!(
                        "{:<36} {} [{} .. {}]",
                        report.name, report.description, window.start, window.end
                    ),
                    None => println!("{:<36} {}", report.name, report.description),
                }
            }
        }

        Commands::Check => {
            let settings = Settings::from_env();
            let mut reader = SnowflakeReader::connect(&settings)
                .context("Failed to connect to the warehouse")?;
            let rows = reader.execute(sql::FACT_ROW_COUNT, &Params::new());
            let closed = reader.close();
            let rows = match rows {
                Ok(rows) => {
                    closed?;
                    rows
                }
                Err(e) => {
                    if let Err(close_err) = closed {
                        tracing::warn!("Failed to close the warehouse session: {}", close_err);
                    }
                    return Err(e.into());
                }
            };
            let count = rows
                .first()
                .and_then(|row| row.get("row_count"))
                .cloned()
                .unwrap_or(serde_json::Value::Null);
            println!("Connection OK, WALMART_WEEKLY_REPORTS_FACT rows: {}", count);
        }
    }

    Ok(())
}
