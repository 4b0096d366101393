//! Top-level CLI and the harvest command

use crate::config::HarvestConfig;
use crate::downloader::{HarvestReport, Harvester};
use crate::species::load_species;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

use super::CliError;

/// Parse and validate a non-negative interval in seconds
fn parse_interval(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("'{s}' is not a valid number"))?;
    if !value.is_finite() || value < 0.0 {
        return Err("interval must be a non-negative number of seconds".to_string());
    }
    Ok(value)
}

/// Species Harvester CLI
#[derive(Parser, Debug)]
#[command(name = "species-harvester")]
#[command(about = "Download licensed species observation photos and their attribution ledger", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// TOML configuration file (defaults are used for missing keys)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,
}

impl Cli {
    /// Load the configuration file, or defaults when none was given
    pub fn load_config(&self) -> Result<HarvestConfig, CliError> {
        Ok(HarvestConfig::load(self.config.as_deref())?)
    }
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch observations, download photos and write the attribution ledger
    Harvest(HarvestArgs),

    /// Look up taxon IDs for the species table
    ResolveTaxa(super::ResolveTaxaArgs),

    /// Renumber image files in species folders
    Rename(super::RenameArgs),
}

/// Harvest command arguments; each flag overrides the config file
#[derive(Parser, Debug, Default)]
pub struct HarvestArgs {
    /// Species table (CSV with name and taxon_id columns)
    #[arg(long)]
    pub species_csv: Option<PathBuf>,

    /// Output root for species folders and the ledger
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Pages fetched per species
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub pages: Option<u32>,

    /// Cooldown after each observation page request, in seconds
    #[arg(long, value_parser = parse_interval)]
    pub interval: Option<f64>,

    /// Maximum simultaneous image downloads
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=256))]
    pub max_downloads: Option<u64>,

    /// Retries for transient page fetch failures
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=20))]
    pub max_retries: Option<u32>,
}

impl HarvestArgs {
    /// Apply command-line overrides to `config`
    pub fn apply(&self, config: &mut HarvestConfig) {
        if let Some(path) = &self.species_csv {
            config.species_csv = path.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.raw_data_path = dir.clone();
        }
        if let Some(pages) = self.pages {
            config.pages_to_fetch = pages;
        }
        if let Some(interval) = self.interval {
            config.api_request_interval_secs = interval;
        }
        if let Some(max) = self.max_downloads {
            config.max_concurrent_downloads = max as usize;
        }
        if let Some(retries) = self.max_retries {
            config.max_page_retries = retries;
        }
    }

    /// Run the harvest and print its summary
    pub async fn execute(&self, cli: &Cli) -> Result<HarvestReport, CliError> {
        let mut config = cli.load_config()?;
        self.apply(&mut config);
        config.validate()?;

        let species = load_species(&config.species_csv)?;
        if species.is_empty() {
            return Err(CliError::InvalidArgument(format!(
                "no species with a taxon_id in {}",
                config.species_csv.display()
            )));
        }
        info!("Loaded {} species from {}", species.len(), config.species_csv.display());

        let harvester = Harvester::new(config)?;
        let report = harvester.run(&species).await?;

        print_report(&report, cli.output_format)?;
        Ok(report)
    }
}

fn print_report(report: &HarvestReport, format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Human => {
            for species in &report.species {
                println!(
                    "{:<32} photos={:<5} saved={:<5} rejected={:<4} failed={:<4} pages_failed={}",
                    species.name,
                    species.photos,
                    species.downloads.saved,
                    species.downloads.rejected,
                    species.downloads.failed,
                    species.pages_failed
                );
            }
            for failure in &report.failures {
                println!("{:<32} FAILED: {}", failure.name, failure.reason);
            }
            println!("\nHarvest complete!");
            println!("  Species: {}", report.species.len() + report.failures.len());
            println!("  Ledger rows: {}", report.total_records);
            println!("  Ledger: {}", report.ledger_path.display());
        }
    }
    Ok(())
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}
