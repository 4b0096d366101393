//! Resolve-taxa command: fill in the taxon_id column of a species table

use crate::fetcher::{build_http_client, TaxonResolver};
use crate::species::SpeciesTable;
use clap::Args;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

use super::{Cli, CliError, OutputFormat};

/// Resolve-taxa command arguments
#[derive(Debug, Args)]
pub struct ResolveTaxaArgs {
    /// Species table to read (defaults to the configured species_csv)
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Where to write the updated table (defaults to the input path)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl ResolveTaxaArgs {
    /// Look up every species name and save the table with its taxon IDs
    ///
    /// Returns the number of names that resolved.
    pub async fn execute(&self, cli: &Cli) -> Result<usize, CliError> {
        let config = cli.load_config()?;
        let input = self.input.clone().unwrap_or_else(|| config.species_csv.clone());
        let output = self.output.clone().unwrap_or_else(|| input.clone());

        let mut table = SpeciesTable::load(&input)?;
        info!("Resolving {} species from {}", table.len(), input.display());

        let client = build_http_client(&config)?;
        let resolver = TaxonResolver::new(client, config.taxa_url.clone());
        let ids = resolver
            .resolve_all(&table.names(), config.taxon_lookup_interval())
            .await;
        let resolved = ids.iter().flatten().count();

        table.set_taxon_ids(&ids)?;
        table.save(&output)?;
        info!("Updated species table saved to {}", output.display());

        match cli.output_format {
            OutputFormat::Json => {
                let summary = json!({
                    "output": output.display().to_string(),
                    "species": ids.len(),
                    "resolved": resolved,
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            OutputFormat::Human => {
                println!("Resolved {}/{} species", resolved, ids.len());
                println!("  Table: {}", output.display());
            }
        }

        Ok(resolved)
    }
}
