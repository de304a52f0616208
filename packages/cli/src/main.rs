#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the commute-burden dataset pipeline.
//!
//! `run` builds the final ZCTA CSV for one region or all of them,
//! `boundaries` exports the filtered ZCTA outlines, and `regions` lists
//! what is registered. With no subcommand an interactive menu is shown.
//!
//! Uses `indicatif-log-bridge` (via [`commute_burden_cli_utils::init_logger`])
//! so that log lines and progress bars share the terminal.

mod interactive;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use commute_burden_cli_utils::{IndicatifProgress, MultiProgress};
use commute_burden_pipeline::paths;
use commute_burden_pipeline::settings::{PipelineSettings, region_id_from_env};
use commute_burden_pipeline::{
    HttpSources, export_boundaries, region_boundaries, resolve_region, run_batch,
};
use commute_burden_region::{RegionConfig, all_regions};
use commute_burden_source_models::AcsYear;

#[derive(Parser)]
#[command(
    name = "commute_burden",
    about = "ZCTA-level commute and housing burden datasets"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the final dataset CSV for one region (default: `METRO` or phoenix)
    Run {
        /// Region id (e.g., "phoenix", "`los_angeles`")
        #[arg(long, conflicts_with = "all")]
        region: Option<String>,
        /// Build every registered region; a failing region does not stop the rest
        #[arg(long)]
        all: bool,
        /// Directory the CSVs are written to (default: data/final)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Directory for provider response caches (default: .cache)
        #[arg(long)]
        cache_dir: Option<PathBuf>,
        /// ACS 5-year vintage of the commute/housing table
        #[arg(long)]
        acs_year: Option<u16>,
        /// ACS 5-year vintage of the demographics table
        #[arg(long)]
        demographics_year: Option<u16>,
    },
    /// Export the region's ZCTA boundaries as `GeoJSON`
    Boundaries {
        /// Region id (default: `METRO` or phoenix)
        #[arg(long)]
        region: Option<String>,
        /// Directory the `GeoJSON` is written to (default: data/final)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// List all registered regions
    Regions,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = commute_burden_cli_utils::init_logger();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return interactive::run(&multi).await;
    };

    match command {
        Commands::Regions => print_regions(),
        Commands::Run {
            region,
            all,
            output_dir,
            cache_dir,
            acs_year,
            demographics_year,
        } => {
            let mut settings = PipelineSettings::from_env();
            if let Some(dir) = output_dir {
                settings.output_dir = dir;
            }
            if let Some(dir) = cache_dir {
                settings.cache_dir = dir;
            }
            if let Some(year) = acs_year {
                settings.acs_year = AcsYear::from_value(year)?;
            }
            if let Some(year) = demographics_year {
                settings.demographics_year = AcsYear::from_value(year)?;
            }

            let regions = if all {
                all_regions()
            } else {
                let id = region.unwrap_or_else(region_id_from_env);
                vec![resolve_region(&id)?]
            };

            build(&regions, &settings, &multi).await?;
        }
        Commands::Boundaries { region, output_dir } => {
            let mut settings = PipelineSettings::from_env();
            if let Some(dir) = output_dir {
                settings.output_dir = dir;
            }
            let id = region.unwrap_or_else(region_id_from_env);
            export(&resolve_region(&id)?, &settings).await?;
        }
    }

    Ok(())
}

/// Prints the region registry as a table.
fn print_regions() {
    println!("{:<14} {:<7} {:<6} NAME", "ID", "CBSA", "EPSG");
    println!("{}", "-".repeat(60));
    for region in all_regions() {
        println!(
            "{:<14} {:<7} {:<6} {}",
            region.id, region.cbsa_code, region.utm_epsg, region.name
        );
    }
}

/// Builds and writes the dataset of every region in `regions`.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built or any region
/// fails. Regions that succeed are still written.
async fn build(
    regions: &[RegionConfig],
    settings: &PipelineSettings,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let sources = HttpSources::new(settings)?;

    let report = run_batch(regions, settings, &sources, |region| {
        IndicatifProgress::areas_bar(multi, &region.id)
    })
    .await;

    log::info!("Finished in {:.1}s", start.elapsed().as_secs_f64());

    let failures = report.failures();
    if failures > 0 {
        return Err(format!("{failures} of {} regions failed", regions.len()).into());
    }
    Ok(())
}

/// Writes the filtered ZCTA boundaries of `region` next to its dataset.
///
/// # Errors
///
/// Returns an error if the boundaries cannot be fetched or written.
async fn export(
    region: &RegionConfig,
    settings: &PipelineSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let sources = HttpSources::new(settings)?;
    let areas = region_boundaries(region, &sources).await?;

    let path = paths::boundaries_path(&settings.output_dir, &region.id);
    export_boundaries(&areas, &path)?;
    log::info!(
        "{}: wrote {} ZCTA boundaries to {}",
        region.id,
        areas.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_flags() {
        let cli = Cli::parse_from([
            "commute_burden",
            "run",
            "--region",
            "memphis",
            "--acs-year",
            "2019",
        ]);
        match cli.command {
            Some(Commands::Run {
                region, acs_year, ..
            }) => {
                assert_eq!(region.as_deref(), Some("memphis"));
                assert_eq!(acs_year, Some(2019));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn region_and_all_conflict() {
        assert!(
            Cli::try_parse_from(["commute_burden", "run", "--region", "dallas", "--all"]).is_err()
        );
    }

    #[test]
    fn no_subcommand_is_interactive() {
        let cli = Cli::parse_from(["commute_burden"]);
        assert!(cli.command.is_none());
    }
}
