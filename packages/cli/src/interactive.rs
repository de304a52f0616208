//! Interactive mode, used when no subcommand is given.
//!
//! Prompts for an action and the regions to run it on, then hands off
//! to the same functions the subcommands use.

use commute_burden_cli_utils::MultiProgress;
use commute_burden_pipeline::settings::{PipelineSettings, region_id_from_env};
use commute_burden_region::{RegionConfig, all_regions};
use dialoguer::{MultiSelect, Select};

/// Top-level actions offered in interactive mode.
enum Action {
    BuildDataset,
    ExportBoundaries,
    ListRegions,
}

impl Action {
    const ALL: &[Self] = &[Self::BuildDataset, Self::ExportBoundaries, Self::ListRegions];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::BuildDataset => "Build ZCTA datasets",
            Self::ExportBoundaries => "Export ZCTA boundaries (GeoJSON)",
            Self::ListRegions => "List regions",
        }
    }
}

/// Runs the interactive flow.
///
/// # Errors
///
/// Returns an error if a prompt fails, or if any selected region fails
/// to build or export.
#[allow(clippy::future_not_send)]
pub async fn run(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();
    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    let settings = PipelineSettings::from_env();

    match Action::ALL[idx] {
        Action::ListRegions => {
            crate::print_regions();
            Ok(())
        }
        Action::BuildDataset => {
            let regions = select_regions()?;
            crate::build(&regions, &settings, multi).await
        }
        Action::ExportBoundaries => {
            let regions = select_regions()?;
            for region in &regions {
                crate::export(region, &settings).await?;
            }
            Ok(())
        }
    }
}

/// Prompts for one or more regions, preselecting the `METRO` region.
fn select_regions() -> Result<Vec<RegionConfig>, Box<dyn std::error::Error>> {
    let regions = all_regions();
    let preferred = region_id_from_env();

    let labels: Vec<String> = regions
        .iter()
        .map(|r| format!("{} ({})", r.id, r.name))
        .collect();
    let defaults: Vec<bool> = regions
        .iter()
        .map(|r| r.id.eq_ignore_ascii_case(&preferred))
        .collect();

    let selected = MultiSelect::new()
        .with_prompt("Regions (space=toggle, a=all, enter=confirm)")
        .items(&labels)
        .defaults(&defaults)
        .interact()?;

    if selected.is_empty() {
        return Err("No regions selected".into());
    }

    Ok(selected.into_iter().map(|i| regions[i].clone()).collect())
}
