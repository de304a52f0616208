#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the `commute_burden` binary.
//!
//! [`init_logger`] routes `log` output through `indicatif-log-bridge` so
//! stage banners never tear a progress bar, and [`IndicatifProgress`]
//! renders the per-ZCTA measurement loop of one region.

use std::sync::Arc;
use std::time::Duration;

use commute_burden_source::progress::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

/// Spinner shown while boundaries and survey tables download.
const FETCH_TEMPLATE: &str = "{prefix:.bold} {spinner:.cyan} {msg}";

/// Bar shown once the number of ZCTAs to measure is known.
const MEASURE_TEMPLATE: &str =
    "{prefix:.bold} {wide_bar:.cyan/dim} {pos}/{len} ZCTAs [{elapsed}<{eta}] {msg}";

/// A per-region [`ProgressCallback`] backed by an `indicatif` bar.
pub struct IndicatifProgress {
    bar: ProgressBar,
    measuring: ProgressStyle,
}

impl IndicatifProgress {
    /// Adds a bar for `region` to `multi`. It spins until
    /// [`ProgressCallback::set_total`] announces how many ZCTAs will be
    /// measured.
    #[must_use]
    pub fn areas_bar(multi: &MultiProgress, region: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner().with_prefix(region.to_string()));
        bar.set_style(
            ProgressStyle::with_template(FETCH_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message("fetching boundaries and survey tables");
        bar.enable_steady_tick(Duration::from_millis(120));

        let measuring = ProgressStyle::with_template(MEASURE_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");

        Arc::new(Self { bar, measuring })
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_style(self.measuring.clone());
        self.bar.set_length(total);
        self.bar.reset();
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.disable_steady_tick();
        self.bar.finish_with_message(msg);
    }
}

/// Installs the global logger and returns the [`MultiProgress`] every
/// bar must be added to.
///
/// Logs at `info` unless `RUST_LOG` says otherwise, so the per-region
/// stage banners are visible by default. Calling it again is a no-op
/// apart from returning a fresh [`MultiProgress`].
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_ok()
    {
        log::set_max_level(level);
    }

    multi
}
