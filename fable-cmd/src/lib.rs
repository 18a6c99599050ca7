//! Command implementations for the FABLE CLI.
//!
//! `collect` fetches forecasts into per-site spot files, `detect` turns a
//! directory of spot files into Go windows, `validate` checks the
//! configuration without touching the network.

use clap::Subcommand;
use fable_core::site::DEFAULT_TIMEZONE;
use std::time::Duration;

pub mod collect;
pub mod detect;
pub mod files;
pub mod validate;

#[derive(Subcommand)]
pub enum Command {
    /// Fetch hourly forecasts for every site and write one spot file per site
    Collect {
        /// Sites CSV (name,slug,lat,lon,shelter_bonus_radius_km,timezone,onshore_sectors)
        #[arg(short = 's', long)]
        sites_csv: String,

        /// Directory the spot files are written to
        #[arg(short = 'o', long, default_value = "spots")]
        out_dir: String,

        /// IANA timezone for sites that do not name one
        #[arg(long, env = "FABLE_TZ", default_value = DEFAULT_TIMEZONE)]
        timezone: String,

        /// Hours of forecast to keep per site
        #[arg(long, env = "FABLE_WINDOW_HOURS", default_value_t = 48,
              value_parser = clap::value_parser!(u32).range(1..=72))]
        window_hours: u32,

        /// First hour of the axis: local time in FABLE_TZ (YYYY-MM-DDTHH:MM), or
        /// RFC 3339 with an offset; defaults to the current hour
        #[arg(long, env = "FABLE_START_ISO")]
        start_iso: Option<String>,

        /// Only collect these sites (names or slugs, comma separated)
        #[arg(long, env = "FABLE_ONLY_SITES", value_delimiter = ',')]
        only_sites: Vec<String>,

        /// Weather models or aliases (default, fast, robust), comma separated
        #[arg(long, env = "FABLE_MODELS", default_value = "default")]
        models: String,

        /// Timeout of a single HTTP request, in seconds
        #[arg(long, default_value_t = 20)]
        request_timeout_secs: u64,

        /// Time budget for all requests of one site, in seconds
        #[arg(long, default_value_t = 90)]
        site_budget_secs: u64,
    },

    /// Detect Go windows from the home port to every other spot
    Detect {
        /// Directory holding the spot files
        #[arg(short = 'd', long, default_value = "spots")]
        spots_dir: String,

        /// Rules JSON; defaults apply when omitted
        #[arg(short = 'r', long)]
        rules: Option<String>,

        /// Slug of the home port; the first spot is used when absent
        #[arg(long)]
        home: Option<String>,

        /// Output path, `<spots_dir>/windows.json` by default
        #[arg(short = 'o', long)]
        out: Option<String>,

        /// Override of `windows.min_hours`
        #[arg(long)]
        min_hours: Option<usize>,

        /// Override of `windows.max_hours`
        #[arg(long)]
        max_hours: Option<usize>,

        /// Include per-hour reason tags for each destination
        #[arg(long)]
        diagnostics: bool,
    },

    /// Check the sites CSV and the rules JSON and print the rules digest
    Validate {
        #[arg(short = 's', long)]
        sites_csv: String,

        #[arg(short = 'r', long)]
        rules: Option<String>,
    },
}

pub async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Collect {
            sites_csv,
            out_dir,
            timezone,
            window_hours,
            start_iso,
            only_sites,
            models,
            request_timeout_secs,
            site_budget_secs,
        } => {
            let options = collect::CollectOptions {
                sites_csv,
                out_dir,
                timezone,
                window_hours,
                start_iso,
                only_sites,
                models,
                request_timeout: Duration::from_secs(request_timeout_secs),
                site_budget: Duration::from_secs(site_budget_secs),
            };
            collect::run_collect(&options).await
        }
        Command::Detect {
            spots_dir,
            rules,
            home,
            out,
            min_hours,
            max_hours,
            diagnostics,
        } => {
            let options = detect::DetectOptions {
                spots_dir,
                rules,
                home,
                out,
                min_hours,
                max_hours,
                diagnostics,
            };
            detect::run_detect(&options).await
        }
        Command::Validate { sites_csv, rules } => {
            validate::run_validate(&sites_csv, rules.as_deref()).await
        }
    }
}
