//! Forecast collection: one spot file per site.

use crate::files::write_atomic;
use anyhow::{bail, Context};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use fable_core::forecast::{
    expand_models, OpenMeteoClient, ProviderResponse, FORECAST_ENDPOINT, MARINE_ENDPOINT,
    MARINE_SOURCE,
};
use fable_core::hour_range::HourRange;
use fable_core::series::{HourlySeries, SeriesSite, WaveSeries};
use fable_core::site::Site;
use fable_core::spot::SpotFile;
use fable_utils::hours::{floor_hour, format_local, parse_start, parse_timezone};
use log::{info, warn};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub struct CollectOptions {
    pub sites_csv: String,
    pub out_dir: String,
    pub timezone: String,
    pub window_hours: u32,
    pub start_iso: Option<String>,
    pub only_sites: Vec<String>,
    pub models: String,
    pub request_timeout: Duration,
    pub site_budget: Duration,
}

/// Fetch every selected site and write `<out_dir>/<slug>.json`.
///
/// A site that fails or runs over its budget is skipped with a warning; the
/// run fails only when no site could be written.
pub async fn run_collect(options: &CollectOptions) -> anyhow::Result<()> {
    let default_tz = parse_timezone(&options.timezone).context("FABLE_TZ")?;
    let start = options
        .start_iso
        .as_deref()
        .map(|s| parse_start(s, &default_tz))
        .transpose()
        .context("FABLE_START_ISO")?;

    let csv = tokio::fs::read_to_string(&options.sites_csv)
        .await
        .with_context(|| format!("reading sites {}", options.sites_csv))?;
    let sites = Site::filter_selected(Site::parse_site_csv(&csv)?, &options.only_sites);
    if sites.is_empty() {
        bail!("No sites selected from {}", options.sites_csv);
    }
    let models = expand_models(&options.models)?;

    let client = OpenMeteoClient::new(options.request_timeout)?;
    let out_dir = Path::new(&options.out_dir);
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("creating {}", out_dir.display()))?;

    info!(
        "Collecting {} sites, models {:?}, {} hours",
        sites.len(),
        models,
        options.window_hours
    );

    let mut written = 0;
    for site in &sites {
        let site = Site {
            timezone: site.timezone_or(&options.timezone).to_string(),
            ..site.clone()
        };
        let tz = match parse_timezone(&site.timezone) {
            Ok(tz) => tz,
            Err(e) => {
                warn!("Skipping {}: {:#}", site.name, e);
                continue;
            }
        };
        let axis_start = local_start(start.as_ref(), &tz, Utc::now());
        let fetch = collect_site(&client, &site, &models, axis_start, options.window_hours);
        let spot = match tokio::time::timeout(options.site_budget, fetch).await {
            Ok(Ok(spot)) => spot,
            Ok(Err(e)) => {
                warn!("Skipping {}: {:#}", site.name, e);
                continue;
            }
            Err(_) => {
                warn!(
                    "Skipping {}: exceeded budget of {}s",
                    site.name,
                    options.site_budget.as_secs()
                );
                continue;
            }
        };
        let path = out_dir.join(format!("{}.json", site.slug));
        write_atomic(&path, &spot.to_json()?).await?;
        info!("Wrote {}", path.display());
        written += 1;
    }

    info!("Collected {}/{} sites into {}", written, sites.len(), out_dir.display());
    if written == 0 {
        bail!("No site could be collected");
    }
    Ok(())
}

/// First hour of a site's axis in its own local time: the requested start,
/// or the current hour.
pub fn local_start(start: Option<&DateTime<Tz>>, tz: &Tz, now: DateTime<Utc>) -> NaiveDateTime {
    let local = match start {
        Some(start) => start.with_timezone(tz).naive_local(),
        None => now.with_timezone(tz).naive_local(),
    };
    floor_hour(&local)
}

async fn collect_site(
    client: &OpenMeteoClient,
    site: &Site,
    models: &[String],
    start: NaiveDateTime,
    window_hours: u32,
) -> anyhow::Result<SpotFile> {
    let span = TimeDelta::hours(i64::from(window_hours));
    let fetch_start = start.date();
    let fetch_end = (start + span).date();

    let mut responses = Vec::with_capacity(models.len());
    for model in models {
        match client
            .fetch_model(site, model, &site.timezone, &fetch_start, &fetch_end)
            .await
        {
            Ok(response) => responses.push((model.clone(), response)),
            Err(e) => warn!("{}: dropping model {}: {}", site.name, model, e),
        }
    }
    if responses.is_empty() {
        bail!("no model returned data");
    }
    let marine = match client
        .fetch_marine(site, &site.timezone, &fetch_start, &fetch_end)
        .await
    {
        Ok(response) => Some(response),
        Err(e) => {
            warn!("{}: no wave data, hours will fail closed: {}", site.name, e);
            None
        }
    };

    let offset_seconds = responses[0].1.utc_offset_seconds;
    let local_now = Utc::now().naive_utc() + TimeDelta::seconds(i64::from(offset_seconds));
    let axis: Vec<NaiveDateTime> = HourRange::starting_at(start, window_hours).collect();
    let offset = FixedOffset::east_opt(offset_seconds);
    let series = assemble_series(site, offset, &axis, &responses, marine.as_ref())?;

    let mut sources = BTreeMap::new();
    sources.insert("forecast".to_string(), FORECAST_ENDPOINT.to_string());
    if marine.is_some() {
        sources.insert("marine".to_string(), MARINE_ENDPOINT.to_string());
    }
    Ok(SpotFile::from_series(
        site,
        &series,
        format_local(&local_now, offset),
        sources,
    ))
}

/// Align the provider responses of one site onto `axis`.
///
/// Without a marine response the wave series is entirely unknown.
pub fn assemble_series(
    site: &Site,
    offset: Option<FixedOffset>,
    axis: &[NaiveDateTime],
    responses: &[(String, ProviderResponse)],
    marine: Option<&ProviderResponse>,
) -> fable_core::error::Result<HourlySeries> {
    let models = responses
        .iter()
        .map(|(name, response)| response.to_model_series(name, axis))
        .collect::<fable_core::error::Result<Vec<_>>>()?;
    let waves = match marine {
        Some(response) => response.to_wave_series(axis)?,
        None => WaveSeries::unknown(MARINE_SOURCE, axis.len()),
    };
    let series_site = SeriesSite {
        slug: site.slug.clone(),
        name: site.name.clone(),
        onshore_sectors: site.onshore_sectors.clone(),
        utc_offset: offset,
    };
    HourlySeries::new(series_site, axis.to_vec(), models, waves)
}
