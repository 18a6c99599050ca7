//! Offline configuration check.

use crate::files::load_rules;
use anyhow::{bail, Context};
use fable_core::rules::LoadedRules;
use fable_core::site::Site;
use fable_utils::hours::parse_timezone;

/// Parse the sites CSV and the rules, print what was understood.
///
/// An unreadable or invalid sites file, or a site timezone that is not a
/// known IANA name, fails the command; rule problems are reported but the
/// defaults that replaced them are valid.
pub async fn run_validate(sites_csv: &str, rules: Option<&str>) -> anyhow::Result<()> {
    let csv = tokio::fs::read_to_string(sites_csv)
        .await
        .with_context(|| format!("reading sites {sites_csv}"))?;
    let sites = Site::parse_site_csv(&csv).with_context(|| format!("parsing {sites_csv}"))?;
    let loaded = load_rules(rules).await?;
    print!("{}", report(&sites, &loaded));
    let bad = bad_timezones(&sites);
    if !bad.is_empty() {
        bail!("{} sites name an unknown timezone", bad.len());
    }
    Ok(())
}

/// Sites whose own timezone does not resolve. Blank means the default.
fn bad_timezones(sites: &[Site]) -> Vec<&Site> {
    sites
        .iter()
        .filter(|s| !s.timezone.is_empty() && parse_timezone(&s.timezone).is_err())
        .collect()
}

fn report(sites: &[Site], loaded: &LoadedRules) -> String {
    let mut out = format!("{} sites\n", sites.len());
    for site in sites {
        let sectors = if site.onshore_sectors.is_empty() {
            "-".to_string()
        } else {
            site.onshore_sectors.to_string()
        };
        out.push_str(&format!(
            "  {:<24} {:<24} {:>9.4} {:>9.4}  onshore {}\n",
            site.slug, site.name, site.latitude, site.longitude, sectors
        ));
    }
    for site in bad_timezones(sites) {
        out.push_str(&format!("  {}: unknown timezone '{}'\n", site.slug, site.timezone));
    }
    if loaded.issues.is_empty() {
        out.push_str("rules: ok\n");
    } else {
        out.push_str(&format!("rules: {} issues\n", loaded.issues.len()));
        for issue in &loaded.issues {
            out.push_str(&format!("  [{}] {}\n", issue.section, issue.message));
        }
    }
    out.push_str(&format!("rules digest: {}\n", loaded.rules.digest()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fable_core::rules::RuleSet;

    #[test]
    fn test_report_lists_sites_and_issues() {
        let sites = Site::parse_site_csv(
            "name,slug,lat,lon,shelter_bonus_radius_km,timezone,onshore_sectors\n\
             Gammarth Port,,36.9203,10.2846,0.5,,30-150\n",
        )
        .unwrap();
        let loaded = RuleSet::from_json_lenient(r#"{"windows": {"min_hours": 7, "max_hours": 6}}"#);
        let text = report(&sites, &loaded);
        assert!(text.starts_with("1 sites\n"));
        assert!(text.contains("gammarth-port"));
        assert!(text.contains("[windows]"));
        assert!(text.contains(&RuleSet::default().digest()));
    }

    #[test]
    fn test_report_flags_unknown_timezones() {
        let sites = Site::parse_site_csv(
            "name,slug,lat,lon,shelter_bonus_radius_km,timezone,onshore_sectors\n\
             Gammarth Port,,36.9203,10.2846,0.5,Africa/Tunis,30-150\n\
             Korbous,,36.8170,10.5680,0.8,Africa/Tunisia,\n\
             Kelibia,,36.8470,11.0990,,,\n",
        )
        .unwrap();
        let bad = bad_timezones(&sites);
        assert_eq!(bad.len(), 1);
        assert_eq!(bad[0].slug, "korbous");

        let text = report(&sites, &RuleSet::from_json_lenient("{}"));
        assert!(text.contains("korbous: unknown timezone 'Africa/Tunisia'"));
        assert!(!text.contains("gammarth-port: unknown timezone"));
    }

    #[tokio::test]
    async fn test_validate_missing_sites_file() {
        assert!(run_validate("/nonexistent/sites.csv", None).await.is_err());
    }
}
