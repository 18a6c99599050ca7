use crate::error::{FableError, Result};
use crate::sector::OnshoreSectors;
use csv::ReaderBuilder;
use fable_utils::slug::slugify;
use serde::{Deserialize, Serialize};

/// Collector-wide timezone when neither the environment nor the site names one.
pub const DEFAULT_TIMEZONE: &str = "Africa/Tunis";

/// A coastal location: a destination, or the home port.
///
/// Loaded once from the sites CSV and never mutated afterwards.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Site {
    /// Human-readable name (e.g., "Sidi Bou Said")
    pub name: String,
    /// Stable identifier, generated from the name when the CSV leaves it blank
    pub slug: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Radius around the site considered sheltered, in km
    pub shelter_bonus_radius_km: f64,
    /// IANA timezone name used when requesting local-time forecasts; empty
    /// means the collector-wide default
    pub timezone: String,
    /// Wind directions blowing from the sea onto this coast
    pub onshore_sectors: OnshoreSectors,
}

impl Site {
    /// Parse a CSV string of site data into a vector of Sites.
    ///
    /// Expected CSV columns: name, slug, lat, lon, shelter_bonus_radius_km, timezone, onshore_sectors
    ///
    /// Only name and coordinates are required; the other columns may be blank
    /// or absent.
    pub fn parse_site_csv(csv_object: &str) -> Result<Vec<Site>> {
        let mut site_list: Vec<Site> = Vec::new();
        let mut rdr = ReaderBuilder::new()
            .delimiter(b',')
            .has_headers(true)
            .flexible(true)
            .from_reader(csv_object.as_bytes());
        for (line, row) in rdr.records().enumerate() {
            let record = row?;
            let field = |i: usize| record.get(i).unwrap_or("").trim();

            let name = field(0).to_string();
            if name.is_empty() {
                return Err(FableError::InvalidSite(format!("row {}: empty name", line + 1)));
            }
            let slug = match field(1) {
                "" => slugify(&name),
                s => s.to_string(),
            };
            let coordinate = |i: usize, what: &str| {
                field(i).parse::<f64>().map_err(|_| {
                    FableError::InvalidSite(format!("{name}: invalid {what} '{}'", field(i)))
                })
            };
            let latitude = coordinate(2, "latitude")?;
            let longitude = coordinate(3, "longitude")?;
            let shelter_bonus_radius_km = field(4).parse::<f64>().unwrap_or(0.0);
            let timezone = field(5).to_string();
            let onshore_sectors = field(6).parse::<OnshoreSectors>()?;

            site_list.push(Site {
                name,
                slug,
                latitude,
                longitude,
                shelter_bonus_radius_km,
                timezone,
                onshore_sectors,
            });
        }
        Ok(site_list)
    }

    /// Keep only the sites whose slug or slugified name is in `only`.
    ///
    /// An empty filter keeps every site.
    pub fn filter_selected(sites: Vec<Site>, only: &[String]) -> Vec<Site> {
        if only.is_empty() {
            return sites;
        }
        let wanted: Vec<String> = only.iter().map(|s| slugify(s)).collect();
        sites
            .into_iter()
            .filter(|site| wanted.contains(&site.slug) || wanted.contains(&slugify(&site.name)))
            .collect()
    }

    /// The site's own timezone, or `fallback` when it names none.
    pub fn timezone_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.timezone.is_empty() {
            fallback
        } else {
            &self.timezone
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Site;

    const SITES: &str = "\
name,slug,lat,lon,shelter_bonus_radius_km,timezone,onshore_sectors
Gammarth Port,,36.9203,10.2846,0.5,Africa/Tunis,30-150
El Haouaria,el-haouaria,37.0520,11.0090,1.2,,330-360;0-70
Ghar El Melh,,37.1700,10.2300
";

    #[test]
    fn test_parse_site_csv() {
        let sites = Site::parse_site_csv(SITES).unwrap();
        assert_eq!(sites.len(), 3);
        assert_eq!(sites[0].slug, "gammarth-port");
        assert!((sites[0].latitude - 36.9203).abs() < f64::EPSILON);
        assert!(sites[0].onshore_sectors.contains(90.0));
        assert_eq!(sites[0].timezone_or("Europe/Rome"), "Africa/Tunis");
        assert_eq!(sites[1].timezone_or("Europe/Rome"), "Europe/Rome");
        assert!(sites[1].onshore_sectors.contains(10.0));
        assert_eq!(sites[2].slug, "ghar-el-melh");
        assert_eq!(sites[2].shelter_bonus_radius_km, 0.0);
        assert!(sites[2].onshore_sectors.is_empty());
    }

    #[test]
    fn test_parse_rejects_bad_coordinates() {
        let csv = "name,slug,lat,lon\nNowhere,,north,10.0\n";
        assert!(Site::parse_site_csv(csv).is_err());
    }

    #[test]
    fn test_parse_empty_csv() {
        let csv = "name,slug,lat,lon,shelter_bonus_radius_km,timezone,onshore_sectors\n";
        let sites = Site::parse_site_csv(csv).unwrap();
        assert_eq!(sites.len(), 0);
    }

    #[test]
    fn test_filter_selected() {
        let sites = Site::parse_site_csv(SITES).unwrap();
        let only = vec!["Ghar El Melh".to_string(), "el-haouaria".to_string()];
        let kept = Site::filter_selected(sites.clone(), &only);
        assert_eq!(kept.len(), 2);
        assert_eq!(Site::filter_selected(sites.clone(), &[]).len(), 3);
        assert_eq!(Site::filter_selected(sites, &["korbous".to_string()]).len(), 0);
    }
}
