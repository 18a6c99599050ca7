use crate::error::{FableError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A compass range in degrees, inclusive at both ends.
///
/// When `from > to` the range wraps through north (e.g. 330..70).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sector {
    pub from: f64,
    pub to: f64,
}

impl Sector {
    pub fn contains(&self, angle: f64) -> bool {
        let angle = angle.rem_euclid(360.0);
        if self.from <= self.to {
            // 360 and 0 are the same bearing
            (self.from..=self.to).contains(&angle) || (self.to >= 360.0 && angle == 0.0)
        } else {
            angle >= self.from || angle <= self.to
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

impl FromStr for Sector {
    type Err = FableError;

    fn from_str(s: &str) -> Result<Self> {
        let (a, b) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| FableError::InvalidSector(s.to_string()))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .ok()
                .filter(|d| (0.0..=360.0).contains(d))
                .ok_or_else(|| FableError::InvalidSector(s.to_string()))
        };
        Ok(Sector {
            from: parse(a)?,
            to: parse(b)?,
        })
    }
}

/// The directions from which wind blows from the sea onto a site's coast.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OnshoreSectors(pub Vec<Sector>);

impl OnshoreSectors {
    pub fn contains(&self, direction: f64) -> bool {
        self.0.iter().any(|s| s.contains(direction))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for OnshoreSectors {
    type Err = FableError;

    /// Parse `"30-150"` or `"330-360;0-70"`. An empty string means no sector.
    fn from_str(s: &str) -> Result<Self> {
        s.split(';')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Sector>>>()
            .map(OnshoreSectors)
    }
}

impl fmt::Display for OnshoreSectors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(Sector::to_string).collect();
        write!(f, "{}", parts.join(";"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_sector() {
        let s: Sector = "30-150".parse().unwrap();
        assert!(s.contains(30.0));
        assert!(s.contains(90.0));
        assert!(s.contains(150.0));
        assert!(!s.contains(151.0));
        assert!(!s.contains(10.0));
    }

    #[test]
    fn test_wrapping_sector() {
        let s: Sector = "330-70".parse().unwrap();
        assert!(s.contains(350.0));
        assert!(s.contains(0.0));
        assert!(s.contains(70.0));
        assert!(!s.contains(180.0));
    }

    #[test]
    fn test_split_wrap_sectors() {
        let sectors: OnshoreSectors = "330-360;0-70".parse().unwrap();
        assert_eq!(sectors.0.len(), 2);
        assert!(sectors.contains(345.0));
        assert!(sectors.contains(360.0));
        assert!(sectors.contains(0.0));
        assert!(sectors.contains(45.0));
        assert!(!sectors.contains(200.0));
        assert_eq!(sectors.to_string(), "330-360;0-70");
    }

    #[test]
    fn test_empty_and_invalid() {
        let none: OnshoreSectors = "".parse().unwrap();
        assert!(none.is_empty());
        assert!(!none.contains(90.0));
        assert!("30".parse::<Sector>().is_err());
        assert!("30-400".parse::<Sector>().is_err());
        assert!("a-b".parse::<OnshoreSectors>().is_err());
    }
}
