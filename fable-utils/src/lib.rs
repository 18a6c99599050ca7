//! Shared utility functions for FABLE crates.

/// Slug generation for site names.
pub mod slug {
    /// Fold the accented Latin letters found in Mediterranean place names
    /// onto their ASCII base letter.
    fn fold_accent(c: char) -> Option<char> {
        let folded = match c {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
            'ç' => 'c',
            'è' | 'é' | 'ê' | 'ë' => 'e',
            'ì' | 'í' | 'î' | 'ï' => 'i',
            'ñ' => 'n',
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
            'ù' | 'ú' | 'û' | 'ü' => 'u',
            'ý' | 'ÿ' => 'y',
            _ => return None,
        };
        Some(folded)
    }

    /// Turn a display name into a stable identifier.
    ///
    /// Lowercases, strips diacritics, and collapses every run of
    /// non-alphanumeric characters into a single `-`.
    /// e.g., "Ghar El Melh" -> "ghar-el-melh", "Kélibia" -> "kelibia"
    pub fn slugify(name: &str) -> String {
        let mut out = String::with_capacity(name.len());
        let mut pending_dash = false;
        for c in name.chars().flat_map(char::to_lowercase) {
            let c = fold_accent(c).unwrap_or(c);
            if c.is_ascii_alphanumeric() {
                if pending_dash && !out.is_empty() {
                    out.push('-');
                }
                pending_dash = false;
                out.push(c);
            } else {
                pending_dash = true;
            }
        }
        out
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_slugify_basic() {
            assert_eq!(slugify("Gammarth Port"), "gammarth-port");
            assert_eq!(slugify("Ghar El Melh"), "ghar-el-melh");
        }

        #[test]
        fn test_slugify_accents_and_punctuation() {
            assert_eq!(slugify("Kélibia"), "kelibia");
            assert_eq!(slugify("  Sidi--Bou  Saïd!! "), "sidi-bou-said");
            assert_eq!(slugify("El-Haouaria (Cap Bon)"), "el-haouaria-cap-bon");
        }

        #[test]
        fn test_slugify_empty() {
            assert_eq!(slugify(""), "");
            assert_eq!(slugify("---"), "");
        }
    }
}

/// Local-time helpers for hourly forecast axes.
pub mod hours {
    use anyhow::anyhow;
    use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Timelike};
    use chrono_tz::Tz;

    /// Timestamp format used by the forecast providers: "YYYY-MM-DDTHH:MM"
    pub const LOCAL_HOUR_FORMAT: &str = "%Y-%m-%dT%H:%M";

    /// Parse a local timestamp, with or without seconds or a UTC offset.
    ///
    /// An offset, when present, is dropped: the value is already local time.
    pub fn parse_local(s: &str) -> anyhow::Result<NaiveDateTime> {
        let s = s.trim();
        if let Ok(t) = NaiveDateTime::parse_from_str(s, LOCAL_HOUR_FORMAT) {
            return Ok(t);
        }
        if let Ok(t) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
            return Ok(t);
        }
        Ok(chrono::DateTime::parse_from_rfc3339(s)?.naive_local())
    }

    /// Resolve an IANA timezone name such as "Africa/Tunis".
    pub fn parse_timezone(name: &str) -> anyhow::Result<Tz> {
        name.trim()
            .parse::<Tz>()
            .map_err(|e| anyhow!("invalid timezone '{name}': {e}"))
    }

    /// Parse a requested start time as an instant.
    ///
    /// A timestamp with a UTC offset names its own instant; one without is
    /// local time in `tz`.
    pub fn parse_start(s: &str, tz: &Tz) -> anyhow::Result<DateTime<Tz>> {
        let s = s.trim();
        let aware = DateTime::parse_from_rfc3339(s)
            .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M%:z"));
        if let Ok(aware) = aware {
            return Ok(aware.with_timezone(tz));
        }
        let naive = parse_local(s)?;
        tz.from_local_datetime(&naive)
            .earliest()
            .ok_or_else(|| anyhow!("{s} does not exist in {tz}"))
    }

    /// Format a local timestamp as ISO-8601, attaching the offset when known.
    pub fn format_local(t: &NaiveDateTime, offset: Option<FixedOffset>) -> String {
        match offset.and_then(|o| o.from_local_datetime(t).single()) {
            Some(aware) => aware.format("%Y-%m-%dT%H:%M:%S%:z").to_string(),
            None => t.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }

    /// Truncate a timestamp to the start of its hour.
    pub fn floor_hour(t: &NaiveDateTime) -> NaiveDateTime {
        t.date()
            .and_hms_opt(t.hour(), 0, 0)
            .unwrap_or(*t)
    }

    /// True if every timestamp's hour-of-day lies in `[start, end)`.
    pub fn all_within_hours<'a, I>(times: I, start: u32, end: u32) -> bool
    where
        I: IntoIterator<Item = &'a NaiveDateTime>,
    {
        times
            .into_iter()
            .all(|t| (start..end).contains(&t.hour()))
    }

}
