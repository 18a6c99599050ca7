use chrono::{NaiveDateTime, TimeDelta};
use std::mem::replace;

/// An hour iterator that yields each timestamp from the start (inclusive)
/// up to the end (exclusive), one hour apart.
#[derive(Clone, Eq, PartialEq, Copy, Debug)]
pub struct HourRange(pub NaiveDateTime, pub NaiveDateTime);

impl HourRange {
    /// The range covering `hours` hours from `start`.
    pub fn starting_at(start: NaiveDateTime, hours: u32) -> Self {
        HourRange(start, start + TimeDelta::hours(i64::from(hours)))
    }
}

impl Iterator for HourRange {
    type Item = NaiveDateTime;
    fn next(&mut self) -> Option<Self::Item> {
        if self.0 < self.1 {
            let next = self.0 + TimeDelta::hours(1);
            Some(replace(&mut self.0, next))
        } else {
            None
        }
    }
}
