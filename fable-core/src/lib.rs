pub mod error;
pub mod forecast;
pub mod hour_range;
pub mod rules;
pub mod sector;
pub mod series;
pub mod site;
pub mod spot;
