//! Go/No-Go engine for day excursions between a home port and a destination.
//!
//! The engine is pure: it reads two [`fable_core::series::HourlySeries`] and a
//! [`fable_core::rules::RuleSet`] and produces windows. Missing data never
//! errors; it fails the affected hours instead.

pub mod classify;
pub mod confidence;
pub mod detect;
pub mod diagnostics;
pub mod metrics;

#[cfg(test)]
pub(crate) mod testing;

pub use classify::{classify, classify_after, Phase, Reason, Verdict};
pub use confidence::Confidence;
pub use detect::{detect, detect_destination, Category, DestinationWindows, Window};
