//! Calendar gating for scheduled scans
//!
//! The gate decides whether today is a permitted run day; the predicates
//! hold the small pieces of date arithmetic the tier triggers need. All of
//! it is pure and takes "now" as an argument.

mod gate;
mod predicates;
mod zone;

pub use gate::{CalendarGate, SkipDecision};
pub use predicates::{advance_biweekly, in_dormant_window, is_first_week_of_month};
pub use zone::OperativeZone;
