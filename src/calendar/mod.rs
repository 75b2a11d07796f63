//! Exchange calendar
//!
//! Trading sessions, full-closure holidays, monthly OPEX resolution,
//! and weekday counting for year fractions.

pub mod holidays;
pub mod resolver;

pub use resolver::*;
