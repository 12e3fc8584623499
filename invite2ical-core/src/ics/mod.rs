//! ICS file generation and parsing.
//!
//! This module handles reading and writing .ics documents according to RFC 5545.

mod generate;
mod parse;

pub use generate::generate_ics;
pub use parse::{parse_calendar, parse_events};
