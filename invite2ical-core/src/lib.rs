//! Core types for invite2ical.
//!
//! This crate provides everything that does not talk to a mail server:
//! - `calendar` and `event`, the verbatim iCalendar document model
//! - `ics` for reading and writing .ics documents
//! - `merge`, which folds invite documents into a persisted calendar
//! - `config` for the TOML configuration file

pub mod calendar;
pub mod config;
pub mod error;
pub mod event;
pub mod ics;
pub mod merge;

pub use calendar::Calendar;
pub use error::{InviteError, InviteResult};
pub use event::Event;
pub use merge::{MergeOptions, MergeReport, merge};
