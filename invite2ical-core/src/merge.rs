//! Merging of invite documents into the persisted calendar.
//!
//! Each logical event (identified by UID) appears at most once in the merged
//! calendar. An incoming version replaces the stored one only when its
//! LAST-MODIFIED text sorts strictly after the stored text; the comparison is
//! on the raw string, which matches real time for the compact UTC form
//! (`20240101T000000Z`) used by mail clients.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use crate::calendar::Calendar;
use crate::error::{InviteError, InviteResult};
use crate::event::Event;
use crate::ics::parse_events;

/// How incoming events are rewritten before they enter the calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    pub replacement_summary: String,
    pub keep_organizer: bool,
    pub keep_attendee: bool,
}

impl MergeOptions {
    pub fn new(replacement_summary: impl Into<String>) -> Self {
        MergeOptions {
            replacement_summary: replacement_summary.into(),
            keep_organizer: false,
            keep_attendee: false,
        }
    }

    fn redact(&self, event: &mut Event) {
        event.set_summary(&self.replacement_summary);
        if !self.keep_organizer {
            event.clear_organizer();
        }
        if !self.keep_attendee {
            event.clear_attendees();
        }
    }
}

/// Counters describing what a merge did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    pub documents: usize,
    pub failed_documents: usize,
    pub added: usize,
    pub replaced: usize,
    /// Incoming versions that were not newer than the stored one.
    pub discarded: usize,
    /// Incoming events without a UID.
    pub skipped: usize,
}

impl MergeReport {
    pub fn modified_calendar(&self) -> bool {
        self.added > 0 || self.replaced > 0
    }
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} document(s) ({} unparseable): +{} added, ~{} replaced, {} discarded, {} skipped",
            self.documents,
            self.failed_documents,
            self.added,
            self.replaced,
            self.discarded,
            self.skipped
        )
    }
}

/// Fold `documents` into `calendar`, in order.
///
/// Unparseable documents are skipped. The only error is a calendar that
/// already holds two events with the same UID.
pub fn merge<D: AsRef<[u8]>>(
    calendar: &mut Calendar,
    documents: &[D],
    options: &MergeOptions,
) -> InviteResult<MergeReport> {
    let mut index = uid_index(calendar)?;
    let mut report = MergeReport::default();

    for (position, document) in documents.iter().enumerate() {
        report.documents += 1;

        let events = match parse_events(document.as_ref()) {
            Ok(events) => events,
            Err(e) => {
                warn!(document = position, error = %e, "Skipping unparseable calendar document");
                report.failed_documents += 1;
                continue;
            }
        };

        for mut event in events {
            options.redact(&mut event);

            let Some(uid) = event.uid().map(str::to_owned) else {
                warn!(document = position, "Skipping event without UID");
                report.skipped += 1;
                continue;
            };
            let last_modified = event.last_modified().to_owned();

            match index.get(&uid) {
                None => {
                    debug!(%uid, %last_modified, "Adding event");
                    calendar.push_event(event);
                    index.insert(uid, last_modified);
                    report.added += 1;
                }
                Some(stored) if last_modified.as_str() > stored.as_str() => {
                    debug!(%uid, %stored, %last_modified, "Replacing event with newer version");
                    let removed = calendar.remove_event(&uid);
                    debug_assert_eq!(removed, 1, "UID index out of sync for {uid}");
                    calendar.push_event(event);
                    index.insert(uid, last_modified);
                    report.replaced += 1;
                }
                Some(stored) => {
                    debug!(%uid, %stored, %last_modified, "Discarding event that is not newer");
                    report.discarded += 1;
                }
            }
        }
    }

    Ok(report)
}

/// Map every UID in `calendar` to its LAST-MODIFIED text.
fn uid_index(calendar: &Calendar) -> InviteResult<HashMap<String, String>> {
    let mut index = HashMap::new();

    for event in calendar.events() {
        let Some(uid) = event.uid() else {
            continue;
        };
        if index
            .insert(uid.to_owned(), event.last_modified().to_owned())
            .is_some()
        {
            return Err(InviteError::DuplicateUid(uid.to_owned()));
        }
    }

    Ok(index)
}
