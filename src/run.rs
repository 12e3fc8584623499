//! One pass of the pipeline: fetch, merge, persist, report.

use anyhow::{Context, Result};
use invite2ical_core::config::Settings;
use invite2ical_core::ics::generate_ics;
use invite2ical_core::merge;
use tracing::{debug, info, warn};

use crate::fetch::{AttachmentSource, MessageId};
use crate::fingerprint::Fingerprint;
use crate::store;

pub const EXIT_UNCHANGED: u8 = 0;
pub const EXIT_CHANGED: u8 = 1;
pub const EXIT_FAILURE: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Unchanged,
    Changed,
}

impl RunOutcome {
    fn compare(before: &Fingerprint, after: &Fingerprint) -> Self {
        debug!(%before, %after, "Calendar fingerprints");
        if before == after {
            RunOutcome::Unchanged
        } else {
            RunOutcome::Changed
        }
    }

    pub fn exit_code(self) -> u8 {
        match self {
            RunOutcome::Unchanged => EXIT_UNCHANGED,
            RunOutcome::Changed => EXIT_CHANGED,
        }
    }
}

/// Merge every invite `source` yields into the configured calendar file.
///
/// With `dry_run` the file is left alone and no mail is flagged; the outcome
/// then says whether the file would have changed.
pub fn run(
    settings: &Settings,
    source: &mut impl AttachmentSource,
    dry_run: bool,
) -> Result<RunOutcome> {
    let path = settings.ics_path();
    let before = Fingerprint::of_file(&path)?;
    let mut calendar = store::load(&path)?;

    let attachments = source.fetch_attachments(
        &settings.email.mailbox,
        &settings.email.sender,
        settings.email.fetch_number,
    )?;
    info!(
        attachments = attachments.len(),
        mailbox = %settings.email.mailbox,
        "Fetched invite attachments"
    );

    let documents: Vec<&[u8]> = attachments.iter().map(|a| a.content.as_slice()).collect();
    let report = merge(&mut calendar, &documents, &settings.merge_options())
        .with_context(|| format!("Failed to merge invites into {}", path.display()))?;
    info!(modified = report.modified_calendar(), "Merged {}", report);

    if dry_run {
        let would_be = Fingerprint::of_bytes(generate_ics(&calendar).as_bytes());
        return Ok(RunOutcome::compare(&before, &would_be));
    }

    store::save(&path, &calendar)?;

    let mut handled: Vec<MessageId> = attachments.iter().map(|a| a.message).collect();
    handled.dedup();
    let flagged = source.mark_seen(&handled);
    if flagged < handled.len() {
        warn!(
            flagged,
            total = handled.len(),
            "Some messages could not be marked as read"
        );
    }

    let after = Fingerprint::of_file(&path)?;
    Ok(RunOutcome::compare(&before, &after))
}
