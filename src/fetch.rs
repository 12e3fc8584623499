//! Invite attachments from an IMAP mailbox.

use std::net::TcpStream;

use anyhow::{Context, Result};
use invite2ical_core::config::EmailSettings;
use mail_parser::{Message, MessageParser, MimeHeaders, PartType};
use native_tls::{TlsConnector, TlsStream};
use tracing::{debug, warn};

/// IMAP sequence number of a message in the selected mailbox.
pub type MessageId = u32;

/// The decoded payload of one attachment and the message it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub message: MessageId,
    pub content: Vec<u8>,
}

/// Where invite documents come from.
pub trait AttachmentSource {
    /// Scan the newest `scan_count` messages of `mailbox`, newest first, and
    /// return every attachment of multipart mail sent by `sender`.
    fn fetch_attachments(
        &mut self,
        mailbox: &str,
        sender: &str,
        scan_count: u32,
    ) -> Result<Vec<Attachment>>;

    /// Flag messages as read. Best-effort: failures are logged, and the
    /// number of messages actually flagged is returned.
    fn mark_seen(&mut self, messages: &[MessageId]) -> usize;
}

pub struct ImapSource {
    session: imap::Session<TlsStream<TcpStream>>,
}

impl ImapSource {
    pub fn connect(email: &EmailSettings) -> Result<Self> {
        let tls = TlsConnector::builder()
            .build()
            .context("Failed to set up TLS")?;

        let client = imap::connect((email.server.as_str(), email.port), &email.server, &tls)
            .with_context(|| format!("Failed to connect to {}:{}", email.server, email.port))?;

        let session = client
            .login(&email.username, &email.password)
            .map_err(|(e, _client)| e)
            .with_context(|| format!("Login to {} as {} failed", email.server, email.username))?;

        debug!(server = %email.server, "Logged in");
        Ok(ImapSource { session })
    }

    pub fn logout(mut self) {
        if let Err(e) = self.session.logout() {
            warn!(error = %e, "IMAP logout failed");
        }
    }
}

impl AttachmentSource for ImapSource {
    fn fetch_attachments(
        &mut self,
        mailbox: &str,
        sender: &str,
        scan_count: u32,
    ) -> Result<Vec<Attachment>> {
        let selected = self
            .session
            .select(mailbox)
            .with_context(|| format!("Failed to select mailbox '{}'", mailbox))?;

        let mut attachments = Vec::new();

        for seq in scan_range(selected.exists, scan_count) {
            // BODY.PEEK leaves \Seen alone until the calendar has been saved
            let fetched = match self.session.fetch(seq.to_string(), "BODY.PEEK[]") {
                Ok(fetched) => fetched,
                Err(e) if is_transport_error(&e) => {
                    return Err(e).with_context(|| {
                        format!("Lost connection while fetching message {}", seq)
                    });
                }
                Err(e) => {
                    warn!(seq, error = %e, "Failed to fetch message");
                    continue;
                }
            };

            for message in fetched.iter() {
                let Some(body) = message.body() else {
                    continue;
                };
                for content in extract_attachments(body, sender) {
                    attachments.push(Attachment {
                        message: seq,
                        content,
                    });
                }
            }
        }

        Ok(attachments)
    }

    fn mark_seen(&mut self, messages: &[MessageId]) -> usize {
        let mut flagged = 0;

        for seq in messages {
            match self.session.store(seq.to_string(), "+FLAGS (\\Seen)") {
                Ok(_) => flagged += 1,
                Err(e) => warn!(seq, error = %e, "Failed to mark message as read"),
            }
        }

        flagged
    }
}

/// Errors after which the session is unusable. Anything else (a `NO`/`BAD`
/// for one message, an unparseable response) only costs that message.
fn is_transport_error(error: &imap::Error) -> bool {
    matches!(
        error,
        imap::Error::Io(_)
            | imap::Error::Tls(_)
            | imap::Error::TlsHandshake(_)
            | imap::Error::ConnectionLost
    )
}

/// Sequence numbers of the newest `scan_count` messages, newest first.
fn scan_range(exists: u32, scan_count: u32) -> impl Iterator<Item = MessageId> {
    let oldest = exists.saturating_sub(scan_count) + 1;
    (oldest..=exists).rev()
}

/// Decoded attachments of a raw RFC 822 message, provided it is multipart
/// and was sent by `sender`.
pub fn extract_attachments(raw: &[u8], sender: &str) -> Vec<Vec<u8>> {
    let Some(message) = MessageParser::default().parse(raw) else {
        return Vec::new();
    };

    if !is_multipart(&message) || !sent_by(&message, sender) {
        return Vec::new();
    }

    message
        .parts
        .iter()
        .filter(|part| {
            part.content_disposition()
                .is_some_and(|disposition| disposition.is_attachment())
        })
        .map(|part| part.contents().to_vec())
        .collect()
}

fn is_multipart(message: &Message) -> bool {
    matches!(message.root_part().body, PartType::Multipart(_))
}

/// `sender` may be a bare address (compared case-insensitively) or the full
/// decoded header form `Name <address>`.
fn sent_by(message: &Message, sender: &str) -> bool {
    let Some(from) = message.from().and_then(|address| address.first()) else {
        return false;
    };
    let sender = sender.trim();
    let address = from.address().unwrap_or_default();

    if address.eq_ignore_ascii_case(sender) {
        return true;
    }

    from.name()
        .is_some_and(|name| format!("{} <{}>", name, address) == sender)
}
