//! invite2ical configuration.
//!
//! The configuration file is TOML:
//!
//! ```toml
//! [invite2ical]
//! icsfile = "~/calendar/invites.ics"
//! summary = "Busy"
//!
//! [invite2ical.email]
//! username = "me@example.com"
//! password = "secret"
//! server = "imap.example.com"
//! sender = "calendar@example.com"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File, FileFormat};
use serde::Deserialize;

use crate::error::{InviteError, InviteResult};
use crate::merge::MergeOptions;

/// Overrides `invite2ical.email.password` when set.
pub const PASSWORD_ENV: &str = "INVITE2ICAL_PASSWORD";

const LOCAL_CONFIG_FILE: &str = "config.toml";

fn default_port() -> u16 {
    993
}

fn default_mailbox() -> String {
    "INBOX".to_string()
}

fn default_fetch_number() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub invite2ical: Settings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Calendar file that collects the merged events
    pub icsfile: PathBuf,

    /// Text that replaces every event's SUMMARY
    pub summary: String,

    #[serde(default)]
    pub keep_organizer: bool,

    #[serde(default)]
    pub keep_attendee: bool,

    pub email: EmailSettings,
}

#[derive(Clone, Deserialize)]
pub struct EmailSettings {
    pub username: String,
    pub password: String,
    pub server: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Only mail from this sender is scanned for invites
    pub sender: String,

    /// How many of the newest messages to scan
    #[serde(default = "default_fetch_number")]
    pub fetch_number: u32,

    #[serde(default = "default_mailbox")]
    pub mailbox: String,
}

impl fmt::Debug for EmailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailSettings")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("sender", &self.sender)
            .field("fetch_number", &self.fetch_number)
            .field("mailbox", &self.mailbox)
            .finish()
    }
}

impl AppConfig {
    /// Pick the configuration file: an explicit path wins, then
    /// `./config.toml`, then `~/.config/invite2ical/config.toml`.
    pub fn resolve_path(explicit: Option<&Path>) -> InviteResult<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Ok(local);
        }

        Self::config_path()
    }

    pub fn config_path() -> InviteResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| InviteError::Config("Could not determine config directory".into()))?
            .join("invite2ical");

        Ok(config_dir.join(LOCAL_CONFIG_FILE))
    }

    pub fn load(path: &Path) -> InviteResult<Self> {
        if !path.exists() {
            return Err(InviteError::Config(format!(
                "Config file not found at {}",
                path.display()
            )));
        }

        Self::from_builder(
            Config::builder().add_source(File::from(path).format(FileFormat::Toml)),
            std::env::var(PASSWORD_ENV).ok(),
        )
    }

    pub fn from_toml_str(content: &str) -> InviteResult<Self> {
        Self::from_builder(
            Config::builder().add_source(File::from_str(content, FileFormat::Toml)),
            None,
        )
    }

    fn from_builder(
        builder: ConfigBuilder<DefaultState>,
        password: Option<String>,
    ) -> InviteResult<Self> {
        let config: AppConfig = builder
            .set_override_option("invite2ical.email.password", password)
            .map_err(|e| InviteError::Config(e.to_string()))?
            .build()
            .map_err(|e| InviteError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| InviteError::Config(e.to_string()))?;

        config.invite2ical.validate()?;
        Ok(config)
    }
}

impl Settings {
    fn validate(&self) -> InviteResult<()> {
        let required = [
            ("invite2ical.summary", self.summary.as_str()),
            ("invite2ical.email.username", self.email.username.as_str()),
            ("invite2ical.email.server", self.email.server.as_str()),
            ("invite2ical.email.sender", self.email.sender.as_str()),
            ("invite2ical.email.mailbox", self.email.mailbox.as_str()),
        ];
        if let Some((key, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(InviteError::Config(format!("'{key}' must not be empty")));
        }

        if self.icsfile.as_os_str().is_empty() {
            return Err(InviteError::Config(
                "'invite2ical.icsfile' must not be empty".into(),
            ));
        }

        if self.email.fetch_number == 0 {
            return Err(InviteError::Config(
                "'invite2ical.email.fetch_number' must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Calendar file path with a leading `~` expanded.
    pub fn ics_path(&self) -> PathBuf {
        let full_path_str = shellexpand::tilde(&self.icsfile.to_string_lossy()).into_owned();
        PathBuf::from(full_path_str)
    }

    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            replacement_summary: self.summary.clone(),
            keep_organizer: self.keep_organizer,
            keep_attendee: self.keep_attendee,
        }
    }
}
