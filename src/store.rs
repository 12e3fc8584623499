//! Reading and writing the persisted calendar file.

use std::io::{ErrorKind, Write};
use std::path::Path;

use anyhow::{Context, Result};
use invite2ical_core::Calendar;
use invite2ical_core::ics::{generate_ics, parse_calendar};
use tempfile::NamedTempFile;

/// Load the calendar at `path`, or a fresh one when the file does not exist
/// or is blank.
pub fn load(path: &Path) -> Result<Calendar> {
    let content = match std::fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Calendar::new()),
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to read calendar file at {}", path.display()));
        }
    };

    if content.iter().all(u8::is_ascii_whitespace) {
        return Ok(Calendar::new());
    }

    parse_calendar(&content)
        .with_context(|| format!("Failed to parse calendar file at {}", path.display()))
}

/// Replace the file at `path` with the serialized calendar. The content is
/// written to a temporary file next to it and renamed into place.
pub fn save(path: &Path, calendar: &Calendar) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;

    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    temp.write_all(generate_ics(calendar).as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to write calendar file at {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use invite2ical_core::calendar::{Component, Property};

    #[test]
    fn test_load_missing_file_gives_empty_calendar() {
        let dir = tempfile::tempdir().unwrap();
        let cal = load(&dir.path().join("absent.ics")).unwrap();
        assert_eq!(cal, Calendar::new());
    }

    #[test]
    fn test_load_blank_file_gives_empty_calendar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.ics");
        std::fs::write(&path, "\n").unwrap();
        assert_eq!(load(&path).unwrap(), Calendar::new());
    }

    #[test]
    fn test_load_corrupt_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.ics");
        std::fs::write(&path, "definitely not ics").unwrap();
        assert!(load(&path).is_err());
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("invites.ics");

        let mut cal = Calendar::new();
        let mut tz = Component::new("VTIMEZONE");
        tz.properties.push(Property::new("TZID", "Europe/Berlin"));
        cal.components.push(tz);

        save(&path, &cal).unwrap();
        assert_eq!(load(&path).unwrap(), cal);

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("TZID:Europe/Berlin\r\n"));
    }

    #[test]
    fn test_save_overwrites_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invites.ics");
        std::fs::write(&path, "old content that is much longer than the new calendar ".repeat(20))
            .unwrap();

        save(&path, &Calendar::new()).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, generate_ics(&Calendar::new()));
    }
}
