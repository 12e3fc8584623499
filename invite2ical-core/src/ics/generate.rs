//! ICS file generation.
//!
//! Writes the document model back out with CRLF line endings, folding lines
//! longer than 75 octets as RFC 5545 requires. TEXT values are escaped with
//! the same value-type rules the icalendar parser uses to unescape them.

use std::str::FromStr;

use icalendar::ValueType;

use crate::calendar::{Calendar, Component, Property};

const MAX_LINE_OCTETS: usize = 75;

/// Properties the icalendar parser treats as TEXT when no `VALUE=` is given.
const TEXT_PROPERTIES: &[&str] = &[
    "CALSCALE",
    "METHOD",
    "PRODID",
    "VERSION",
    "CATEGORIES",
    "CLASS",
    "COMMENT",
    "DESCRIPTION",
    "LOCATION",
    "RESOURCES",
    "STATUS",
    "SUMMARY",
    "TRANSP",
    "TZID",
    "TZNAME",
    "CONTACT",
    "RELATED-TO",
    "UID",
    "ACTION",
    "REQUEST-STATUS",
];

/// Multi-valued TEXT properties: a bare comma separates values.
const TEXT_LIST_PROPERTIES: &[&str] = &["CATEGORIES", "RESOURCES"];

/// Generate .ics content for a whole calendar
pub fn generate_ics(calendar: &Calendar) -> String {
    let mut out = String::new();

    push_folded(&mut out, "BEGIN:VCALENDAR");
    for prop in &calendar.properties {
        write_property(&mut out, prop);
    }
    for component in &calendar.components {
        write_component(&mut out, component);
    }
    push_folded(&mut out, "END:VCALENDAR");

    out
}

fn write_component(out: &mut String, component: &Component) {
    push_folded(out, &format!("BEGIN:{}", component.name));
    for prop in &component.properties {
        write_property(out, prop);
    }
    for child in &component.components {
        write_component(out, child);
    }
    push_folded(out, &format!("END:{}", component.name));
}

fn write_property(out: &mut String, prop: &Property) {
    let mut line = prop.name.clone();

    for param in &prop.params {
        line.push(';');
        line.push_str(&param.key);
        if let Some(ref value) = param.value {
            line.push('=');
            push_param_value(&mut line, value);
        }
    }

    line.push(':');
    if is_text(prop) {
        push_escaped_text(&mut line, &prop.value, is_text_list(prop));
    } else {
        line.push_str(&prop.value);
    }
    push_folded(out, &line);
}

/// An explicit, recognised `VALUE=` wins; otherwise the property name decides.
/// Matching is case-sensitive, as in the parser.
fn is_text(prop: &Property) -> bool {
    let explicit = prop
        .params
        .iter()
        .find(|p| p.key == "VALUE")
        .and_then(|p| p.value.as_deref())
        .and_then(|value_type| ValueType::from_str(value_type).ok());

    match explicit {
        Some(value_type) => value_type == ValueType::Text,
        None => is_text_by_name(&prop.name),
    }
}

fn is_text_by_name(name: &str) -> bool {
    if name.chars().any(char::is_lowercase) {
        return false;
    }
    name.starts_with("X-") || TEXT_PROPERTIES.contains(&name)
}

fn is_text_list(prop: &Property) -> bool {
    TEXT_LIST_PROPERTIES.contains(&prop.name.as_str())
}

fn push_escaped_text(line: &mut String, value: &str, keep_commas: bool) {
    for ch in value.chars() {
        match ch {
            '\\' => line.push_str("\\\\"),
            ';' => line.push_str("\\;"),
            ',' if !keep_commas => line.push_str("\\,"),
            '\n' => line.push_str("\\n"),
            _ => line.push(ch),
        }
    }
}

/// Parameter values containing `:`, `;` or `,` must be quoted
fn push_param_value(line: &mut String, value: &str) {
    let already_quoted = value.len() >= 2 && value.starts_with('"') && value.ends_with('"');
    if !already_quoted && value.contains([':', ';', ',']) {
        line.push('"');
        line.push_str(value);
        line.push('"');
    } else {
        line.push_str(value);
    }
}

/// Append `line` followed by CRLF, inserting `CRLF SPACE` whenever the current
/// physical line would exceed the octet limit. Never splits a UTF-8 sequence.
fn push_folded(out: &mut String, line: &str) {
    let mut width = 0;

    for ch in line.chars() {
        let len = ch.len_utf8();
        if width + len > MAX_LINE_OCTETS {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(ch);
        width += len;
    }

    out.push_str("\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{Parameter, VEVENT};
    use crate::ics::parse_calendar;

    #[test]
    fn test_generate_empty_calendar() {
        let ics = generate_ics(&Calendar::new());
        assert!(ics.starts_with("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:"));
        assert!(ics.ends_with("END:VCALENDAR\r\n"));
    }

    #[test]
    fn test_long_lines_are_folded_at_75_octets() {
        let mut event = Component::new(VEVENT);
        event.properties.push(Property::new("DESCRIPTION", "x".repeat(200)));
        let mut cal = Calendar::new();
        cal.components.push(event);

        let ics = generate_ics(&cal);
        for line in ics.split("\r\n") {
            assert!(line.len() <= MAX_LINE_OCTETS, "line too long: {line:?}");
        }

        let reparsed = parse_calendar(ics.as_bytes()).expect("Should reparse");
        let description = reparsed.components[0].find_prop("DESCRIPTION").unwrap();
        assert_eq!(description.value, "x".repeat(200));
    }

    #[test]
    fn test_folding_respects_multibyte_characters() {
        let mut out = String::new();
        push_folded(&mut out, &"ä".repeat(60));
        for line in out.split("\r\n") {
            assert!(line.len() <= MAX_LINE_OCTETS);
        }
        assert_eq!(out.replace("\r\n ", "").trim_end(), "ä".repeat(60));
    }

    #[test]
    fn test_param_values_with_separators_are_quoted() {
        let mut prop = Property::new("ATTENDEE", "mailto:a@example.com");
        prop.params.push(Parameter {
            key: "CN".into(),
            value: Some("Doe, Jane".into()),
        });
        prop.params.push(Parameter {
            key: "RSVP".into(),
            value: Some("TRUE".into()),
        });

        let mut out = String::new();
        write_property(&mut out, &prop);
        assert_eq!(
            out,
            "ATTENDEE;CN=\"Doe, Jane\";RSVP=TRUE:mailto:a@example.com\r\n"
        );
    }

    #[test]
    fn test_generate_is_stable_across_reparse() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
X-WR-CALNAME:Invites\r\n\
BEGIN:VTIMEZONE\r\n\
TZID:Europe/Berlin\r\n\
END:VTIMEZONE\r\n\
BEGIN:VEVENT\r\n\
UID:E1\r\n\
LAST-MODIFIED:20240101T000000Z\r\n\
DTSTART;TZID=Europe/Berlin:20240110T100000\r\n\
SUMMARY:Busy\\; tentative\r\n\
LOCATION:Room 4\\, second floor\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let first = generate_ics(&parse_calendar(ics.as_bytes()).unwrap());
        let second = generate_ics(&parse_calendar(first.as_bytes()).unwrap());
        assert_eq!(first, second);
        assert_eq!(first, ics);
    }

    #[test]
    fn test_escaped_text_round_trips_byte_for_byte() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VTODO\r\n\
UID:T1\r\n\
DESCRIPTION:Line one\\nLine two\\, continued\\; see C:\\\\notes\r\n\
X-NOTE:a\\,b\r\n\
URL:https://example.com/a,b;c\r\n\
END:VTODO\r\n\
END:VCALENDAR\r\n";

        let cal = parse_calendar(ics.as_bytes()).expect("Should parse");
        let description = cal.components[0].find_prop("DESCRIPTION").unwrap();
        assert_eq!(description.value, "Line one\nLine two, continued; see C:\\notes");

        assert_eq!(generate_ics(&cal), ics);
    }

    #[test]
    fn test_text_values_are_escaped() {
        let mut out = String::new();
        write_property(&mut out, &Property::new("SUMMARY", "Busy, really; ok\nsoon"));
        assert_eq!(out, "SUMMARY:Busy\\, really\\; ok\\nsoon\r\n");
    }

    #[test]
    fn test_value_type_decides_escaping() {
        let mut out = String::new();
        write_property(&mut out, &Property::new("RRULE", "FREQ=WEEKLY;BYDAY=MO,TU"));
        assert_eq!(out, "RRULE:FREQ=WEEKLY;BYDAY=MO,TU\r\n");

        let mut uri = Property::new("X-LINK", "https://example.com/?a=1,2");
        uri.params.push(Parameter {
            key: "VALUE".into(),
            value: Some("URI".into()),
        });
        let mut out = String::new();
        write_property(&mut out, &uri);
        assert_eq!(out, "X-LINK;VALUE=URI:https://example.com/?a=1,2\r\n");

        let mut out = String::new();
        write_property(&mut out, &Property::new("CATEGORIES", "WORK,MEETING"));
        assert_eq!(out, "CATEGORIES:WORK,MEETING\r\n");
    }
}
