//! ICS parsing using the icalendar crate's parser.

use crate::calendar::{Calendar, Component, Parameter, Property};
use crate::error::{InviteError, InviteResult};
use crate::event::Event;
use icalendar::parser::{self, read_calendar, unfold};

/// Parse a complete calendar document, keeping every component and
/// calendar-level property.
///
/// Some mailers concatenate several VCALENDAR objects into one attachment.
/// Components of every object are kept; calendar-level properties come from
/// the first one.
pub fn parse_calendar(content: &[u8]) -> InviteResult<Calendar> {
    let text = std::str::from_utf8(content)
        .map_err(|e| InviteError::IcsParse(format!("document is not valid UTF-8: {e}")))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let head = text.trim_start();
    if head.is_empty() {
        return Err(InviteError::IcsParse("document is empty".into()));
    }
    if !head
        .get(..15)
        .is_some_and(|begin| begin.eq_ignore_ascii_case("BEGIN:VCALENDAR"))
    {
        return Err(InviteError::IcsParse(
            "document does not start with BEGIN:VCALENDAR".into(),
        ));
    }

    let unfolded = unfold(text);
    let mut result = Calendar {
        properties: Vec::new(),
        components: Vec::new(),
    };

    for (position, root) in split_roots(&unfolded).into_iter().enumerate() {
        let calendar = read_calendar(root).map_err(|e| InviteError::IcsParse(e.to_string()))?;
        if position == 0 {
            result.properties = calendar.properties.iter().map(to_property).collect();
        }
        result
            .components
            .extend(calendar.components.iter().map(to_component));
    }

    Ok(result)
}

/// Split unfolded text before every `BEGIN:VCALENDAR` line after the first.
fn split_roots(text: &str) -> Vec<&str> {
    let mut roots = Vec::new();
    let mut start = 0;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let is_begin = line.trim().eq_ignore_ascii_case("BEGIN:VCALENDAR");
        if is_begin && !text[start..offset].trim().is_empty() {
            roots.push(&text[start..offset]);
            start = offset;
        }
        offset += line.len();
    }
    roots.push(&text[start..]);

    roots
}

/// Parse an invite document and return the VEVENTs found anywhere in it.
pub fn parse_events(content: &[u8]) -> InviteResult<Vec<Event>> {
    Ok(parse_calendar(content)?.into_events())
}

fn to_component(component: &parser::Component) -> Component {
    Component {
        name: component.name.to_string(),
        properties: component.properties.iter().map(to_property).collect(),
        components: component.components.iter().map(to_component).collect(),
    }
}

fn to_property(prop: &parser::Property) -> Property {
    let params = prop
        .params
        .iter()
        .map(|p| Parameter {
            key: p.key.to_string(),
            value: p.val.as_ref().map(|v| v.to_string()),
        })
        .collect();

    Property {
        name: prop.name.to_string(),
        params,
        value: prop.val.to_string(),
    }
}
