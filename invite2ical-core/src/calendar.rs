//! In-memory iCalendar document model.
//!
//! Components and properties are kept as read (names, parameters and
//! decoded values, TEXT escapes removed) so that anything the merge engine
//! does not touch is written back the way it came in.

use crate::event::Event;

pub const VEVENT: &str = "VEVENT";
pub const DEFAULT_PRODID: &str = "-//invite2ical//invite2ical//EN";

/// A property parameter such as `CN=Alice` or `TZID=Europe/Berlin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub key: String,
    pub value: Option<String>,
}

/// A single content line: `NAME;PARAM=VALUE:value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub params: Vec<Parameter>,
    pub value: String,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Property {
            name: name.into(),
            params: Vec::new(),
            value: value.into(),
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A `BEGIN:NAME` ... `END:NAME` block with its nested components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub properties: Vec<Property>,
    pub components: Vec<Component>,
}

impl Component {
    pub fn new(name: impl Into<String>) -> Self {
        Component {
            name: name.into(),
            properties: Vec::new(),
            components: Vec::new(),
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn find_prop(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.is(name))
    }

    /// Replace every occurrence of `name` with a single parameterless
    /// property, keeping the position of the first occurrence.
    pub fn set_prop(&mut self, name: &str, value: &str) {
        match self.properties.iter().position(|p| p.is(name)) {
            Some(idx) => {
                self.properties[idx] = Property::new(name, value);
                let mut seen_first = false;
                self.properties.retain(|p| {
                    if !p.is(name) {
                        return true;
                    }
                    let keep = !seen_first;
                    seen_first = true;
                    keep
                });
            }
            None => self.properties.push(Property::new(name, value)),
        }
    }

    /// Remove every occurrence of `name`, returning how many were dropped.
    pub fn remove_props(&mut self, name: &str) -> usize {
        let before = self.properties.len();
        self.properties.retain(|p| !p.is(name));
        before - self.properties.len()
    }

    pub fn uid(&self) -> Option<&str> {
        self.find_prop("UID").map(|p| p.value.trim())
    }

    /// Raw LAST-MODIFIED text, or the empty string when the property is absent.
    pub fn last_modified(&self) -> &str {
        self.find_prop("LAST-MODIFIED")
            .map(|p| p.value.trim())
            .unwrap_or("")
    }

    fn collect_events<'a>(&'a self, out: &mut Vec<&'a Component>) {
        if self.is(VEVENT) {
            out.push(self);
        }
        for child in &self.components {
            child.collect_events(out);
        }
    }

    fn into_events(self, out: &mut Vec<Component>) {
        if self.is(VEVENT) {
            out.push(self);
            return;
        }
        for child in self.components {
            child.into_events(out);
        }
    }
}

/// A whole VCALENDAR document: calendar-level properties plus every
/// subcomponent (events, time zones, anything else) in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calendar {
    pub properties: Vec<Property>,
    pub components: Vec<Component>,
}

impl Default for Calendar {
    fn default() -> Self {
        Self::new()
    }
}

impl Calendar {
    /// A fresh calendar carrying the two properties RFC 5545 requires.
    pub fn new() -> Self {
        Calendar {
            properties: vec![
                Property::new("VERSION", "2.0"),
                Property::new("PRODID", DEFAULT_PRODID),
            ],
            components: Vec::new(),
        }
    }

    /// Every VEVENT in the document, including nested ones, in document order.
    pub fn events(&self) -> Vec<&Component> {
        let mut events = Vec::new();
        for component in &self.components {
            component.collect_events(&mut events);
        }
        events
    }

    /// Consume the document, keeping only its VEVENTs. An event's own nested
    /// components (alarms) stay attached to it.
    pub fn into_events(self) -> Vec<Event> {
        let mut components = Vec::new();
        for component in self.components {
            component.into_events(&mut components);
        }
        components.into_iter().map(Event::from).collect()
    }

    pub fn push_event(&mut self, event: Event) {
        self.components.push(event.into_component());
    }

    /// Remove every event carrying `uid`, at any depth. Returns the number of
    /// events removed.
    pub fn remove_event(&mut self, uid: &str) -> usize {
        remove_events(&mut self.components, uid)
    }
}

fn remove_events(components: &mut Vec<Component>, uid: &str) -> usize {
    let before = components.len();
    components.retain(|c| !(c.is(VEVENT) && c.uid() == Some(uid)));
    let mut removed = before - components.len();
    for child in components.iter_mut() {
        removed += remove_events(&mut child.components, uid);
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(uid: &str) -> Component {
        let mut c = Component::new(VEVENT);
        c.properties.push(Property::new("UID", uid));
        c
    }

    #[test]
    fn test_new_calendar_has_version_and_prodid() {
        let cal = Calendar::new();
        assert_eq!(cal.properties[0], Property::new("VERSION", "2.0"));
        assert!(cal.properties.iter().any(|p| p.is("PRODID")));
        assert!(cal.events().is_empty());
    }

    #[test]
    fn test_set_prop_collapses_duplicates_in_place() {
        let mut c = event("E1");
        c.properties.push(Property::new("SUMMARY", "first"));
        c.properties.push(Property::new("LOCATION", "Room 1"));
        c.properties.push(Property::new("summary", "second"));

        c.set_prop("SUMMARY", "Busy");

        let names: Vec<_> = c.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["UID", "SUMMARY", "LOCATION"]);
        assert_eq!(c.find_prop("SUMMARY").unwrap().value, "Busy");
    }

    #[test]
    fn test_set_prop_appends_when_missing() {
        let mut c = event("E1");
        c.set_prop("SUMMARY", "Busy");
        assert_eq!(c.find_prop("summary").unwrap().value, "Busy");
    }

    #[test]
    fn test_last_modified_defaults_to_empty() {
        let mut c = event("E1");
        assert_eq!(c.last_modified(), "");
        c.properties
            .push(Property::new("LAST-MODIFIED", "20240101T000000Z"));
        assert_eq!(c.last_modified(), "20240101T000000Z");
    }

    #[test]
    fn test_events_walks_nested_components() {
        let mut wrapper = Component::new("X-WRAPPER");
        wrapper.components.push(event("nested"));
        let cal = Calendar {
            properties: vec![],
            components: vec![event("top"), Component::new("VTIMEZONE"), wrapper],
        };

        let uids: Vec<_> = cal.events().iter().filter_map(|e| e.uid()).collect();
        assert_eq!(uids, vec!["top", "nested"]);
    }

    #[test]
    fn test_remove_event_only_touches_matching_uid() {
        let mut cal = Calendar::new();
        cal.components.push(event("E1"));
        cal.components.push(Component::new("VTIMEZONE"));
        cal.components.push(event("E2"));

        assert_eq!(cal.remove_event("E1"), 1);
        assert_eq!(cal.remove_event("missing"), 0);

        let names: Vec<_> = cal.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["VTIMEZONE", "VEVENT"]);
        assert_eq!(cal.events()[0].uid(), Some("E2"));
    }
}
