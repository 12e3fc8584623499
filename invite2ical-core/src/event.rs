//! Incoming invite events and their redaction.

use std::ops::Deref;

use crate::calendar::Component;

/// A VEVENT taken out of an incoming invite document.
///
/// Only the merge engine mutates events: it rewrites the summary and strips
/// organizer and attendee details before the event enters the calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    component: Component,
}

impl From<Component> for Event {
    fn from(component: Component) -> Self {
        Event { component }
    }
}

impl Deref for Event {
    type Target = Component;

    fn deref(&self) -> &Component {
        &self.component
    }
}

impl Event {
    pub fn set_summary(&mut self, summary: &str) {
        self.component.set_prop("SUMMARY", summary);
    }

    pub fn clear_organizer(&mut self) {
        self.component.remove_props("ORGANIZER");
    }

    pub fn clear_attendees(&mut self) {
        self.component.remove_props("ATTENDEE");
    }

    pub fn into_component(self) -> Component {
        self.component
    }
}
