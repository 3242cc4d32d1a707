use std::fmt;

use quick_xml::events::Event;

use super::error::ParsedNameOrBytes;

/// short description of an xml event for error messages
#[derive(Debug)]
pub(crate) struct EventSummary {
    name: Option<ParsedNameOrBytes>,
    e_type: &'static str,
}

impl fmt::Display for EventSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "element {name} with type {}", self.e_type),
            None => write!(f, "unnamed element with type {}", self.e_type),
        }
    }
}

impl EventSummary {
    pub(crate) fn new(e: &Event) -> Self {
        let name = match e {
            Event::Start(s) | Event::Empty(s) => Some(ParsedNameOrBytes::from(s.name())),
            Event::End(e) => Some(ParsedNameOrBytes::from(e.name())),
            _ => None,
        };

        Self {
            name,
            e_type: event_type(e),
        }
    }
}

fn event_type(event: &Event) -> &'static str {
    match event {
        Event::Start(_) => "start",
        Event::End(_) => "end",
        Event::Empty(_) => "empty",
        Event::Text(_) => "text",
        Event::Comment(_) => "comment",
        Event::CData(_) => "cdata",
        Event::Decl(_) => "decl",
        Event::PI(_) => "pi",
        Event::DocType(_) => "doctype",
        Event::Eof => "eof",
    }
}
