use chrono::{serde::ts_milliseconds, DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::constants::{ACTIVITY_NAME, LIFECYCLE_TRANSITION, TIMESTAMP};

///
/// Value of an XES attribute
///
/// Only flat values are kept. Lists and containers are imported as [`AttributeValue::None`].
///
/// ```rust
/// use heuristics_miner::event_log::AttributeValue;
/// let v = AttributeValue::String("register".into());
///
/// assert_eq!(v.try_as_string().map(String::as_str), Some("register"));
/// assert!(v.try_as_date().is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "content")]
pub enum AttributeValue {
    /// String (or id) values
    String(String),
    /// Timestamps, serialized as milliseconds since the epoch
    #[serde(with = "ts_milliseconds")]
    Date(DateTime<Utc>),
    /// Integer values
    Int(i64),
    /// Float values
    Float(f64),
    /// Boolean values
    Boolean(bool),
    /// Values that could not be parsed or are not supported
    None(),
}

impl AttributeValue {
    /// Inner value of [`AttributeValue::String`]
    pub fn try_as_string(&self) -> Option<&String> {
        match self {
            AttributeValue::String(v) => Some(v),
            _ => None,
        }
    }

    /// Inner value of [`AttributeValue::Date`]
    pub fn try_as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            AttributeValue::Date(v) => Some(v),
            _ => None,
        }
    }
}

///
/// Key and value of an attribute
///
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attribute {
    /// Attribute key (e.g., `concept:name`)
    pub key: String,
    /// Attribute value
    pub value: AttributeValue,
}

impl Attribute {
    /// Create an attribute from its key and value
    pub fn new(key: String, value: AttributeValue) -> Self {
        Self { key, value }
    }
}

/// Attributes of a log, trace or event, in document order
pub type Attributes = Vec<Attribute>;

///
/// Adding and looking up attributes by key
///
pub trait XESEditableAttribute {
    /// Append an attribute (does not replace an attribute with the same key)
    fn add_attribute(&mut self, attr: Attribute);
    /// First attribute with the given key (linear lookup)
    fn get_by_key(&self, key: &str) -> Option<&Attribute>;
    /// Attribute with the given key, falling back to the global attributes of the log
    fn get_by_key_or_global<'a>(
        &'a self,
        key: &str,
        global_attrs: &'a Option<Attributes>,
    ) -> Option<&'a Attribute>;
}

impl XESEditableAttribute for Attributes {
    fn add_attribute(&mut self, attr: Attribute) {
        self.push(attr);
    }

    fn get_by_key(&self, key: &str) -> Option<&Attribute> {
        self.iter().find(|attr| attr.key == key)
    }

    fn get_by_key_or_global<'a>(
        &'a self,
        key: &str,
        global_attrs: &'a Option<Attributes>,
    ) -> Option<&'a Attribute> {
        self.get_by_key(key)
            .or_else(|| global_attrs.as_ref().and_then(|g| g.get_by_key(key)))
    }
}

///
/// A single event of a trace
///
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    /// Event attributes
    pub attributes: Attributes,
}

impl Event {
    /// Event with the given activity name ([`ACTIVITY_NAME`])
    pub fn new(activity: String) -> Self {
        let mut attributes = Attributes::with_capacity(3);
        attributes.add_attribute(Attribute::new(
            ACTIVITY_NAME.to_string(),
            AttributeValue::String(activity),
        ));
        Event { attributes }
    }

    /// Event with activity name, lifecycle transition and timestamp
    pub fn new_with_lifecycle(activity: String, lifecycle: &str, timestamp: DateTime<Utc>) -> Self {
        let mut ev = Self::new(activity);
        ev.attributes.add_attribute(Attribute::new(
            LIFECYCLE_TRANSITION.to_string(),
            AttributeValue::String(lifecycle.to_string()),
        ));
        ev.attributes.add_attribute(Attribute::new(
            TIMESTAMP.to_string(),
            AttributeValue::Date(timestamp),
        ));
        ev
    }
}

///
/// A case of the log: its attributes and the sequence of its events
///
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Trace {
    /// Trace attributes
    pub attributes: Attributes,
    /// Events in the order they were recorded
    pub events: Vec<Event>,
}

///
/// Event log as read from XES
///
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EventLog {
    /// Log attributes
    pub attributes: Attributes,
    /// Traces of the log
    pub traces: Vec<Trace>,
    /// Default trace attributes (`<global scope="trace">`)
    pub global_trace_attrs: Option<Attributes>,
    /// Default event attributes (`<global scope="event">`)
    pub global_event_attrs: Option<Attributes>,
}

impl EventLog {
    ///
    /// Attribute of an event, falling back to the global event attributes
    ///
    pub fn get_event_attribute<'a>(&'a self, event: &'a Event, key: &str) -> Option<&'a Attribute> {
        event
            .attributes
            .get_by_key_or_global(key, &self.global_event_attrs)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn global_event_attributes_are_used_as_fallback() {
        let mut log = EventLog {
            global_event_attrs: Some(vec![Attribute::new(
                LIFECYCLE_TRANSITION.to_string(),
                AttributeValue::String("complete".into()),
            )]),
            ..EventLog::default()
        };
        log.traces.push(Trace {
            attributes: Attributes::new(),
            events: vec![
                Event::new("a".into()),
                Event::new_with_lifecycle(
                    "b".into(),
                    "start",
                    Utc.timestamp_millis_opt(1_000).unwrap(),
                ),
            ],
        });
        let trace = &log.traces[0];
        let lifecycle = |e: &Event| {
            log.get_event_attribute(e, LIFECYCLE_TRANSITION)
                .and_then(|a| a.value.try_as_string())
                .cloned()
        };
        assert_eq!(lifecycle(&trace.events[0]), Some("complete".to_string()));
        assert_eq!(lifecycle(&trace.events[1]), Some("start".to_string()));
    }

    #[test]
    fn first_attribute_with_key_wins() {
        let mut attrs = Event::new("a".into()).attributes;
        attrs.add_attribute(Attribute::new(
            ACTIVITY_NAME.to_string(),
            AttributeValue::String("b".into()),
        ));
        assert_eq!(
            attrs.get_by_key(ACTIVITY_NAME).unwrap().value,
            AttributeValue::String("a".into())
        );
        assert!(attrs.get_by_key(TIMESTAMP).is_none());
    }
}
