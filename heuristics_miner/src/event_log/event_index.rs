use std::collections::HashMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::constants::{COMPLETE_LIFECYCLE, START_LIFECYCLE};

///
/// Lifecycle type of a [`LogEvent`]
///
/// Only [`LifecycleType::Start`] and [`LifecycleType::Complete`] take part in mining;
/// all other lifecycle transitions (e.g., `schedule`) are indexed but otherwise ignored.
///
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LifecycleType {
    /// Activity instance was started
    Start,
    /// Activity instance was completed
    Complete,
    /// Any other lifecycle transition (lowercased)
    Other(String),
}

impl LifecycleType {
    /// Parse a lifecycle transition value (case-insensitive)
    pub fn parse(value: &str) -> Self {
        let value = value.trim().to_lowercase();
        match value.as_str() {
            START_LIFECYCLE => LifecycleType::Start,
            COMPLETE_LIFECYCLE => LifecycleType::Complete,
            _ => LifecycleType::Other(value),
        }
    }

    /// Lifecycle transition as string
    pub fn as_str(&self) -> &str {
        match self {
            LifecycleType::Start => START_LIFECYCLE,
            LifecycleType::Complete => COMPLETE_LIFECYCLE,
            LifecycleType::Other(s) => s,
        }
    }
}

impl Display for LifecycleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for LifecycleType {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

///
/// A pair of activity and lifecycle type, observed in an event log
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Activity name
    pub activity: String,
    /// Dense id of the activity (transition id)
    pub transition: usize,
    /// Lifecycle type
    pub lifecycle: LifecycleType,
    /// Number of occurrences of this event in the whole log
    pub occurrences: u64,
}

impl Display for LogEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.activity, self.lifecycle)
    }
}

///
/// Index of all activities (transitions) and [`LogEvent`]s of an event log
///
/// Both get dense ids in order of their first appearance.
/// Serializes as the list of [`LogEvent`]s; the lookup tables are rebuilt on deserialization.
///
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<LogEvent>", into = "Vec<LogEvent>")]
pub struct EventIndex {
    activities: Vec<String>,
    activity_ids: HashMap<String, usize>,
    events: Vec<LogEvent>,
    event_ids: HashMap<(usize, LifecycleType), usize>,
    start_events: Vec<Option<usize>>,
    complete_events: Vec<Option<usize>>,
}

impl EventIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the id of the `(activity, lifecycle)` pair, inserting it (with zero occurrences) if not yet present
    pub fn insert(&mut self, activity: &str, lifecycle: LifecycleType) -> usize {
        let transition = match self.activity_ids.get(activity) {
            Some(t) => *t,
            None => {
                let t = self.activities.len();
                self.activities.push(activity.to_string());
                self.activity_ids.insert(activity.to_string(), t);
                self.start_events.push(None);
                self.complete_events.push(None);
                t
            }
        };
        if let Some(id) = self.event_ids.get(&(transition, lifecycle.clone())) {
            return *id;
        }
        let id = self.events.len();
        match lifecycle {
            LifecycleType::Start => self.start_events[transition] = Some(id),
            LifecycleType::Complete => self.complete_events[transition] = Some(id),
            LifecycleType::Other(_) => {}
        }
        self.event_ids.insert((transition, lifecycle.clone()), id);
        self.events.push(LogEvent {
            activity: activity.to_string(),
            transition,
            lifecycle,
            occurrences: 0,
        });
        id
    }

    /// Increment the occurrence count of an event
    pub fn record_occurrence(&mut self, event: usize) {
        self.events[event].occurrences += 1;
    }

    /// Number of distinct events (`E`)
    pub fn num_events(&self) -> usize {
        self.events.len()
    }

    /// Number of distinct activities (`T`)
    pub fn num_transitions(&self) -> usize {
        self.activities.len()
    }

    /// Event with the given id
    pub fn event(&self, event: usize) -> &LogEvent {
        &self.events[event]
    }

    /// All events, ordered by id
    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    /// All activity names, ordered by transition id
    pub fn activities(&self) -> &[String] {
        &self.activities
    }

    /// Transition id of an activity name
    pub fn transition_id(&self, activity: &str) -> Option<usize> {
        self.activity_ids.get(activity).copied()
    }

    /// Transition id of an event
    pub fn transition_of(&self, event: usize) -> usize {
        self.events[event].transition
    }

    /// Event id of the given activity/lifecycle pair
    pub fn event_of(&self, activity: &str, lifecycle: &LifecycleType) -> Option<usize> {
        let transition = self.transition_id(activity)?;
        self.event_ids.get(&(transition, lifecycle.clone())).copied()
    }

    /// Id of the start event of a transition (if observed)
    pub fn start_event_of(&self, transition: usize) -> Option<usize> {
        self.start_events.get(transition).copied().flatten()
    }

    /// Id of the complete event of a transition (if observed)
    pub fn complete_event_of(&self, transition: usize) -> Option<usize> {
        self.complete_events.get(transition).copied().flatten()
    }

    /// Occurrence count of an event
    pub fn occurrences(&self, event: usize) -> u64 {
        self.events[event].occurrences
    }

    /// Summed occurrences of all events
    pub fn total_occurrences(&self) -> u64 {
        self.events.iter().map(|e| e.occurrences).sum()
    }

    /// Whether both events belong to the same activity
    pub fn same_activity(&self, a: usize, b: usize) -> bool {
        self.events[a].transition == self.events[b].transition
    }

    /// Whether the event is a start event
    pub fn is_start(&self, event: usize) -> bool {
        self.events[event].lifecycle == LifecycleType::Start
    }

    /// Whether the event is a complete event
    pub fn is_complete(&self, event: usize) -> bool {
        self.events[event].lifecycle == LifecycleType::Complete
    }
}

impl From<Vec<LogEvent>> for EventIndex {
    fn from(events: Vec<LogEvent>) -> Self {
        let mut index = EventIndex::new();
        for e in events {
            let id = index.insert(&e.activity, e.lifecycle);
            index.events[id].occurrences = e.occurrences;
        }
        index
    }
}

impl From<EventIndex> for Vec<LogEvent> {
    fn from(index: EventIndex) -> Self {
        index.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_follow_first_appearance() {
        let mut index = EventIndex::new();
        let a_start = index.insert("a", LifecycleType::Start);
        let b_complete = index.insert("b", LifecycleType::Complete);
        let a_complete = index.insert("a", LifecycleType::Complete);
        assert_eq!((a_start, b_complete, a_complete), (0, 1, 2));
        assert_eq!(index.insert("a", LifecycleType::Start), 0);
        assert_eq!(index.num_events(), 3);
        assert_eq!(index.num_transitions(), 2);
        assert_eq!(index.transition_of(a_complete), 0);
        assert_eq!(index.start_event_of(0), Some(0));
        assert_eq!(index.complete_event_of(0), Some(2));
        assert_eq!(index.start_event_of(1), None);
        assert!(index.same_activity(a_start, a_complete));
        assert!(!index.same_activity(a_start, b_complete));
    }

    #[test]
    fn lifecycle_parsing_is_case_insensitive() {
        assert_eq!(LifecycleType::parse("START"), LifecycleType::Start);
        assert_eq!(LifecycleType::parse(" Complete"), LifecycleType::Complete);
        assert_eq!(
            LifecycleType::parse("Schedule"),
            LifecycleType::Other("schedule".into())
        );
    }

    #[test]
    fn serialization_rebuilds_lookups() {
        let mut index = EventIndex::new();
        let e = index.insert("a", LifecycleType::Start);
        index.record_occurrence(e);
        index.insert("a", LifecycleType::Complete);
        let json = serde_json::to_string(&index).unwrap();
        let index2: EventIndex = serde_json::from_str(&json).unwrap();
        assert_eq!(index, index2);
        assert_eq!(index2.event_of("a", &LifecycleType::Complete), Some(1));
        assert_eq!(index2.occurrences(0), 1);
    }
}
