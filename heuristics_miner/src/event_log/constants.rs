/// Common identifying field for event identities (i.e., activities)
///
/// _Note_: While the concept XES extension is the de-facto standard for identifying activity names,
/// some XES files might not use `concept:name` or have events without a `concept:name` attribute.
pub const ACTIVITY_NAME: &str = "concept:name";
/// Lifecycle transition of an event (XES lifecycle extension)
///
/// Events without this attribute are treated as [`COMPLETE_LIFECYCLE`] events.
pub const LIFECYCLE_TRANSITION: &str = "lifecycle:transition";
/// Timestamp of an event (XES time extension)
pub const TIMESTAMP: &str = "time:timestamp";
/// Lifecycle value marking the beginning of an activity instance
pub const START_LIFECYCLE: &str = "start";
/// Lifecycle value marking the end of an activity instance
pub const COMPLETE_LIFECYCLE: &str = "complete";
/// Activity name used for events that carry no usable [`ACTIVITY_NAME`]
pub const NO_ACTIVITY: &str = "No Activity";
