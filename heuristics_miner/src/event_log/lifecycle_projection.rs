use serde::{Deserialize, Serialize};

use super::constants::{ACTIVITY_NAME, LIFECYCLE_TRANSITION, NO_ACTIVITY, TIMESTAMP};
use super::event_index::{EventIndex, LifecycleType};
use super::event_log_struct::EventLog;

///
/// A single event occurrence inside a projected trace
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Event id (see [`EventIndex`])
    pub event: usize,
    /// Timestamp in milliseconds since the unix epoch
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// Projection of an event log on activities, lifecycle transitions and timestamps
///
/// Activities are read from [`ACTIVITY_NAME`] (falling back to [`NO_ACTIVITY`]),
/// lifecycle transitions from [`LIFECYCLE_TRANSITION`] (falling back to `complete`),
/// and timestamps from [`TIMESTAMP`] (falling back to the previous timestamp of the trace, or `0`).
pub struct EventLogLifecycleProjection {
    /// Index of all observed activities and events
    pub index: EventIndex,
    /// Traces as sequences of event occurrences
    pub traces: Vec<Vec<TraceEntry>>,
}

impl EventLogLifecycleProjection {
    /// Number of traces
    pub fn trace_count(&self) -> usize {
        self.traces.len()
    }

    /// Build a projection directly from `(activity, lifecycle, timestamp in ms)` tuples
    ///
    /// ```rust
    /// use heuristics_miner::EventLogLifecycleProjection;
    /// let projection = EventLogLifecycleProjection::from_traces(vec![vec![
    ///     ("a", "start", 0),
    ///     ("a", "complete", 10),
    /// ]]);
    /// assert_eq!(projection.index.num_events(), 2);
    /// assert_eq!(projection.trace_count(), 1);
    /// ```
    pub fn from_traces<T, E, S, L>(traces: T) -> Self
    where
        T: IntoIterator<Item = E>,
        E: IntoIterator<Item = (S, L, i64)>,
        S: AsRef<str>,
        L: Into<LifecycleType>,
    {
        let mut index = EventIndex::new();
        let traces = traces
            .into_iter()
            .map(|trace| {
                trace
                    .into_iter()
                    .map(|(activity, lifecycle, timestamp_ms)| {
                        let event = index.insert(activity.as_ref(), lifecycle.into());
                        index.record_occurrence(event);
                        TraceEntry {
                            event,
                            timestamp_ms,
                        }
                    })
                    .collect()
            })
            .collect();
        Self { index, traces }
    }
}

impl From<&EventLog> for EventLogLifecycleProjection {
    fn from(log: &EventLog) -> Self {
        let mut index = EventIndex::new();
        let mut missing_timestamps = 0usize;
        let traces = log
            .traces
            .iter()
            .map(|t| {
                let mut last_timestamp = 0i64;
                t.events
                    .iter()
                    .map(|e| {
                        let activity = log
                            .get_event_attribute(e, ACTIVITY_NAME)
                            .and_then(|a| a.value.try_as_string())
                            .map(String::as_str)
                            .unwrap_or(NO_ACTIVITY);
                        let lifecycle = log
                            .get_event_attribute(e, LIFECYCLE_TRANSITION)
                            .and_then(|a| a.value.try_as_string())
                            .map(|s| LifecycleType::parse(s))
                            .unwrap_or(LifecycleType::Complete);
                        match log
                            .get_event_attribute(e, TIMESTAMP)
                            .and_then(|a| a.value.try_as_date())
                        {
                            Some(dt) => last_timestamp = dt.timestamp_millis(),
                            None => missing_timestamps += 1,
                        }
                        let event = index.insert(activity, lifecycle);
                        index.record_occurrence(event);
                        TraceEntry {
                            event,
                            timestamp_ms: last_timestamp,
                        }
                    })
                    .collect()
            })
            .collect();
        if missing_timestamps > 0 {
            tracing::warn!(
                "{} events have no valid {} attribute; using the previous timestamp of their trace",
                missing_timestamps,
                TIMESTAMP
            );
        }
        tracing::debug!(
            "Projected {} traces onto {} events of {} activities",
            log.traces.len(),
            index.num_events(),
            index.num_transitions()
        );
        Self { index, traces }
    }
}
