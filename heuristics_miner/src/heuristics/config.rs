use std::path::Path;

use serde::{Deserialize, Serialize};

/// Default relative-to-best threshold
pub const DEFAULT_RELATIVE_TO_BEST_THRESHOLD: f64 = 0.05;
/// Default positive observations threshold
pub const DEFAULT_POSITIVE_OBSERVATIONS_THRESHOLD: u64 = 10;
/// Default dependency threshold
pub const DEFAULT_DEPENDENCY_THRESHOLD: f64 = 0.8;
/// Default length-one-loop threshold
pub const DEFAULT_L1L_THRESHOLD: f64 = 0.8;
/// Default length-two-loop threshold
pub const DEFAULT_L2L_THRESHOLD: f64 = 0.8;
/// Default long distance threshold
pub const DEFAULT_LONG_DISTANCE_THRESHOLD: f64 = 0.8;
/// Default dependency divisor
pub const DEFAULT_DEPENDENCY_DIVISOR: f64 = 1.0;
/// Default AND threshold
pub const DEFAULT_AND_THRESHOLD: f64 = 0.2;
/// Default intervals overlap multiplier
pub const DEFAULT_OVERLAP_MULTIPLIER: f64 = 2.0;

///
/// Error while reading or writing a [`HeuristicsMinerConfig`]
///
#[derive(Debug, thiserror::Error)]
pub enum HeuristicsMinerConfigError {
    /// The configuration file could not be read
    #[error("failed to read configuration: {0}")]
    IOError(#[from] std::io::Error),
    /// Invalid JSON
    #[error("invalid configuration JSON: {0}")]
    JSONError(#[from] serde_json::Error),
}

///
/// How activity instances that are started but never completed within a trace are treated
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DanglingStartPolicy {
    /// Open starts never contribute to activity durations
    #[default]
    Ignore,
    /// Open starts contribute a partial duration up to the last timestamp of the trace
    CloseAtTraceEnd,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Algorithm parameters for the Heuristics Miner
///
/// Missing fields are filled with their defaults when deserializing.
pub struct HeuristicsMinerConfig {
    /// Maximal distance to the best outgoing dependency measure for accepting an additional edge
    pub relative_to_best_threshold: f64,
    /// Minimal number of direct successions (or second-order successions for loops) for accepting an edge
    pub positive_observations_threshold: u64,
    /// Minimal dependency measure for accepting an edge
    pub dependency_threshold: f64,
    /// Minimal measure for accepting a length-one loop
    pub l1l_threshold: f64,
    /// Minimal measure for accepting a length-two loop
    pub l2l_threshold: f64,
    /// Measure a long distance dependency has to exceed
    pub long_distance_threshold: f64,
    /// Divisor added to the denominator of all dependency measures
    pub dependency_divisor: f64,
    /// Maximal AND-measure for two neighbors to share an AND-subset
    pub and_threshold: f64,
    /// Weight of overlapping (parallel) executions in the dependency and AND measures
    pub overlap_multiplier: f64,
    /// Connect every non-terminal event to its best input and output partner
    pub use_all_connected_heuristics: bool,
    /// Search for long distance dependencies
    pub use_long_distance_dependency: bool,
    /// Accept length-two loops from `succession2`
    ///
    /// `succession2` counts every completion before a later start, so at the default
    /// thresholds any activity pair observed in sequence often enough qualifies.
    pub use_length_two_loops: bool,
    /// Treatment of starts without a matching completion
    pub dangling_start_policy: DanglingStartPolicy,
}

impl Default for HeuristicsMinerConfig {
    fn default() -> Self {
        Self {
            relative_to_best_threshold: DEFAULT_RELATIVE_TO_BEST_THRESHOLD,
            positive_observations_threshold: DEFAULT_POSITIVE_OBSERVATIONS_THRESHOLD,
            dependency_threshold: DEFAULT_DEPENDENCY_THRESHOLD,
            l1l_threshold: DEFAULT_L1L_THRESHOLD,
            l2l_threshold: DEFAULT_L2L_THRESHOLD,
            long_distance_threshold: DEFAULT_LONG_DISTANCE_THRESHOLD,
            dependency_divisor: DEFAULT_DEPENDENCY_DIVISOR,
            and_threshold: DEFAULT_AND_THRESHOLD,
            overlap_multiplier: DEFAULT_OVERLAP_MULTIPLIER,
            use_all_connected_heuristics: true,
            use_long_distance_dependency: false,
            use_length_two_loops: false,
            dangling_start_policy: DanglingStartPolicy::Ignore,
        }
    }
}

/// Keep `value` if it is finite and at least `min`, otherwise use `default`
fn clamp_or_default(name: &str, value: f64, min: f64, default: f64) -> f64 {
    if value.is_finite() && value >= min {
        value
    } else {
        tracing::warn!("Invalid value {} for {}, using default {}", value, name, default);
        default
    }
}

impl HeuristicsMinerConfig {
    /// Serialize parameters to JSON string
    pub fn to_json(&self) -> Result<String, HeuristicsMinerConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize parameters from JSON string
    pub fn from_json(json: &str) -> Result<Self, HeuristicsMinerConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read parameters from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, HeuristicsMinerConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    ///
    /// Reset invalid values to their defaults
    ///
    /// The divisor has to be positive and all thresholds and the overlap multiplier non-negative.
    /// The mining algorithm itself never validates its parameters.
    ///
    pub fn sanitized(self) -> Self {
        Self {
            relative_to_best_threshold: clamp_or_default(
                "relative_to_best_threshold",
                self.relative_to_best_threshold,
                0.0,
                DEFAULT_RELATIVE_TO_BEST_THRESHOLD,
            ),
            dependency_threshold: clamp_or_default(
                "dependency_threshold",
                self.dependency_threshold,
                0.0,
                DEFAULT_DEPENDENCY_THRESHOLD,
            ),
            l1l_threshold: clamp_or_default(
                "l1l_threshold",
                self.l1l_threshold,
                0.0,
                DEFAULT_L1L_THRESHOLD,
            ),
            l2l_threshold: clamp_or_default(
                "l2l_threshold",
                self.l2l_threshold,
                0.0,
                DEFAULT_L2L_THRESHOLD,
            ),
            long_distance_threshold: clamp_or_default(
                "long_distance_threshold",
                self.long_distance_threshold,
                0.0,
                DEFAULT_LONG_DISTANCE_THRESHOLD,
            ),
            dependency_divisor: clamp_or_default(
                "dependency_divisor",
                self.dependency_divisor,
                f64::MIN_POSITIVE,
                DEFAULT_DEPENDENCY_DIVISOR,
            ),
            and_threshold: clamp_or_default(
                "and_threshold",
                self.and_threshold,
                0.0,
                DEFAULT_AND_THRESHOLD,
            ),
            overlap_multiplier: clamp_or_default(
                "overlap_multiplier",
                self.overlap_multiplier,
                0.0,
                DEFAULT_OVERLAP_MULTIPLIER,
            ),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config =
            HeuristicsMinerConfig::from_json(r#"{"dependency_threshold": 0.9, "use_long_distance_dependency": true}"#)
                .unwrap();
        assert_eq!(config.dependency_threshold, 0.9);
        assert!(config.use_long_distance_dependency);
        assert_eq!(config.positive_observations_threshold, 10);
        assert_eq!(config.dangling_start_policy, DanglingStartPolicy::Ignore);
    }

    #[test]
    fn json_roundtrip_through_file() {
        let config = HeuristicsMinerConfig {
            dangling_start_policy: DanglingStartPolicy::CloseAtTraceEnd,
            ..HeuristicsMinerConfig::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, config.to_json().unwrap()).unwrap();
        assert_eq!(HeuristicsMinerConfig::from_json_file(&path).unwrap(), config);
    }

    #[test]
    fn sanitize_invalid_values() {
        let config = HeuristicsMinerConfig {
            dependency_divisor: 0.0,
            dependency_threshold: -0.5,
            and_threshold: f64::NAN,
            l1l_threshold: 0.3,
            ..HeuristicsMinerConfig::default()
        }
        .sanitized();
        assert_eq!(config.dependency_divisor, DEFAULT_DEPENDENCY_DIVISOR);
        assert_eq!(config.dependency_threshold, DEFAULT_DEPENDENCY_THRESHOLD);
        assert_eq!(config.and_threshold, DEFAULT_AND_THRESHOLD);
        assert_eq!(config.l1l_threshold, 0.3);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(
            HeuristicsMinerConfig::from_json("{"),
            Err(HeuristicsMinerConfigError::JSONError(_))
        ));
    }
}
