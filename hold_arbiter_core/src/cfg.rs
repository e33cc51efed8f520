use serde::{Deserialize, Serialize};

/// Thresholds and marker set for the outcome adjudicator.
///
/// All lower bounds are inclusive: a score equal to a threshold takes the
/// higher band.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjudicatorCfg {
    /// Score at or above which the base outcome is `Active`.
    pub active_threshold: f64,
    /// Score at or above which a `Passive` outcome asks for further reflection
    /// instead of latent archival.
    pub reflect_threshold: f64,
    /// Minimum score for the `Recursive` override when a marker is present.
    pub recursive_threshold: f64,
    /// Case-insensitive substrings searched for in free-text answers.
    pub markers: Vec<String>,
}

impl Default for AdjudicatorCfg {
    fn default() -> Self {
        Self {
            active_threshold: 0.75,
            reflect_threshold: 0.5,
            recursive_threshold: 0.6,
            markers: DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

pub const DEFAULT_MARKERS: [&str; 3] = ["recursive", "spiral", "observe"];
