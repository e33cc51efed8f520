//hold_arbiter_core/decide.rs

use serde::{Deserialize, Serialize};

use crate::{
    cfg::AdjudicatorCfg,
    error::ValidationError,
    prompt::{default_prompt_set, Prompt, PromptSet, Response, ScoredResponse},
    score::{pair_with_prompts, weighted_confidence},
    signal::matched_markers,
};

/// Adjudicated outcome of a response batch.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Active,
    Passive,
    Recursive,
}

pub const REASON_HIGH: &str = "high confidence";
pub const REASON_MODERATE: &str = "moderate confidence, requires further reflection";
pub const REASON_LOW: &str = "low confidence, archived for latent processing";
pub const REASON_RECURSIVE: &str = "recursive patterns detected with sufficient confidence";

/// Full adjudication record returned to callers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub outcome: Outcome,
    /// Weighted mean confidence in [0, 1]; 0 when no weight was scored.
    pub confidence_score: f64,
    pub escalation_reason: String,
    /// Passed through from the caller, never computed.
    pub archived_as_latent: bool,
    pub prompts: Vec<Prompt>,
    pub scored_responses: Vec<ScoredResponse>,
    /// Markers that matched, for explanation only.
    #[serde(default)]
    pub matched_markers: Vec<String>,
}

/// Threshold rules as a priority chain: base band first, then the
/// `Recursive` override, which wins whenever it fires.
pub fn classify(score: f64, signal: bool, cfg: &AdjudicatorCfg) -> (Outcome, &'static str) {
    let base = if score >= cfg.active_threshold {
        (Outcome::Active, REASON_HIGH)
    } else if score >= cfg.reflect_threshold {
        (Outcome::Passive, REASON_MODERATE)
    } else {
        (Outcome::Passive, REASON_LOW)
    };

    if signal && score >= cfg.recursive_threshold {
        (Outcome::Recursive, REASON_RECURSIVE)
    } else {
        base
    }
}

pub fn adjudicate_cfg(
    responses: &[Response],
    archive_as_latent: bool,
    prompt_set: &PromptSet,
    cfg: &AdjudicatorCfg,
) -> Result<Classification, ValidationError> {
    prompt_set.validate()?;
    let scored = pair_with_prompts(responses, &prompt_set.prompts)?;
    let score = weighted_confidence(&scored);
    let markers = matched_markers(responses, &cfg.markers);
    let (outcome, reason) = classify(score, !markers.is_empty(), cfg);

    tracing::debug!(
        responses = responses.len(),
        confidence_score = score,
        ?outcome,
        matched = ?markers,
        "adjudicated response batch"
    );

    Ok(Classification {
        outcome,
        confidence_score: score,
        escalation_reason: reason.to_string(),
        archived_as_latent: archive_as_latent,
        prompts: prompt_set.prompts.clone(),
        scored_responses: scored,
        matched_markers: markers.into_iter().map(str::to_string).collect(),
    })
}

/// Adjudicate against the default prompt set and thresholds.
pub fn adjudicate(
    responses: &[Response],
    archive_as_latent: bool,
) -> Result<Classification, ValidationError> {
    adjudicate_cfg(
        responses,
        archive_as_latent,
        &default_prompt_set(),
        &AdjudicatorCfg::default(),
    )
}
