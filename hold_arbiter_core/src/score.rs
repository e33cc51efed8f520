use crate::error::ValidationError;
use crate::prompt::{Prompt, Response, ScoredResponse};

/// Pair each response with the prompt at the same ordinal index.
///
/// A response past the end of the prompt set is an error, never a default
/// weight. Confidence must be finite and within [0, 1].
pub fn pair_with_prompts(
    responses: &[Response],
    prompts: &[Prompt],
) -> Result<Vec<ScoredResponse>, ValidationError> {
    let mut out = Vec::with_capacity(responses.len());
    for (index, r) in responses.iter().enumerate() {
        let prompt = prompts.get(index).ok_or(ValidationError::IndexOutOfRange {
            index,
            prompts: prompts.len(),
        })?;
        if !(0.0..=1.0).contains(&r.confidence) {
            return Err(ValidationError::ConfidenceOutOfRange {
                index,
                value: r.confidence,
            });
        }
        out.push(ScoredResponse {
            response: r.clone(),
            weight: prompt.weight,
        });
    }
    Ok(out)
}

/// Weighted mean of confidences. Zero when the total weight is zero.
pub fn weighted_confidence(scored: &[ScoredResponse]) -> f64 {
    let mut total_score = 0.0_f64;
    let mut total_weight = 0.0_f64;

    for sr in scored {
        total_score += sr.response.confidence * sr.weight;
        total_weight += sr.weight;
    }

    if total_weight > 0.0 {
        total_score / total_weight
    } else {
        0.0
    }
}
