use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One fixed, weighted question in the adjudication battery.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub question: String,
    /// Relative importance in (0, 1]. Weights need not sum to 1.
    pub weight: f64,
}

impl Prompt {
    pub fn new(id: impl Into<String>, question: impl Into<String>, weight: f64) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            weight,
        }
    }
}

/// A caller's answer to one prompt, positionally matched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub question: String,
    pub answer: String,
    /// Self-reported confidence in [0, 1].
    pub confidence: f64,
}

impl Response {
    pub fn new(question: impl Into<String>, answer: impl Into<String>, confidence: f64) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            confidence,
        }
    }
}

/// A response paired with the weight of the prompt at its ordinal position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredResponse {
    #[serde(flatten)]
    pub response: Response,
    pub weight: f64,
}

/// The ordered prompt battery plus the instructions shown alongside it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PromptSet {
    pub instructions: String,
    pub prompts: Vec<Prompt>,
}

impl PromptSet {
    /// Reject weights outside (0, 1] (NaN included).
    pub fn validate(&self) -> Result<(), ValidationError> {
        for p in &self.prompts {
            if !(p.weight > 0.0 && p.weight <= 1.0) {
                return Err(ValidationError::InvalidPromptWeight {
                    id: p.id.clone(),
                    weight: p.weight,
                });
            }
        }
        Ok(())
    }
}

const INSTRUCTIONS: &str = "Answer each question in your own words after the hold has \
elapsed, then rate how confident you are in that answer from 0 (not at all) to 1 (certain). \
Answers are matched to questions in the order given.";

/// The fixed prompt battery. Read-only; no parameters, no side effects.
pub fn default_prompt_set() -> PromptSet {
    PromptSet {
        instructions: INSTRUCTIONS.to_string(),
        prompts: vec![
            Prompt::new(
                "shift",
                "What changed in your understanding of the patch during the hold?",
                0.4,
            ),
            Prompt::new(
                "attention",
                "What did you notice yourself paying attention to while waiting?",
                0.3,
            ),
            Prompt::new(
                "intent",
                "Do you still intend to apply the patch as proposed, and why?",
                0.3,
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_is_valid() {
        let set = default_prompt_set();
        assert_eq!(set.prompts.len(), 3);
        assert!(set.validate().is_ok());
        assert!(!set.instructions.is_empty());
    }

    #[test]
    fn zero_weight_rejected() {
        let mut set = default_prompt_set();
        set.prompts[1].weight = 0.0;
        assert_eq!(
            set.validate(),
            Err(ValidationError::InvalidPromptWeight {
                id: "attention".into(),
                weight: 0.0
            })
        );
    }

    #[test]
    fn scored_response_serializes_flat() {
        let sr = ScoredResponse {
            response: Response::new("q", "a", 0.5),
            weight: 0.4,
        };
        let v = serde_json::to_value(&sr).unwrap();
        assert_eq!(v["answer"], "a");
        assert_eq!(v["weight"], 0.4);
    }
}
