/// Input rejected before scoring. Nothing is ever clamped into range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("response at index {index} has no matching prompt ({prompts} prompts defined)")]
    IndexOutOfRange { index: usize, prompts: usize },

    #[error("response at index {index} has confidence {value} outside [0, 1]")]
    ConfidenceOutOfRange { index: usize, value: f64 },

    #[error("prompt {id} has weight {weight} outside (0, 1]")]
    InvalidPromptWeight { id: String, weight: f64 },

    #[error("session id must not be empty")]
    EmptySessionId,
}
