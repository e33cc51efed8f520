pub mod cfg;
pub mod error;
pub mod prompt;
pub mod score;
pub mod signal;
pub mod decide;

pub use cfg::{AdjudicatorCfg, DEFAULT_MARKERS};
pub use error::ValidationError;
pub use prompt::{default_prompt_set, Prompt, PromptSet, Response, ScoredResponse};
pub use score::{pair_with_prompts, weighted_confidence};
pub use signal::{matched_markers, signal_present};
pub use decide::{
    adjudicate, adjudicate_cfg, classify, Classification, Outcome, REASON_HIGH, REASON_LOW,
    REASON_MODERATE, REASON_RECURSIVE,
};
