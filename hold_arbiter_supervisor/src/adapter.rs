//! Adjudication adapter: wire requests in, core classification out.
//!
//! No I/O here. The remote side is an `AdjudicationClient` supplied by the
//! host; `LocalAdjudicator` answers the same request in-process.

use serde::{Deserialize, Serialize};

use hold_arbiter_core::{
    adjudicate_cfg, default_prompt_set, pair_with_prompts, AdjudicatorCfg, Classification,
    PromptSet, Response, ValidationError,
};

use crate::error::{AdjudicationError, RemoteCallError};

/// Adjudication call payload. Responses are matched to prompts by position;
/// any `weight` a client sends alongside a response is ignored in favour of
/// the prompt set's own weights.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdjudicationRequest {
    pub session_id: String,
    pub patch_id: String,
    #[serde(default)]
    pub responses: Vec<Response>,
    #[serde(default)]
    pub archive_as_latent: bool,
}

impl AdjudicationRequest {
    /// Reject malformed input before anything is scored or sent.
    pub fn validate(&self, prompt_set: &PromptSet) -> Result<(), ValidationError> {
        if self.session_id.is_empty() {
            return Err(ValidationError::EmptySessionId);
        }
        prompt_set.validate()?;
        pair_with_prompts(&self.responses, &prompt_set.prompts).map(|_| ())
    }
}

/// Remote adjudication endpoint.
pub trait AdjudicationClient {
    fn adjudicate(&self, request: &AdjudicationRequest) -> Result<Classification, RemoteCallError>;
}

/// Validate locally, then call `client` exactly once. Failures abort the
/// whole request; retrying is the caller's decision.
pub fn submit_adjudication<C: AdjudicationClient>(
    client: &C,
    prompt_set: &PromptSet,
    request: &AdjudicationRequest,
) -> Result<Classification, AdjudicationError> {
    request.validate(prompt_set)?;
    client.adjudicate(request).map_err(|e| {
        tracing::warn!(session_id = %request.session_id, error = %e, "adjudication call failed");
        AdjudicationError::from(e)
    })
}

/// In-process adjudicator with a fixed prompt set and thresholds.
#[derive(Clone, Debug)]
pub struct LocalAdjudicator {
    prompt_set: PromptSet,
    cfg: AdjudicatorCfg,
}

impl Default for LocalAdjudicator {
    fn default() -> Self {
        Self::new(default_prompt_set(), AdjudicatorCfg::default())
    }
}

impl LocalAdjudicator {
    pub fn new(prompt_set: PromptSet, cfg: AdjudicatorCfg) -> Self {
        Self { prompt_set, cfg }
    }

    /// Prompt-set query: the ordered prompts plus instructions.
    pub fn prompt_set(&self) -> &PromptSet {
        &self.prompt_set
    }

    pub fn answer(&self, request: &AdjudicationRequest) -> Result<Classification, ValidationError> {
        if request.session_id.is_empty() {
            return Err(ValidationError::EmptySessionId);
        }
        let c = adjudicate_cfg(
            &request.responses,
            request.archive_as_latent,
            &self.prompt_set,
            &self.cfg,
        )?;
        tracing::debug!(
            session_id = %request.session_id,
            patch_id = %request.patch_id,
            outcome = ?c.outcome,
            "local adjudication"
        );
        Ok(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hold_arbiter_core::Outcome;
    use std::cell::Cell;

    struct CountingClient {
        calls: Cell<u32>,
        fail: bool,
    }

    impl AdjudicationClient for CountingClient {
        fn adjudicate(&self, request: &AdjudicationRequest) -> Result<Classification, RemoteCallError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(RemoteCallError::Unreachable);
            }
            LocalAdjudicator::default()
                .answer(request)
                .map_err(|_| RemoteCallError::Rejected { code: 400 })
        }
    }

    fn request(responses: Vec<Response>) -> AdjudicationRequest {
        AdjudicationRequest {
            session_id: "s1".into(),
            patch_id: "p1".into(),
            responses,
            archive_as_latent: false,
        }
    }

    #[test]
    fn wire_request_ignores_client_weights() {
        let req: AdjudicationRequest = serde_json::from_str(
            r#"{"session_id":"s","patch_id":"p","archive_as_latent":true,
                "responses":[{"question":"q","answer":"a","confidence":0.9,"weight":0.01}]}"#,
        )
        .unwrap();
        let c = LocalAdjudicator::default().answer(&req).unwrap();
        assert_eq!(c.scored_responses[0].weight, 0.4);
        assert!(c.archived_as_latent);
        assert_eq!(c.outcome, Outcome::Active);
    }

    #[test]
    fn invalid_request_never_reaches_remote() {
        let client = CountingClient { calls: Cell::new(0), fail: false };
        let req = request(vec![Response::new("q", "a", 2.0)]);
        let err = submit_adjudication(&client, &default_prompt_set(), &req).unwrap_err();
        assert!(matches!(err, AdjudicationError::Validation(_)));
        assert_eq!(client.calls.get(), 0);
    }

    #[test]
    fn remote_failure_surfaces_without_retry() {
        let client = CountingClient { calls: Cell::new(0), fail: true };
        let req = request(vec![Response::new("q", "a", 0.5)]);
        let err = submit_adjudication(&client, &default_prompt_set(), &req).unwrap_err();
        assert_eq!(err, AdjudicationError::Remote(RemoteCallError::Unreachable));
        assert_eq!(client.calls.get(), 1);
    }

    #[test]
    fn empty_session_rejected() {
        let mut req = request(vec![]);
        req.session_id.clear();
        assert_eq!(
            LocalAdjudicator::default().answer(&req),
            Err(ValidationError::EmptySessionId)
        );
    }
}
