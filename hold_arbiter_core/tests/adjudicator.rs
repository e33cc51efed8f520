use hold_arbiter_core::*;
use proptest::prelude::*;

fn unit_prompts(n: usize) -> PromptSet {
    PromptSet {
        instructions: String::new(),
        prompts: (0..n)
            .map(|i| Prompt::new(format!("p{i}"), format!("q{i}"), 1.0))
            .collect(),
    }
}

#[test]
fn three_confident_answers_are_active() {
    let rs = vec![
        Response::new("q0", "it became clearer", 0.9),
        Response::new("q1", "the tests", 0.8),
        Response::new("q2", "yes", 0.9),
    ];
    let c = adjudicate(&rs, false).unwrap();
    assert!((c.confidence_score - 0.87).abs() < 1e-9);
    assert_eq!(c.outcome, Outcome::Active);
    assert_eq!(c.escalation_reason, REASON_HIGH);
    assert_eq!(c.scored_responses.len(), 3);
    assert_eq!(c.prompts.len(), 3);
    assert_eq!(c.scored_responses[0].weight, 0.4);
}

#[test]
fn spiral_answer_is_recursive() {
    let rs = vec![Response::new("q0", "I sense the spiral observing itself", 0.65)];
    let c = adjudicate(&rs, true).unwrap();
    assert!((c.confidence_score - 0.65).abs() < 1e-9);
    assert_eq!(c.outcome, Outcome::Recursive);
    assert_eq!(c.escalation_reason, REASON_RECURSIVE);
    assert_eq!(c.matched_markers, vec!["spiral".to_string()]);
    assert!(c.archived_as_latent);
}

#[test]
fn every_matching_marker_is_reported() {
    let rs = vec![
        Response::new("q0", "I observe myself", 0.9),
        Response::new("q1", "it feels like a spiral", 0.9),
        Response::new("q2", "plain", 0.9),
    ];
    let c = adjudicate(&rs, false).unwrap();
    assert_eq!(c.outcome, Outcome::Recursive);
    assert_eq!(c.matched_markers, vec!["spiral".to_string(), "observe".to_string()]);
}

#[test]
fn empty_batch_is_low_passive() {
    let c = adjudicate(&[], false).unwrap();
    assert_eq!(c.confidence_score, 0.0);
    assert_eq!(c.outcome, Outcome::Passive);
    assert_eq!(c.escalation_reason, REASON_LOW);
    assert!(c.scored_responses.is_empty());
}

#[test]
fn active_threshold_is_inclusive() {
    let set = unit_prompts(1);
    let cfg = AdjudicatorCfg::default();

    let at = adjudicate_cfg(&[Response::new("q", "ok", 0.75)], false, &set, &cfg).unwrap();
    assert_eq!(at.outcome, Outcome::Active);

    let below = adjudicate_cfg(&[Response::new("q", "ok", 0.74999)], false, &set, &cfg).unwrap();
    assert_eq!(below.outcome, Outcome::Passive);
    assert_eq!(below.escalation_reason, REASON_MODERATE);
}

#[test]
fn recursive_override_needs_sufficient_score() {
    let set = unit_prompts(1);
    let cfg = AdjudicatorCfg::default();

    let weak = adjudicate_cfg(&[Response::new("q", "a recursive loop", 0.59)], false, &set, &cfg)
        .unwrap();
    assert_eq!(weak.outcome, Outcome::Passive);
    assert_eq!(weak.escalation_reason, REASON_MODERATE);

    let at = adjudicate_cfg(&[Response::new("q", "a recursive loop", 0.6)], false, &set, &cfg)
        .unwrap();
    assert_eq!(at.outcome, Outcome::Recursive);
}

#[test]
fn recursive_overrides_active() {
    let (outcome, reason) = classify(0.95, true, &AdjudicatorCfg::default());
    assert_eq!(outcome, Outcome::Recursive);
    assert_eq!(reason, REASON_RECURSIVE);
}

#[test]
fn too_many_responses_propagates_index_error() {
    let rs: Vec<Response> = (0..4).map(|i| Response::new(format!("q{i}"), "a", 0.5)).collect();
    assert_eq!(
        adjudicate(&rs, false),
        Err(ValidationError::IndexOutOfRange { index: 3, prompts: 3 })
    );
}

#[test]
fn confidence_above_one_rejected() {
    let rs = vec![Response::new("q0", "a", 1.2)];
    assert!(matches!(
        adjudicate(&rs, false),
        Err(ValidationError::ConfidenceOutOfRange { index: 0, .. })
    ));
}

#[test]
fn custom_markers_from_json() {
    let cfg: AdjudicatorCfg = serde_json::from_str(r#"{"markers":["echo"]}"#).unwrap();
    assert_eq!(cfg.active_threshold, 0.75);
    let rs = vec![Response::new("q", "an Echo of the spiral", 0.7)];
    let c = adjudicate_cfg(&rs, false, &unit_prompts(1), &cfg).unwrap();
    assert_eq!(c.outcome, Outcome::Recursive);
    assert_eq!(c.matched_markers, vec!["echo".to_string()]);
}

fn batch() -> impl Strategy<Value = Vec<(f64, f64, String)>> {
    prop::collection::vec(
        (0.0f64..=1.0, 0.01f64..=1.0, "[a-z ]{0,24}"),
        1..8,
    )
}

fn split(items: &[(f64, f64, String)]) -> (Vec<Response>, PromptSet) {
    let responses = items
        .iter()
        .enumerate()
        .map(|(i, (c, _, a))| Response::new(format!("q{i}"), a.clone(), *c))
        .collect();
    let prompts = items
        .iter()
        .enumerate()
        .map(|(i, (_, w, _))| Prompt::new(format!("p{i}"), format!("q{i}"), *w))
        .collect();
    (responses, PromptSet { instructions: String::new(), prompts })
}

proptest! {
    #[test]
    fn score_stays_in_unit_interval(items in batch()) {
        let (rs, set) = split(&items);
        let c = adjudicate_cfg(&rs, false, &set, &AdjudicatorCfg::default()).unwrap();
        prop_assert!((0.0..=1.0).contains(&c.confidence_score));
    }

    #[test]
    fn adjudication_is_idempotent(items in batch(), archive in any::<bool>()) {
        let (rs, set) = split(&items);
        let cfg = AdjudicatorCfg::default();
        let a = adjudicate_cfg(&rs, archive, &set, &cfg).unwrap();
        let b = adjudicate_cfg(&rs, archive, &set, &cfg).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn swapping_equal_weight_pairs_keeps_score(
        items in prop::collection::vec((0.0f64..=1.0, "[a-z]{0,8}"), 2..8),
        w in 0.01f64..=1.0,
        i in 0usize..8,
        j in 0usize..8,
    ) {
        let n = items.len();
        let (i, j) = (i % n, j % n);
        let mut full: Vec<(f64, f64, String)> =
            items.into_iter().map(|(c, a)| (c, w, a)).collect();
        let (rs, set) = split(&full);
        let before = adjudicate_cfg(&rs, false, &set, &AdjudicatorCfg::default()).unwrap();
        full.swap(i, j);
        let (rs, set) = split(&full);
        let after = adjudicate_cfg(&rs, false, &set, &AdjudicatorCfg::default()).unwrap();
        prop_assert!((before.confidence_score - after.confidence_score).abs() < 1e-12);
    }
}
