// End-to-end tests for the debate protocol over scripted backends.
//
// These exercise the real orchestration path:
//
//   EvaluationEngine::evaluate -> DebateOrchestrator -> RateLimiter ->
//     LlmBackend -> extract -> normalize -> validate -> merge -> grade
//
// The backends are scripted fakes implementing `LlmBackend`; every other
// layer is the production code.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use eval_engine_rs::{DebateMode, EvalError, EvaluationEngine, RetryPolicy};
use eval_types_rs::{Category, Criterion, Grade, Proposal};
use llm_client_rs::{ChatMessage, LlmBackend, LlmError, LlmResponse, TokenUsage};

/// Replays a fixed sequence of responses and records the message count
/// of every invocation.
struct ScriptedBackend {
    label: String,
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    report_usage: bool,
    call_message_counts: Mutex<Vec<usize>>,
}

impl ScriptedBackend {
    fn new(label: &str, script: Vec<Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            script: Mutex::new(script.into()),
            report_usage: true,
            call_message_counts: Mutex::new(Vec::new()),
        })
    }

    fn without_usage(label: &str, script: Vec<Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            script: Mutex::new(script.into()),
            report_usage: false,
            call_message_counts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<usize> {
        self.call_message_counts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    fn label(&self) -> &str {
        &self.label
    }

    async fn invoke(&self, messages: &[ChatMessage]) -> Result<LlmResponse, LlmError> {
        self.call_message_counts.lock().unwrap().push(messages.len());
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("{}: script exhausted", self.label));
        next.map(|content| LlmResponse {
            content,
            usage: self.report_usage.then(|| TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 50,
                total_tokens: 150,
                api_calls: 1,
            }),
        })
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn criteria() -> Vec<Criterion> {
    vec![Criterion::new("혁신성", "AI 기술의 창의성과 새로움")]
}

fn categories() -> Vec<Category> {
    vec![
        Category::new("예측", "미래 값 예측"),
        Category::new("분류", "이미지/텍스트 분류"),
    ]
}

fn proposal() -> Proposal {
    Proposal {
        id: 42,
        subject: Some("수요 예측 자동화".to_string()),
        ..Default::default()
    }
}

fn result_json(score: i64, extra: &str) -> String {
    format!(
        r#"{{"ai_category":"예측","business_impact":"x","technical_feasibility":"y",
           "five_line_summary":["1","2","3","4","5"],
           "evaluation_scores":{{"innovation":{{"score":{},"rationale":"충분한 근거가 있는 설명입니다"}}}}{}}}"#,
        score, extra
    )
}

#[tokio::test]
async fn single_mode_scores_and_grades() {
    init_logging();
    let backend_a = ScriptedBackend::new("LLM A", vec![Ok(result_json(4, ""))]);
    let engine = EvaluationEngine::new(backend_a.clone(), None);

    let outcome = engine
        .evaluate(&proposal(), &criteria(), Some(&categories()))
        .await
        .expect("evaluation succeeds");

    assert_eq!(outcome.mode, DebateMode::Single);
    assert!(outcome.quality.is_none(), "validator must pass");
    assert_eq!(outcome.weighted_score, 4.0);
    assert_eq!(outcome.grade, Grade::A);
    assert_eq!(outcome.result.evaluation_scores["innovation"].score, 4);
    assert_eq!(outcome.proposal_id, 42);

    // One call: system message + initial prompt.
    assert_eq!(backend_a.calls(), vec![2]);

    let usage = engine.usage_summary().await;
    assert_eq!(usage.primary.api_calls, 1);
    assert_eq!(usage.combined.total_tokens, 150);
}

#[tokio::test]
async fn fenced_response_is_extracted_through_the_pipeline() {
    let fenced = format!("평가 결과입니다:\n```json\n{}\n```\n이상입니다.", result_json(5, ""));
    let backend_a = ScriptedBackend::new("LLM A", vec![Ok(fenced)]);
    let engine = EvaluationEngine::new(backend_a, None);

    let outcome = engine
        .evaluate(&proposal(), &criteria(), Some(&categories()))
        .await
        .unwrap();
    assert_eq!(outcome.grade, Grade::S);
}

#[tokio::test]
async fn out_of_range_score_is_advisory_not_fatal() {
    let backend_a = ScriptedBackend::new("LLM A", vec![Ok(result_json(6, ""))]);
    let engine = EvaluationEngine::new(backend_a, None);

    let outcome = engine
        .evaluate(&proposal(), &criteria(), Some(&categories()))
        .await
        .expect("advisory violations never block");

    let quality = outcome.quality.expect("score 6 must be flagged");
    assert_eq!(quality.violations.len(), 1);
    assert_eq!(outcome.result.evaluation_scores["innovation"].score, 6);
}

#[tokio::test]
async fn debate_runs_three_steps_and_final_wins() {
    init_logging();
    let backend_a = ScriptedBackend::new(
        "LLM A",
        vec![
            Ok(result_json(3, "")),
            Ok(result_json(4, r#","final_decision":"검토 의견 일부 수용""#)),
        ],
    );
    let backend_b = ScriptedBackend::new(
        "LLM B",
        vec![Ok(result_json(2, r#","debate_summary":"점수 인플레이션 조정""#))],
    );
    let engine = EvaluationEngine::new(backend_a.clone(), Some(backend_b.clone()));

    let outcome = engine
        .evaluate(&proposal(), &criteria(), Some(&categories()))
        .await
        .unwrap();

    assert_eq!(outcome.mode, DebateMode::Debate);
    let entry = &outcome.result.evaluation_scores["innovation"];
    assert_eq!(entry.score, 4, "final score wins");
    assert_eq!(entry.score_initial, Some(3));
    assert_eq!(entry.score_review, Some(2));
    assert_eq!(entry.score_final, Some(4));
    assert_eq!(
        outcome.result.debate_summary.as_deref(),
        Some("점수 인플레이션 조정")
    );
    assert_eq!(
        outcome.result.final_decision.as_deref(),
        Some("검토 의견 일부 수용")
    );

    // A keeps the conversation: first call system+user, final call
    // system+user+assistant+user. B is stateless: one user turn.
    assert_eq!(backend_a.calls(), vec![2, 4]);
    assert_eq!(backend_b.calls(), vec![1]);

    let usage = outcome.usage;
    assert_eq!(usage.primary.api_calls, 2);
    assert_eq!(usage.secondary.api_calls, 1);
    assert_eq!(usage.combined.total_tokens, 450);
}

#[tokio::test(start_paused = true)]
async fn reviewer_failure_degrades_to_initial_result() {
    let backend_a = ScriptedBackend::new("LLM A", vec![Ok(result_json(3, ""))]);
    // The reviewer times out on every retry attempt.
    let backend_b = ScriptedBackend::new(
        "LLM B",
        vec![
            Err(LlmError::Network("request timed out".into())),
            Err(LlmError::Network("request timed out".into())),
            Err(LlmError::Network("request timed out".into())),
        ],
    );
    let engine = EvaluationEngine::new(backend_a.clone(), Some(backend_b.clone()));

    let outcome = engine
        .evaluate(&proposal(), &criteria(), Some(&categories()))
        .await
        .expect("reviewer failure must not abort the evaluation");

    assert_eq!(outcome.mode, DebateMode::DegradedToInitial);
    assert_eq!(outcome.result, outcome.audit.initial, "initial result verbatim");
    let entry = &outcome.result.evaluation_scores["innovation"];
    assert_eq!(entry.score, 3);
    assert_eq!(entry.score_review, None);
    assert_eq!(entry.score_final, None);

    // FINAL_A was skipped: A invoked exactly once, B retried three times.
    assert_eq!(backend_a.calls().len(), 1);
    assert_eq!(backend_b.calls().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn final_step_failure_aborts_the_evaluation() {
    let backend_a = ScriptedBackend::new(
        "LLM A",
        vec![
            Ok(result_json(3, "")),
            Err(LlmError::ServerError("502".into())),
            Err(LlmError::ServerError("502".into())),
            Err(LlmError::ServerError("502".into())),
        ],
    );
    let backend_b = ScriptedBackend::new("LLM B", vec![Ok(result_json(2, ""))]);
    let engine = EvaluationEngine::new(backend_a, Some(backend_b));

    let err = engine
        .evaluate(&proposal(), &criteria(), Some(&categories()))
        .await
        .expect_err("final synthesis failure is fatal");
    assert!(matches!(err, EvalError::FinalStepFailed(_)));
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_within_budget() {
    let backend_a = ScriptedBackend::new(
        "LLM A",
        vec![
            Err(LlmError::Network("connection failed".into())),
            Err(LlmError::ServerError("503".into())),
            Ok(result_json(4, "")),
        ],
    );
    let engine = EvaluationEngine::new(backend_a.clone(), None);

    let outcome = engine
        .evaluate(&proposal(), &criteria(), Some(&categories()))
        .await
        .expect("third attempt succeeds");
    assert_eq!(outcome.grade, Grade::A);
    assert_eq!(backend_a.calls().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn malformed_json_shares_the_retry_budget() {
    let backend_a = ScriptedBackend::new(
        "LLM A",
        vec![
            Ok("도저히 JSON이 아닌 응답".to_string()),
            Ok(result_json(4, "")),
        ],
    );
    let engine = EvaluationEngine::new(backend_a.clone(), None);

    let outcome = engine
        .evaluate(&proposal(), &criteria(), Some(&categories()))
        .await
        .expect("re-prompt fixes malformed output");
    assert_eq!(outcome.grade, Grade::A);
    assert_eq!(backend_a.calls().len(), 2);
}

#[tokio::test]
async fn invalid_request_fails_fast_without_retry() {
    let backend_a = ScriptedBackend::new(
        "LLM A",
        vec![Err(LlmError::InvalidRequest("unauthorized".into()))],
    );
    let engine = EvaluationEngine::new(backend_a.clone(), None);

    let err = engine
        .evaluate(&proposal(), &criteria(), Some(&categories()))
        .await
        .expect_err("credential errors are terminal");
    assert!(matches!(err, EvalError::Backend(LlmError::InvalidRequest(_))));
    assert_eq!(backend_a.calls().len(), 1);
}

#[tokio::test]
async fn batch_isolates_per_proposal_failures() {
    let backend_a = ScriptedBackend::new(
        "LLM A",
        vec![
            Err(LlmError::InvalidRequest("unauthorized".into())),
            Ok(result_json(4, "")),
        ],
    );
    let engine = EvaluationEngine::new(backend_a, None);

    let proposals = vec![
        Proposal {
            id: 1,
            ..Default::default()
        },
        Proposal {
            id: 2,
            ..Default::default()
        },
    ];
    let batch = engine
        .evaluate_batch(&proposals, &criteria(), Some(&categories()))
        .await;

    assert_eq!(batch.failed.len(), 1);
    assert_eq!(batch.failed[0].proposal_id, 1);
    assert!(batch.failed[0].error.contains("unauthorized"));
    assert_eq!(batch.succeeded.len(), 1);
    assert_eq!(batch.succeeded[0].proposal_id, 2);
}

#[tokio::test]
async fn missing_usage_metadata_still_counts_calls() {
    let backend_a = ScriptedBackend::without_usage("LLM A", vec![Ok(result_json(4, ""))]);
    let engine = EvaluationEngine::new(backend_a, None);

    engine
        .evaluate(&proposal(), &criteria(), Some(&categories()))
        .await
        .unwrap();

    let usage = engine.usage_summary().await;
    assert_eq!(usage.primary.api_calls, 1);
    assert_eq!(usage.primary.total_tokens, 0);

    engine.reset_usage().await;
    assert_eq!(engine.usage_summary().await.primary.api_calls, 0);
}

#[tokio::test(start_paused = true)]
async fn rate_limiter_paces_call_bursts() {
    // Three single-mode evaluations against a limit of two calls per
    // 10 s window: the third must wait for the first slot to age out.
    let backend_a = ScriptedBackend::new(
        "LLM A",
        vec![
            Ok(result_json(3, "")),
            Ok(result_json(3, "")),
            Ok(result_json(3, "")),
        ],
    );
    let engine = EvaluationEngine::new(backend_a, None)
        .with_rate_limit(2, Duration::from_secs(10))
        .with_retry_policy(RetryPolicy::default());

    let start = tokio::time::Instant::now();
    for p in [1, 2, 3] {
        engine
            .evaluate(
                &Proposal {
                    id: p,
                    ..Default::default()
                },
                &criteria(),
                Some(&categories()),
            )
            .await
            .unwrap();
    }
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(10), "third call was not paced");
}