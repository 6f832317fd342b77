// eval-engine-rs/src/orchestrator.rs
// The debate state machine. Drives one or two backends through the
// fixed INITIAL_A -> REVIEW_B -> FINAL_A protocol, running every raw
// response through extract -> normalize -> validate, with a bounded
// retry around each call.

use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoffBuilder;
use rand::Rng;

use eval_types_rs::{Category, Criterion, EvaluationResult, Proposal};
use llm_client_rs::{BackendId, ChatMessage, LlmBackend, RateLimiter, TokenUsageTracker, Transcript};

use crate::error::EvalError;
use crate::extract::parse_model_response;
use crate::normalize::decode_result;
use crate::prompt::PromptBuilder;
use crate::validate::validate_result;

/// Which protocol an evaluation actually ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DebateMode {
    /// One backend, one call.
    Single,
    /// Full three-step debate.
    Debate,
    /// Debate requested, reviewer failed; degraded to the initial result.
    DegradedToInitial,
}

/// Per-step raw results, kept for the audit trail alongside the merged
/// result.
#[derive(Debug, Clone)]
pub struct DebateAudit {
    pub mode: DebateMode,
    pub initial: EvaluationResult,
    pub review: Option<EvaluationResult>,
    pub fin: Option<EvaluationResult>,
}

/// Bounded-retry settings shared by every LLM call of one engine.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(4),
            max_backoff: Duration::from_secs(60),
        }
    }
}

/// Runs the debate protocol for one proposal. Borrows the engine's
/// shared backends, rate limiter and usage tracker for the duration of
/// one evaluation.
pub struct DebateOrchestrator<'a> {
    backend_a: &'a dyn LlmBackend,
    backend_b: Option<&'a dyn LlmBackend>,
    rate_limiter: &'a RateLimiter,
    usage: &'a TokenUsageTracker,
    retry: RetryPolicy,
}

impl<'a> DebateOrchestrator<'a> {
    pub fn new(
        backend_a: &'a dyn LlmBackend,
        backend_b: Option<&'a dyn LlmBackend>,
        rate_limiter: &'a RateLimiter,
        usage: &'a TokenUsageTracker,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            backend_a,
            backend_b,
            rate_limiter,
            usage,
            retry,
        }
    }

    /// Run the protocol appropriate for the configured backends and
    /// return the per-step audit. Merging is the score aggregator's job.
    pub async fn run(
        &self,
        proposal: &Proposal,
        criteria: &[Criterion],
        categories: &[Category],
    ) -> Result<DebateAudit, EvalError> {
        let builder = PromptBuilder::new(proposal, criteria, categories);
        match self.backend_b {
            None => self.run_single(&builder, criteria, categories).await,
            Some(backend_b) => {
                self.run_debate(&builder, backend_b, criteria, categories)
                    .await
            }
        }
    }

    async fn run_single(
        &self,
        builder: &PromptBuilder<'_>,
        criteria: &[Criterion],
        categories: &[Category],
    ) -> Result<DebateAudit, EvalError> {
        log::info!("single mode: evaluating with {} only", self.backend_a.label());
        let messages = vec![
            ChatMessage::system(builder.system_message()),
            ChatMessage::user(builder.initial_prompt()),
        ];
        let (initial, _raw) = self
            .call_step(self.backend_a, BackendId::Primary, &messages, criteria, categories, "single")
            .await?;
        Ok(DebateAudit {
            mode: DebateMode::Single,
            initial,
            review: None,
            fin: None,
        })
    }

    async fn run_debate(
        &self,
        builder: &PromptBuilder<'_>,
        backend_b: &dyn LlmBackend,
        criteria: &[Criterion],
        categories: &[Category],
    ) -> Result<DebateAudit, EvalError> {
        // Step 1: initial evaluation. The transcript started here is the
        // only conversational memory in the protocol and belongs to
        // backend A alone.
        log::info!("step 1/3: {} initial evaluation", self.backend_a.label());
        let transcript = Transcript::new()
            .with(ChatMessage::system(builder.initial_system_message()))
            .with(ChatMessage::user(builder.initial_prompt()));
        let (initial, raw_initial) = self
            .call_step(
                self.backend_a,
                BackendId::Primary,
                transcript.messages(),
                criteria,
                categories,
                "step 1/3 initial",
            )
            .await?;
        let transcript = transcript.with(ChatMessage::assistant(raw_initial));

        // Step 2: stateless peer review. Any failure here degrades the
        // debate to the initial-only result; it never aborts the run.
        log::info!("step 2/3: {} review", backend_b.label());
        let review_messages = vec![ChatMessage::user(builder.review_prompt(&initial))];
        let review = match self
            .call_step(
                backend_b,
                BackendId::Secondary,
                &review_messages,
                criteria,
                categories,
                "step 2/3 review",
            )
            .await
        {
            Ok((review, _)) => review,
            Err(err) => {
                log::warn!(
                    "reviewer {} failed ({}); degrading to initial-only result",
                    backend_b.label(),
                    err
                );
                return Ok(DebateAudit {
                    mode: DebateMode::DegradedToInitial,
                    initial,
                    review: None,
                    fin: None,
                });
            }
        };

        // Step 3: final synthesis on A's existing transcript. Failures
        // propagate and abort the whole evaluation.
        log::info!("step 3/3: {} final synthesis", self.backend_a.label());
        let transcript = transcript.with(ChatMessage::user(builder.final_prompt(&review)));
        let (fin, _raw) = self
            .call_step(
                self.backend_a,
                BackendId::Primary,
                transcript.messages(),
                criteria,
                categories,
                "step 3/3 final",
            )
            .await
            .map_err(|err| EvalError::FinalStepFailed(err.to_string()))?;

        Ok(DebateAudit {
            mode: DebateMode::Debate,
            initial,
            review: Some(review),
            fin: Some(fin),
        })
    }

    /// One logical LLM call: admit through the rate limiter, invoke,
    /// record usage, then extract -> normalize -> validate the response.
    /// Wrapped in the bounded retry; parse defects share the budget with
    /// transport faults, since re-prompting can fix malformed JSON.
    async fn call_step(
        &self,
        backend: &dyn LlmBackend,
        backend_id: BackendId,
        messages: &[ChatMessage],
        criteria: &[Criterion],
        categories: &[Category],
        step: &str,
    ) -> Result<(EvaluationResult, String), EvalError> {
        let mut backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.retry.initial_backoff)
            .with_max_interval(self.retry.max_backoff)
            .with_multiplier(2.0)
            .with_randomization_factor(0.5)
            .with_max_elapsed_time(None)
            .build();

        let mut attempt = 0;
        loop {
            attempt += 1;
            if attempt > 1 {
                log::info!("{} ({}): retry attempt {}", backend.label(), step, attempt);
            }

            match self
                .attempt_step(backend, backend_id, messages, criteria, categories, step)
                .await
            {
                Ok(outcome) => return Ok(outcome),
                Err(err) => {
                    if !err.is_retryable() || attempt >= self.retry.max_attempts {
                        log::error!(
                            "{} ({}) failed after {} attempt(s): {}",
                            backend.label(),
                            step,
                            attempt,
                            err
                        );
                        return Err(err);
                    }

                    let delay = backoff
                        .next_backoff()
                        .unwrap_or(self.retry.max_backoff);
                    // Small extra jitter so parallel evaluators do not
                    // retry in lockstep.
                    let jitter = rand::thread_rng().gen_range(0..=200);
                    let delay = delay + Duration::from_millis(jitter);
                    log::warn!(
                        "{} ({}): retryable error ({}); retrying in {:?}",
                        backend.label(),
                        step,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn attempt_step(
        &self,
        backend: &dyn LlmBackend,
        backend_id: BackendId,
        messages: &[ChatMessage],
        criteria: &[Criterion],
        categories: &[Category],
        step: &str,
    ) -> Result<(EvaluationResult, String), EvalError> {
        self.rate_limiter.admit().await;

        let response = backend.invoke(messages).await.map_err(EvalError::Backend)?;
        self.usage.record(backend_id, response.usage.as_ref()).await;
        log::debug!(
            "{} ({}) raw response:\n{}",
            backend.label(),
            step,
            response.content
        );

        let value = parse_model_response(&response.content)?;
        let result = decode_result(value)?;

        // Advisory only: log drift, keep the result.
        if let Err(quality) = validate_result(&result, criteria, categories) {
            log::warn!("{} ({}): {}", backend.label(), step, quality);
        }

        Ok((result, response.content))
    }
}
