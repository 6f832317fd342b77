// eval-engine-rs/src/engine.rs
// The engine facade: owns the backends and the shared limiter/usage
// state, runs single evaluations and sequential batches, and reduces
// debate audits to a weighted grade.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use eval_types_rs::{default_categories, Category, Criterion, EvaluationResult, Grade, Proposal};
use llm_client_rs::{
    BackendConfig, HttpLlmBackend, LlmBackend, RateLimiter, TokenUsageTracker, UsageSummary,
};

use crate::error::EvalError;
use crate::orchestrator::{DebateAudit, DebateMode, DebateOrchestrator, RetryPolicy};
use crate::score::{calculate_simple_average, calculate_weighted_score, grade_for, merge_debate_results};
use crate::validate::{validate_result, EvaluationQualityError};

// Reference deployment allowance: 20 calls per minute across backends.
const DEFAULT_RATE_MAX_CALLS: usize = 20;
const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(60);

/// Everything one evaluation produced: the merged result, its weighted
/// grade, the advisory quality findings, the per-step audit trail, and a
/// usage snapshot taken when the run completed.
#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    pub proposal_id: i64,
    pub result: EvaluationResult,
    pub weighted_score: f64,
    pub grade: Grade,
    /// Advisory validation findings over the merged result; `Some` never
    /// blocks, it flags model drift for manual review.
    pub quality: Option<EvaluationQualityError>,
    pub mode: DebateMode,
    pub audit: DebateAudit,
    /// Cumulative usage at completion time (instance lifetime, not
    /// per-call; snapshot-and-reset around a call for isolation).
    pub usage: UsageSummary,
    pub evaluated_at: DateTime<Utc>,
}

/// One proposal that could not be evaluated.
#[derive(Debug, Clone)]
pub struct FailedEvaluation {
    pub proposal_id: i64,
    pub error: String,
}

/// Result of a sequential batch: failures are isolated per proposal and
/// reported alongside the successes.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub succeeded: Vec<EvaluationOutcome>,
    pub failed: Vec<FailedEvaluation>,
}

/// The evaluation engine. Construct once per process and share by
/// reference; the rate limiter's call history and the token counters are
/// the only state that outlives a single evaluation.
pub struct EvaluationEngine {
    backend_a: Arc<dyn LlmBackend>,
    backend_b: Option<Arc<dyn LlmBackend>>,
    rate_limiter: RateLimiter,
    usage: TokenUsageTracker,
    retry: RetryPolicy,
}

impl EvaluationEngine {
    /// Build an engine over explicit backends. Supplying `backend_b`
    /// enables the three-step debate protocol.
    pub fn new(backend_a: Arc<dyn LlmBackend>, backend_b: Option<Arc<dyn LlmBackend>>) -> Self {
        Self {
            backend_a,
            backend_b,
            rate_limiter: RateLimiter::new(DEFAULT_RATE_MAX_CALLS, DEFAULT_RATE_WINDOW),
            usage: TokenUsageTracker::new(),
            retry: RetryPolicy::default(),
        }
    }

    /// Build HTTP backends from `LLM_*` / `LLM_B_*` environment
    /// variables. Debate mode turns on when the secondary backend is
    /// fully configured.
    pub fn from_env() -> Self {
        llm_client_rs::config::load_dotenv();
        let primary = BackendConfig::primary_from_env();
        let secondary = BackendConfig::secondary_from_env();

        match &secondary {
            Some(cfg) => log::info!(
                "ensemble mode enabled: LLM A ({}) + LLM B ({})",
                primary.model_name,
                cfg.model_name
            ),
            None => log::info!("single LLM mode: {}", primary.model_name),
        }

        let backend_a: Arc<dyn LlmBackend> = Arc::new(HttpLlmBackend::new("LLM A", primary));
        let backend_b: Option<Arc<dyn LlmBackend>> =
            secondary.map(|cfg| Arc::new(HttpLlmBackend::new("LLM B", cfg)) as Arc<dyn LlmBackend>);
        Self::new(backend_a, backend_b)
    }

    pub fn with_rate_limit(mut self, max_calls: usize, window: Duration) -> Self {
        self.rate_limiter = RateLimiter::new(max_calls, window);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Evaluate one proposal against the supplied criteria. The valid
    /// category set is the caller's active categories, or the hardcoded
    /// six-item default when none are supplied.
    pub async fn evaluate(
        &self,
        proposal: &Proposal,
        criteria: &[Criterion],
        categories: Option<&[Category]>,
    ) -> Result<EvaluationOutcome, EvalError> {
        let criteria = active_criteria(criteria);
        let categories = valid_categories(categories);

        log::info!(
            "evaluating proposal {} ({})",
            proposal.id,
            proposal.subject.as_deref().unwrap_or("N/A")
        );

        let orchestrator = DebateOrchestrator::new(
            self.backend_a.as_ref(),
            self.backend_b.as_deref(),
            &self.rate_limiter,
            &self.usage,
            self.retry,
        );
        let audit = orchestrator.run(proposal, &criteria, &categories).await?;

        let result = merge_debate_results(&audit.initial, audit.review.as_ref(), audit.fin.as_ref());

        // Weighted over the caller's criteria; plain average fallback
        // when no criteria were supplied at all.
        let weighted_score = if criteria.is_empty() {
            calculate_simple_average(&result)
        } else {
            calculate_weighted_score(&result, &criteria)
        };
        let grade = grade_for(weighted_score);

        let quality = match validate_result(&result, &criteria, &categories) {
            Ok(()) => None,
            Err(err) => {
                log::warn!("proposal {}: {}", proposal.id, err);
                Some(err)
            }
        };

        log::info!(
            "proposal {} evaluated: grade {} (weighted {:.2}, {:?})",
            proposal.id,
            grade,
            weighted_score,
            audit.mode
        );

        Ok(EvaluationOutcome {
            proposal_id: proposal.id,
            result,
            weighted_score,
            grade,
            quality,
            mode: audit.mode,
            audit,
            usage: self.usage.summary().await,
            evaluated_at: Utc::now(),
        })
    }

    /// Evaluate proposals sequentially with the same criteria and
    /// category set. One proposal's failure is caught and recorded; it
    /// never aborts the rest of the batch.
    pub async fn evaluate_batch(
        &self,
        proposals: &[Proposal],
        criteria: &[Criterion],
        categories: Option<&[Category]>,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for proposal in proposals {
            match self.evaluate(proposal, criteria, categories).await {
                Ok(evaluated) => outcome.succeeded.push(evaluated),
                Err(err) => {
                    log::error!("proposal {} failed: {}", proposal.id, err);
                    outcome.failed.push(FailedEvaluation {
                        proposal_id: proposal.id,
                        error: err.to_string(),
                    });
                }
            }
        }
        log::info!(
            "batch finished: {} succeeded, {} failed",
            outcome.succeeded.len(),
            outcome.failed.len()
        );
        outcome
    }

    /// Cumulative token usage since construction or the last reset.
    pub async fn usage_summary(&self) -> UsageSummary {
        self.usage.summary().await
    }

    /// Explicitly zero the token counters.
    pub async fn reset_usage(&self) {
        self.usage.reset().await;
    }

    /// Advisory view of the rate limiter.
    pub async fn remaining_calls(&self) -> usize {
        self.rate_limiter.remaining_calls().await
    }
}

fn active_criteria(criteria: &[Criterion]) -> Vec<Criterion> {
    let mut active: Vec<Criterion> = criteria.iter().filter(|c| c.is_active).cloned().collect();
    active.sort_by_key(|c| c.display_order);
    active
}

fn valid_categories(categories: Option<&[Category]>) -> Vec<Category> {
    let supplied: Vec<Category> = categories
        .unwrap_or(&[])
        .iter()
        .filter(|c| c.is_active)
        .cloned()
        .collect();
    if supplied.is_empty() {
        default_categories()
    } else {
        let mut sorted = supplied;
        sorted.sort_by_key(|c| c.display_order);
        sorted
    }
}
