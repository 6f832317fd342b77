// llm-client-rs/src/usage.rs
// Per-backend token usage accounting.

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Which backend of the debate pair a call went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendId {
    /// Backend A - the primary evaluator, holds the conversation.
    Primary,
    /// Backend B - the stateless reviewer.
    Secondary,
}

/// Token counters for one backend (or a combined total).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub api_calls: u64,
}

impl TokenUsage {
    fn add(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
        self.api_calls += other.api_calls;
    }
}

/// Point-in-time snapshot: per-backend counters plus combined totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub primary: TokenUsage,
    pub secondary: TokenUsage,
    pub combined: TokenUsage,
}

/// Accumulates token usage per backend across an engine instance's
/// lifetime. Never reset implicitly between evaluations; callers wanting
/// per-call numbers snapshot-and-reset around each call.
#[derive(Debug, Default)]
pub struct TokenUsageTracker {
    state: Mutex<(TokenUsage, TokenUsage)>,
}

impl TokenUsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successful invocation. `usage` is whatever metadata the
    /// backend reported; a call with no metadata still counts as one API
    /// call, its token fields simply stay uncounted.
    pub async fn record(&self, backend: BackendId, usage: Option<&TokenUsage>) {
        let mut state = self.state.lock().await;
        let slot = match backend {
            BackendId::Primary => &mut state.0,
            BackendId::Secondary => &mut state.1,
        };
        match usage {
            Some(u) => {
                slot.add(u);
                // Backends reporting token counts but not call counts
                // still get the invocation tallied exactly once.
                if u.api_calls == 0 {
                    slot.api_calls += 1;
                }
            }
            None => slot.api_calls += 1,
        }
    }

    pub async fn summary(&self) -> UsageSummary {
        let state = self.state.lock().await;
        let mut combined = state.0;
        combined.add(&state.1);
        UsageSummary {
            primary: state.0,
            secondary: state.1,
            combined,
        }
    }

    /// Explicit reset; the only way the counters go back to zero.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        *state = (TokenUsage::default(), TokenUsage::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(prompt: u64, completion: u64) -> TokenUsage {
        TokenUsage {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: prompt + completion,
            api_calls: 1,
        }
    }

    #[tokio::test]
    async fn accumulates_per_backend_and_combined() {
        let tracker = TokenUsageTracker::new();
        tracker.record(BackendId::Primary, Some(&usage(100, 50))).await;
        tracker.record(BackendId::Primary, Some(&usage(200, 80))).await;
        tracker.record(BackendId::Secondary, Some(&usage(120, 40))).await;

        let summary = tracker.summary().await;
        assert_eq!(summary.primary.prompt_tokens, 300);
        assert_eq!(summary.primary.api_calls, 2);
        assert_eq!(summary.secondary.total_tokens, 160);
        assert_eq!(summary.combined.total_tokens, 430 + 160);
        assert_eq!(summary.combined.api_calls, 3);
    }

    #[tokio::test]
    async fn missing_metadata_still_counts_the_call() {
        let tracker = TokenUsageTracker::new();
        tracker.record(BackendId::Primary, None).await;
        tracker.record(BackendId::Primary, Some(&usage(10, 5))).await;

        let summary = tracker.summary().await;
        assert_eq!(summary.primary.api_calls, 2);
        assert_eq!(summary.primary.total_tokens, 15);
    }

    #[tokio::test]
    async fn reset_is_explicit_and_total() {
        let tracker = TokenUsageTracker::new();
        tracker.record(BackendId::Secondary, Some(&usage(10, 10))).await;
        tracker.reset().await;
        assert_eq!(tracker.summary().await, UsageSummary::default());
    }
}
