//! llm-client-rs
//!
//! LLM backend plumbing for the evaluation engine:
//! - OpenAI-compatible chat-completion HTTP client with the custom
//!   credential/correlation header set
//! - the `LlmBackend` trait that the orchestration layer programs against
//! - sliding-window rate limiting shared by all outbound calls
//! - per-backend token usage accounting

pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod rate_limiter;
pub mod usage;

pub use chat::{ChatMessage, Role, Transcript};
pub use client::{HttpLlmBackend, LlmBackend, LlmResponse};
pub use config::BackendConfig;
pub use error::LlmError;
pub use rate_limiter::RateLimiter;
pub use usage::{BackendId, TokenUsage, TokenUsageTracker, UsageSummary};
