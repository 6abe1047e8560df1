//! # Bloop
//!
//! An HTTP service that turns an exported chat transcript into a structured
//! analysis: deterministic conversational statistics plus an optional,
//! best-effort AI-written narrative of the chat's vibe.
//!
//! ## Overview
//!
//! One upload per request. The transcript is parsed into a normalized
//! message stream (with timestamp-layout auto-detection across US and
//! European date orderings), statistics are computed in a single pass, and
//! in parallel a curated per-sender sample is dispatched through a bounded
//! worker pool to an LLM upstream. The response combines both, degrading
//! gracefully: a failed statistics pass or a failed AI call annotates the
//! result instead of failing the request.
//!
//! ## Pipeline
//!
//! ```text
//! upload ──> parser ──> ParsedMessage stream ──┬──> stats engine ──┐
//!                                              │                   ├──> AnalysisResult
//!                                              └──> sampler ──> pool ──> LLM
//! ```
//!
//! ## Module Structure
//!
//! - [`parser`] — transcript parsing and timestamp-layout sniffing
//! - [`stats`] — single-pass statistics engine
//!   - [`stats::gap`] — dynamic conversation-break estimation
//!   - [`stats::emoji`] — emoji grapheme-cluster extraction
//! - [`sampler`] — topic segmentation and stratified sampling for the LLM
//! - [`llm`] — upstream client: prompts, retries, key rotation
//! - [`pool`] — bounded AI worker pool with admission control
//! - [`analysis`] — per-request orchestration ([`AnalysisResult`])
//! - [`server`] — axum router, handlers, middleware, lifecycle
//! - [`config`] — environment-driven configuration
//! - [`lexicon`] — stop-word and system-message side files
//! - [`cleanup`] — periodic temp-directory sweep
//! - [`error`] — unified error types ([`BloopError`], [`Result`])
//!
//! ## Library Usage
//!
//! The analysis core works without the HTTP layer:
//!
//! ```rust,no_run
//! use bloop::lexicon::Lexicon;
//! use bloop::parser::TranscriptParser;
//! use bloop::stats::{gap, StatsEngine};
//!
//! let lexicon = Lexicon::load("data");
//! let parser = TranscriptParser::new(&lexicon);
//! let outcome = parser.parse_text("[2/3/24, 10:00] Alice: hello there friend");
//!
//! let convo_break = gap::dynamic_convo_break(&outcome.messages);
//! let stats = StatsEngine::new(&lexicon)
//!     .calculate(&outcome.messages, convo_break)
//!     .unwrap();
//! assert_eq!(stats.days_active, 1);
//! ```

pub mod analysis;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod lexicon;
pub mod llm;
pub mod message;
pub mod parser;
pub mod pool;
pub mod sampler;
pub mod server;
pub mod stats;

// Re-export the main types at the crate root for convenience
pub use analysis::{AnalysisResult, Analyzer};
pub use config::Config;
pub use self::error::{BloopError, Result};
pub use message::ParsedMessage;
