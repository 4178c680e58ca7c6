#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Generated commentary over problem statistics, cached per scope.
//!
//! [`AnalysisCache`] turns a scope (district, category, or the whole city)
//! into natural-language commentary. Each scope is generated at most once
//! at a time: concurrent callers wait for the caller doing the work, and
//! the result is persisted so later calls and restarts are served without
//! another provider round trip. The pop forecast pairs two short,
//! uncached generations under a caller-supplied cancellation signal.

pub mod cache;
pub mod config;
pub mod prompts;

pub use cache::AnalysisCache;
pub use config::AnalysisConfig;

use problem_map_ai::AiError;
use problem_map_analytics::AnalyticsError;
use problem_map_database::DbError;
use problem_map_problem_models::Scope;
use thiserror::Error;

use crate::prompts::RenderError;

/// Errors that can occur while producing an analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The scope id does not name a known district or category.
    #[error("Unknown {kind} {id}")]
    UnknownScope {
        /// Scope kind (`district` or `category`).
        kind: &'static str,
        /// The id that was not found.
        id: i64,
    },

    /// No analysis could be produced for the scope.
    #[error("Analysis for {scope} unavailable: {reason}")]
    Unavailable {
        /// The scope that was requested.
        scope: Scope,
        /// Why it failed.
        #[source]
        reason: UnavailableReason,
    },

    /// The caller's cancellation signal fired first.
    #[error("Analysis cancelled")]
    Cancelled,

    /// A store lookup failed while validating the scope.
    #[error("Store error: {0}")]
    Store(#[from] DbError),
}

/// Underlying cause of [`AnalysisError::Unavailable`].
#[derive(Debug, Error)]
pub enum UnavailableReason {
    /// The provider failed or returned an answer of the wrong shape.
    #[error("generation failed: {0}")]
    GenerationFailed(#[from] AiError),

    /// Reading statistics or persisting the result failed.
    #[error("store error: {0}")]
    Store(#[from] DbError),

    /// Aggregating the statistics failed.
    #[error("statistics error: {0}")]
    Stats(#[from] AnalyticsError),

    /// The prompt could not be built.
    #[error("prompt error: {0}")]
    Prompt(#[from] RenderError),

    /// Another caller kept failing or stalling on the same scope.
    #[error("gave up after waiting {attempts} times")]
    AttemptsExhausted {
        /// How many times the caller waited.
        attempts: u32,
    },
}

impl UnavailableReason {
    /// Whether the failure came from the store rather than the provider.
    #[must_use]
    pub const fn is_store(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Stats(_))
    }
}
