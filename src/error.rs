//! # Error Types
//!
//! Every failure a research session can hit, grouped by who caused it:
//! - [`SessionError`]: what callers of the workflow see
//! - [`AgentError`]: failures of the LLM-backed collaborators
//! - [`SearchError`]: failures of the web search tool
//! - [`RenderError`]: PDF rendering failures (never fatal to a session)

use thiserror::Error;

/// Errors returned by the session operations and the driver.
///
/// Validation and state errors are raised before any mutation, so the
/// session is unchanged when one of them comes back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Malformed caller input (empty answer, empty bulk responses, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation is not allowed in the session's current status
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The triage step could not be reached or returned garbage
    #[error("Failed to create research session: {0}")]
    Creation(String),

    /// The research pipeline failed while the session was researching
    #[error("Research pipeline failed: {0}")]
    Pipeline(String),
}

/// Errors from the LLM agents behind triage and the research pipeline.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Agent execution failed: {0}")]
    Execution(String),

    #[error("Malformed agent output: {0}")]
    MalformedOutput(String),
}

/// Errors from the web search tool.
///
/// Must implement `std::error::Error` to be usable as a rig `Tool` error.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Failed to perform web search: {0}")]
    SearchFailed(String),

    #[error("Rate limited by search provider, please wait")]
    RateLimited,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// Errors from PDF rendering.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Font error: {0}")]
    Font(String),

    #[error("Failed to render PDF: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
