//! # Collaborator Contracts
//!
//! The session core never talks to an LLM or a PDF library directly. It
//! calls these traits, and the binary plugs in [`crate::agent::ResearchAgent`]
//! and [`crate::render::PdfRenderer`]. Tests plug in scripted fakes.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::{AgentError, RenderError};
use crate::report::ReportData;

/// What the triage step decided about a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriageDecision {
    /// The query is ambiguous; ask these questions first
    Clarify(Vec<String>),

    /// The query is clear enough to research as is
    Proceed,
}

impl TriageDecision {
    /// Build a decision from a raw question list. No questions means proceed.
    pub fn from_questions(questions: Vec<String>) -> Self {
        let questions: Vec<String> = questions
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();

        if questions.is_empty() {
            Self::Proceed
        } else {
            Self::Clarify(questions)
        }
    }
}

/// Decides whether a query needs clarifying questions. Called once per session.
#[async_trait]
pub trait Triage: Send + Sync {
    async fn triage(&self, query: &str) -> Result<TriageDecision, AgentError>;
}

/// Turns a (possibly enriched) query into a report.
#[async_trait]
pub trait ResearchPipeline: Send + Sync {
    async fn research(&self, query: &str) -> Result<ReportData, AgentError>;
}

/// Renders a markdown report to a file and returns its path.
#[async_trait]
pub trait ReportRenderer: Send + Sync {
    async fn render(&self, markdown: &str, image: Option<&Path>) -> Result<PathBuf, RenderError>;
}
