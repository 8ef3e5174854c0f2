//! # Report Types
//!
//! What the research pipeline produces and what the driver hands back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Text returned for a session that was ended before research ran.
pub const ENDED_BY_USER: &str = "Research workflow ended by user";

/// Text returned when no research result exists.
pub const NO_RESEARCH: &str = "No research completed";

/// Structured report written by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportData {
    /// A short 2-3 sentence summary of the findings
    pub short_summary: String,

    /// The full report in markdown
    pub markdown_report: String,

    /// Suggested topics to research further
    #[serde(default)]
    pub follow_up_questions: Vec<String>,
}

/// The externally visible result of a completed research run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub short_summary: String,
    pub markdown_report: String,
    pub follow_up_questions: Vec<String>,

    /// Rendered PDF, absent when rendering is disabled or failed
    pub pdf_file_path: Option<PathBuf>,
}

impl ResearchResult {
    pub fn new(report: ReportData, pdf_file_path: Option<PathBuf>) -> Self {
        Self {
            short_summary: report.short_summary,
            markdown_report: report.markdown_report,
            follow_up_questions: report.follow_up_questions,
            pdf_file_path,
        }
    }
}

/// How a driven session finished.
///
/// Failures are not an outcome; they come back as `Err(SessionError)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResearchOutcome {
    /// Research ran and produced a report
    Completed(ResearchResult),

    /// The session was ended before research started
    EndedByUser,

    /// The driver woke up without anything to report
    NoResearch,
}

impl ResearchOutcome {
    pub fn result(&self) -> Option<&ResearchResult> {
        match self {
            Self::Completed(result) => Some(result),
            Self::EndedByUser | Self::NoResearch => None,
        }
    }
}

impl fmt::Display for ResearchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed(result) => f.write_str(&result.markdown_report),
            Self::EndedByUser => f.write_str(ENDED_BY_USER),
            Self::NoResearch => f.write_str(NO_RESEARCH),
        }
    }
}
