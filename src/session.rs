//! # Clarification Session
//!
//! One research interaction: the original query, the clarifying questions
//! the triage step asked, the answers collected so far, and the final report.
//!
//! All transitions live here as plain methods so they can be checked without
//! a runtime. [`crate::workflow`] wraps them in the concurrency boundary.
//!
//! ```text
//! pending ──▶ awaiting_clarifications ──▶ collecting_answers ──▶ researching ──▶ completed
//!    │                 │                                             ▲
//!    │                 └───────────── (bulk answers) ───────────────┤
//!    └──────────────────────── (no questions) ──────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::SessionError;
use crate::pipeline::TriageDecision;
use crate::report::ReportData;

/// Substituted for a clarification question nobody answered.
pub const DEFAULT_ANSWER: &str = "No specific preference";

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created, waiting for the triage step
    #[default]
    Pending,
    /// Triage asked questions; none answered yet
    AwaitingClarifications,
    /// At least one question answered one at a time
    CollectingAnswers,
    /// Ready for (or running) the research pipeline
    Researching,
    /// The report is in
    Completed,
}

impl SessionStatus {
    /// Whether `next` is a legal step forward from `self`.
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (*self, next),
            (Pending, AwaitingClarifications)
                | (Pending, Researching)
                | (AwaitingClarifications, CollectingAnswers)
                | (AwaitingClarifications, Researching)
                | (CollectingAnswers, Researching)
                | (Researching, Completed)
        )
    }

    /// Whether answers are currently accepted.
    pub fn is_collecting(&self) -> bool {
        matches!(self, Self::AwaitingClarifications | Self::CollectingAnswers)
    }

    /// No transition leads out of this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::AwaitingClarifications => "awaiting_clarifications",
            Self::CollectingAnswers => "collecting_answers",
            Self::Researching => "researching",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key under which the answer to question `index` is stored.
pub fn response_key(index: usize) -> String {
    format!("question_{}", index)
}

/// Inverse of [`response_key`].
fn parse_response_key(key: &str) -> Option<usize> {
    key.strip_prefix("question_")?.parse().ok()
}

/// State of one clarification-and-research interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarificationSession {
    pub original_query: String,

    pub status: SessionStatus,

    /// Set once by triage, never changed afterwards
    pub clarification_questions: Option<Vec<String>>,

    /// `question_<index>` -> answer
    pub clarification_responses: BTreeMap<String, String>,

    /// Next question to answer; `0..=questions.len()`
    pub current_question_index: usize,

    pub final_result: Option<String>,

    pub report_data: Option<ReportData>,
}

impl ClarificationSession {
    /// Create a pending session for `query`.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            original_query: query.into(),
            status: SessionStatus::Pending,
            clarification_questions: None,
            clarification_responses: BTreeMap::new(),
            current_question_index: 0,
            final_result: None,
            report_data: None,
        }
    }

    pub fn questions(&self) -> &[String] {
        self.clarification_questions.as_deref().unwrap_or(&[])
    }

    /// The question the next `answer_question` call must answer.
    pub fn current_question(&self) -> Option<&str> {
        if !self.status.is_collecting() {
            return None;
        }
        self.questions()
            .get(self.current_question_index)
            .map(String::as_str)
    }

    pub fn remaining_questions(&self) -> usize {
        self.questions()
            .len()
            .saturating_sub(self.current_question_index)
    }

    pub fn is_collecting(&self) -> bool {
        self.status.is_collecting()
    }

    fn transition(&mut self, next: SessionStatus) -> Result<(), SessionError> {
        if !self.status.can_transition_to(next) {
            return Err(SessionError::InvalidState(format!(
                "cannot move from {} to {}",
                self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    /// Record the triage decision on a pending session.
    pub fn apply_triage(&mut self, decision: TriageDecision) -> Result<(), SessionError> {
        if self.status != SessionStatus::Pending {
            return Err(SessionError::InvalidState(format!(
                "triage already applied. Current status: {}",
                self.status
            )));
        }

        match decision {
            TriageDecision::Clarify(questions) if !questions.is_empty() => {
                self.clarification_questions = Some(questions);
                self.transition(SessionStatus::AwaitingClarifications)
            }
            TriageDecision::Clarify(_) | TriageDecision::Proceed => {
                self.transition(SessionStatus::Researching)
            }
        }
    }

    /// Answer the question at `question_index`, which must be the current one.
    ///
    /// Returns `true` while more questions remain. Answering the last one moves
    /// the session to `researching`.
    pub fn answer_question(
        &mut self,
        question_index: usize,
        answer: &str,
    ) -> Result<bool, SessionError> {
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(SessionError::Validation("Answer cannot be empty".to_string()));
        }

        if !self.status.is_collecting() {
            return Err(SessionError::InvalidState(format!(
                "Not collecting clarifications. Current status: {}",
                self.status
            )));
        }

        if question_index != self.current_question_index {
            return Err(SessionError::InvalidState(format!(
                "expected an answer for question {}, got question {}",
                self.current_question_index, question_index
            )));
        }

        if self.status == SessionStatus::AwaitingClarifications {
            self.transition(SessionStatus::CollectingAnswers)?;
        }

        self.clarification_responses
            .insert(response_key(question_index), answer.to_string());
        self.current_question_index += 1;

        let has_more = self.current_question_index < self.questions().len();
        if !has_more {
            self.transition(SessionStatus::Researching)?;
        }
        Ok(has_more)
    }

    /// Replace all answers at once and move straight to `researching`.
    ///
    /// Questions without an entry are filled with [`DEFAULT_ANSWER`] when the
    /// query is enriched.
    pub fn answer_all(&mut self, responses: BTreeMap<String, String>) -> Result<(), SessionError> {
        if responses.is_empty() {
            return Err(SessionError::Validation(
                "Clarification responses cannot be empty".to_string(),
            ));
        }

        if self.status != SessionStatus::AwaitingClarifications {
            return Err(SessionError::InvalidState(format!(
                "Not awaiting clarifications. Current status: {}",
                self.status
            )));
        }

        let question_count = self.questions().len();
        for (key, answer) in &responses {
            match parse_response_key(key) {
                Some(index) if index < question_count => {}
                _ => {
                    return Err(SessionError::Validation(format!(
                        "unknown clarification key: {}",
                        key
                    )))
                }
            }
            if answer.trim().is_empty() {
                return Err(SessionError::Validation(format!(
                    "answer for {} cannot be empty",
                    key
                )));
            }
        }

        self.transition(SessionStatus::Researching)?;
        self.clarification_responses = responses
            .into_iter()
            .map(|(key, answer)| (key, answer.trim().to_string()))
            .collect();
        self.current_question_index = question_count;
        Ok(())
    }

    /// Store the pipeline's report and mark the session completed.
    pub fn complete(&mut self, report: ReportData) -> Result<(), SessionError> {
        self.transition(SessionStatus::Completed)?;
        self.final_result = Some(report.markdown_report.clone());
        self.report_data = Some(report);
        Ok(())
    }

    /// The query handed to the research pipeline.
    ///
    /// Sessions that asked questions get every question with its answer
    /// appended in order; sessions without questions research the bare query.
    pub fn enriched_query(&self) -> String {
        let questions = self.questions();
        if questions.is_empty() {
            return self.original_query.clone();
        }

        let mut enriched = format!(
            "Original query: {}\n\nAdditional context from clarifications:\n",
            self.original_query
        );
        for (index, question) in questions.iter().enumerate() {
            let answer = self
                .clarification_responses
                .get(&response_key(index))
                .map(String::as_str)
                .unwrap_or(DEFAULT_ANSWER);
            enriched.push_str(&format!("- {}: {}\n", question, answer));
        }
        enriched
    }
}
