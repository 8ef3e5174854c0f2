//! # Interactive Research Workflow
//!
//! Owns one [`ClarificationSession`] and the driver that researches it.
//!
//! # Concurrency
//!
//! - Every write goes through `writer` (a tokio mutex), so operations never
//!   interleave partial updates, including across the triage call in `start`.
//! - The latest snapshot is published on a `watch` channel. `status()` reads
//!   it without locking, and the driver waits on it.
//! - `end()` only flips a flag inside the channel and never waits for anything.
//!   Once it is set, `start` and the answer operations are rejected.
//! - Only the driver calls the research pipeline, and it does so without
//!   holding `writer`, so callers stay responsive while research runs.
//!
//! # Usage
//!
//! ```ignore
//! let workflow = Arc::new(InteractiveResearchWorkflow::new(triage, pipeline));
//! let driver = tokio::spawn({
//!     let workflow = workflow.clone();
//!     async move { workflow.run().await }
//! });
//!
//! workflow.start("best pizza in Rome").await?;
//! workflow.answer_one(0, "vegetarian").await?;
//! let outcome = driver.await??;
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::error::SessionError;
use crate::pipeline::{ReportRenderer, ResearchPipeline, Triage};
use crate::report::{ReportData, ResearchOutcome, ResearchResult};
use crate::session::{ClarificationSession, SessionStatus};

/// What the driver waits on.
#[derive(Debug, Clone, Default)]
struct WorkflowState {
    session: Option<ClarificationSession>,
    ended: bool,
}

impl WorkflowState {
    /// Wake-up condition for the driver. `ended` wins over everything else.
    fn ready(&self) -> bool {
        self.ended
            || self.session.as_ref().is_some_and(|s| {
                s.status == SessionStatus::Researching || s.status.is_terminal()
            })
    }
}

/// A single interactive research session plus its driver.
pub struct InteractiveResearchWorkflow {
    triage: Arc<dyn Triage>,
    pipeline: Arc<dyn ResearchPipeline>,
    renderer: Option<Arc<dyn ReportRenderer>>,
    hero_image: Option<PathBuf>,

    writer: Mutex<()>,
    state: watch::Sender<WorkflowState>,
}

impl InteractiveResearchWorkflow {
    pub fn new(triage: Arc<dyn Triage>, pipeline: Arc<dyn ResearchPipeline>) -> Self {
        let (state, _) = watch::channel(WorkflowState::default());
        Self {
            triage,
            pipeline,
            renderer: None,
            hero_image: None,
            writer: Mutex::new(()),
            state,
        }
    }

    /// Render finished reports with `renderer`.
    pub fn with_renderer(mut self, renderer: Arc<dyn ReportRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Image placed under the title of rendered reports.
    pub fn with_hero_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.hero_image = Some(path.into());
        self
    }

    // =========================================================================
    // SESSION OPERATIONS
    // =========================================================================

    /// Create the session and run triage on it.
    ///
    /// If triage fails the session is discarded and the error is returned;
    /// nothing half-built stays visible.
    pub async fn start(&self, query: &str) -> Result<ClarificationSession, SessionError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SessionError::Validation("Query cannot be empty".to_string()));
        }

        let _guard = self.writer.lock().await;
        self.ensure_not_ended()?;
        if let Some(existing) = &self.state.borrow().session {
            return Err(SessionError::InvalidState(format!(
                "a research session already exists. Current status: {}",
                existing.status
            )));
        }

        info!(query = %query, "Starting research session");
        let mut session = ClarificationSession::new(query);
        self.publish(&session);

        let decision = match self.triage.triage(query).await {
            Ok(decision) => decision,
            Err(e) => {
                error!(error = %e, "Triage failed");
                self.state.send_modify(|state| state.session = None);
                return Err(SessionError::Creation(e.to_string()));
            }
        };

        session.apply_triage(decision)?;
        info!(
            status = %session.status,
            questions = session.questions().len(),
            "Triage finished"
        );
        self.publish(&session);
        Ok(session)
    }

    /// Answer the current clarification question.
    pub async fn answer_one(
        &self,
        question_index: usize,
        answer: &str,
    ) -> Result<ClarificationSession, SessionError> {
        let _guard = self.writer.lock().await;
        self.ensure_not_ended()?;
        let mut session = self.active_session()?;

        let has_more = session.answer_question(question_index, answer)?;
        debug!(question_index, has_more, "Clarification recorded");
        if !has_more {
            info!("All clarifications answered, ready to research");
        }

        self.publish(&session);
        Ok(session)
    }

    /// Answer every clarification question at once.
    pub async fn answer_all(
        &self,
        responses: BTreeMap<String, String>,
    ) -> Result<ClarificationSession, SessionError> {
        let _guard = self.writer.lock().await;
        self.ensure_not_ended()?;
        let mut session = self.active_session()?;

        session.answer_all(responses)?;
        info!(
            answered = session.clarification_responses.len(),
            questions = session.questions().len(),
            "Clarifications provided in bulk, ready to research"
        );

        self.publish(&session);
        Ok(session)
    }

    /// End the session. The driver returns [`ResearchOutcome::EndedByUser`]
    /// unless research has already started.
    ///
    /// An ended session accepts no further `start` or answers. A pipeline
    /// call already in flight still completes.
    pub fn end(&self) {
        info!("Ending research session");
        self.state.send_modify(|state| state.ended = true);
    }

    /// Latest snapshot of the session, if one was started.
    pub fn status(&self) -> Option<ClarificationSession> {
        self.state.borrow().session.clone()
    }

    pub fn is_ended(&self) -> bool {
        self.state.borrow().ended
    }

    /// Callers hold `writer`, so no mutation can slip in after the check.
    fn ensure_not_ended(&self) -> Result<(), SessionError> {
        if self.is_ended() {
            return Err(SessionError::InvalidState("research session ended".to_string()));
        }
        Ok(())
    }

    fn active_session(&self) -> Result<ClarificationSession, SessionError> {
        self.status()
            .ok_or_else(|| SessionError::InvalidState("No active research session".to_string()))
    }

    /// Publish a session snapshot without touching the `ended` flag.
    fn publish(&self, session: &ClarificationSession) {
        let session = session.clone();
        self.state.send_modify(move |state| state.session = Some(session));
    }

    // =========================================================================
    // DRIVER
    // =========================================================================

    /// Wait until the session is ended or ready to research, then finish it.
    pub async fn run(&self) -> Result<ResearchOutcome, SessionError> {
        let mut receiver = self.state.subscribe();
        let state = receiver
            .wait_for(WorkflowState::ready)
            .await
            .map_err(|e| SessionError::InvalidState(format!("session state closed: {}", e)))?
            .clone();

        if state.ended {
            info!("Research session ended by user");
            return Ok(ResearchOutcome::EndedByUser);
        }

        let Some(session) = state.session else {
            return Ok(ResearchOutcome::NoResearch);
        };

        let report = match session.status {
            SessionStatus::Researching => self.research(&session).await?,
            SessionStatus::Completed => match session.report_data {
                Some(report) => report,
                None => return Ok(ResearchOutcome::NoResearch),
            },
            SessionStatus::Pending
            | SessionStatus::AwaitingClarifications
            | SessionStatus::CollectingAnswers => return Ok(ResearchOutcome::NoResearch),
        };

        let pdf_file_path = self.render(&report).await;
        Ok(ResearchOutcome::Completed(ResearchResult::new(report, pdf_file_path)))
    }

    /// Research a query directly, without a clarification session.
    pub async fn run_direct(&self, query: &str) -> Result<ResearchResult, SessionError> {
        info!(query = %query, "Running direct research");
        let report = self.pipeline.research(query).await.map_err(|e| {
            error!(error = %e, "Research pipeline failed");
            SessionError::Pipeline(e.to_string())
        })?;

        let pdf_file_path = self.render(&report).await;
        Ok(ResearchResult::new(report, pdf_file_path))
    }

    async fn research(&self, session: &ClarificationSession) -> Result<ReportData, SessionError> {
        let query = session.enriched_query();
        info!(query = %session.original_query, "Running research pipeline");
        debug!(enriched_query = %query, "Enriched query");

        let report = self.pipeline.research(&query).await.map_err(|e| {
            error!(error = %e, "Research pipeline failed");
            SessionError::Pipeline(e.to_string())
        })?;

        let _guard = self.writer.lock().await;
        let mut current = self.active_session()?;
        current.complete(report.clone())?;
        self.publish(&current);
        info!("Research completed");

        Ok(report)
    }

    async fn render(&self, report: &ReportData) -> Option<PathBuf> {
        let renderer = self.renderer.as_ref()?;
        match renderer
            .render(&report.markdown_report, self.hero_image.as_deref())
            .await
        {
            Ok(path) => {
                info!(path = %path.display(), "PDF generated");
                Some(path)
            }
            Err(e) => {
                warn!(error = %e, "PDF generation failed, continuing with markdown only");
                None
            }
        }
    }
}
