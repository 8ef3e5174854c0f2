//! # Interactive Research
//!
//! A research agent that asks clarifying questions before it researches.
//!
//! A session starts with a query. A triage agent decides whether the query
//! needs clarifying questions; the caller answers them one at a time or all
//! at once; then a driver hands the enriched query to the research pipeline
//! (plan searches, search the web, write a report) and optionally renders
//! the report to PDF.
//!
//! - [`session`]: the session entity and its state machine
//! - [`workflow`]: the session operations and the driver
//! - [`pipeline`]: traits for the external collaborators
//! - [`agent`], [`tools`], [`render`]: the concrete collaborators

pub mod agent;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod session;
pub mod tools;
pub mod workflow;

pub use config::Config;
pub use error::{AgentError, RenderError, SearchError, SessionError};
pub use pipeline::{ReportRenderer, ResearchPipeline, Triage, TriageDecision};
pub use report::{ReportData, ResearchOutcome, ResearchResult};
pub use session::{ClarificationSession, SessionStatus};
pub use workflow::InteractiveResearchWorkflow;
