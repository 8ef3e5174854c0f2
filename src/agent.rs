//! # Agent Module
//!
//! The LLM side of the system, built on Rig with a local Ollama model:
//! - triage: decide whether a query needs clarifying questions
//! - planner: turn a query into a handful of web searches
//! - search: run one search with the `web_search` tool and summarise it
//! - writer: turn the summaries into a structured report
//!
//! Agents answer in JSON, which is parsed with [`parse_structured`].

use async_trait::async_trait;
use futures::future::join_all;
use rig::client::{CompletionClient, Nothing};
use rig::completion::Prompt;
use rig::providers::ollama;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::AgentError;
use crate::pipeline::{ResearchPipeline, Triage, TriageDecision};
use crate::report::ReportData;
use crate::tools::WebSearchTool;

// =============================================================================
// PROMPTS
// =============================================================================
const TRIAGE_PROMPT: &str = r#"
You decide whether a research request is specific enough to research right away.

If the request is ambiguous or missing important preferences (budget, audience,
time frame, location, ...), write 2-4 short clarifying questions for the user.
If it is already clear, ask nothing.

Respond with JSON only, no prose:
{"questions": ["first question", "second question"]}
Use an empty list when no clarification is needed.
"#;

const PLANNER_PROMPT: &str = r#"
You are a research planner. Given a query, come up with a set of web searches
that together answer it. Output between 3 and 5 searches.

Respond with JSON only, no prose:
{"searches": [{"query": "search term", "reason": "why this search matters"}]}
"#;

const SEARCH_PROMPT: &str = r#"
You are a research assistant. Given a search term, use the web_search tool ONCE
and produce a concise summary of the results. The summary must be one paragraph
and less than 200 words. Capture the main points, skip the fluff, and add no
commentary beyond the summary itself.
"#;

const WRITER_PROMPT: &str = r#"
You are a senior researcher writing a comprehensive report for a research query.
You are given the original query and summaries of web searches made for it.

First outline the report, then write it in markdown: an introduction with
background, several detailed sections, analysis with concrete examples, and a
conclusion. Aim for at least 600 words.

Respond with JSON only, no prose:
{"short_summary": "2-3 sentence summary",
 "markdown_report": "the full markdown report",
 "follow_up_questions": ["topic to research further"]}
"#;

/// Tool-call rounds the search agent may take.
const SEARCH_TURNS: usize = 3;

// =============================================================================
// STRUCTURED OUTPUT
// =============================================================================
#[derive(Debug, Deserialize)]
struct TriageOutput {
    #[serde(default)]
    questions: Vec<String>,
}

/// One planned web search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSearchItem {
    pub query: String,
    pub reason: String,
}

/// Searches the planner wants performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSearchPlan {
    pub searches: Vec<WebSearchItem>,
}

/// Parse the JSON object in a model reply.
///
/// Models like to wrap JSON in code fences or a sentence of preamble, so
/// everything outside the outermost braces is ignored.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, AgentError> {
    let start = raw.find('{');
    let end = raw.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => {
            return Err(AgentError::MalformedOutput(format!(
                "no JSON object in reply: {}",
                truncate(raw, 200)
            )))
        }
    };

    serde_json::from_str(json).map_err(|e| AgentError::MalformedOutput(e.to_string()))
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

// =============================================================================
// RESEARCH AGENT
// =============================================================================
/// LLM-backed triage and research pipeline.
pub struct ResearchAgent {
    config: Config,
    client: ollama::Client,
    search_tool: WebSearchTool,
}

impl ResearchAgent {
    /// Build the agent and its Ollama client from `config.ollama_host`.
    pub fn new(config: Config) -> Result<Self, AgentError> {
        let client = ollama::Client::builder()
            .api_key(Nothing)
            .base_url(&config.ollama_host)
            .build()
            .map_err(|e| AgentError::Execution(format!("failed to build Ollama client: {}", e)))?;

        let search_tool = WebSearchTool::new(config.max_search_results);
        Ok(Self {
            config,
            client,
            search_tool,
        })
    }

    /// Run one prompt against a fresh agent with the given preamble.
    ///
    /// With `with_search` the agent gets the `web_search` tool and may take
    /// several tool-call rounds.
    async fn prompt(&self, preamble: &str, input: &str, with_search: bool) -> Result<String, AgentError> {
        let builder = self
            .client
            .agent(&self.config.model)
            .preamble(preamble)
            .temperature(f64::from(self.config.temperature));

        let response = if with_search {
            builder
                .tool(self.search_tool.clone())
                .build()
                .prompt(input)
                .multi_turn(SEARCH_TURNS)
                .await
        } else {
            builder.build().prompt(input).await
        };

        response.map_err(|e| AgentError::Execution(e.to_string()))
    }

    /// Ask the planner which searches to run, capped at `max_searches`.
    pub async fn plan_searches(&self, query: &str) -> Result<WebSearchPlan, AgentError> {
        let raw = self
            .prompt(PLANNER_PROMPT, &format!("Query: {}", query), false)
            .await?;
        let mut plan: WebSearchPlan = parse_structured(&raw)?;

        plan.searches.retain(|item| !item.query.trim().is_empty());
        plan.searches.truncate(self.config.max_searches);
        if plan.searches.is_empty() {
            return Err(AgentError::MalformedOutput("planner returned no searches".to_string()));
        }

        info!(count = plan.searches.len(), "Search plan ready");
        Ok(plan)
    }

    /// Run every planned search concurrently. Failed searches are dropped.
    pub async fn perform_searches(&self, plan: &WebSearchPlan) -> Vec<String> {
        let results = join_all(plan.searches.iter().map(|item| self.search(item))).await;
        let summaries: Vec<String> = results.into_iter().flatten().collect();

        info!(
            planned = plan.searches.len(),
            completed = summaries.len(),
            "Searches finished"
        );
        summaries
    }

    async fn search(&self, item: &WebSearchItem) -> Option<String> {
        let input = format!("Search term: {}\nReason for searching: {}", item.query, item.reason);
        match self.prompt(SEARCH_PROMPT, &input, true).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(query = %item.query, error = %e, "Search failed, skipping");
                None
            }
        }
    }

    /// Write the final report from the search summaries.
    pub async fn write_report(&self, query: &str, summaries: &[String]) -> Result<ReportData, AgentError> {
        let input = format!(
            "Original query: {}\nSummarized search results: {:?}",
            query, summaries
        );
        let raw = self.prompt(WRITER_PROMPT, &input, false).await?;
        let report: ReportData = parse_structured(&raw)?;

        if report.markdown_report.trim().is_empty() {
            return Err(AgentError::MalformedOutput("writer returned an empty report".to_string()));
        }
        Ok(report)
    }
}

#[async_trait]
impl Triage for ResearchAgent {
    async fn triage(&self, query: &str) -> Result<TriageDecision, AgentError> {
        info!(query = %query, "Checking whether clarifications are needed");
        let raw = self.prompt(TRIAGE_PROMPT, query, false).await?;
        debug!(reply = %raw, "Triage reply");

        let output: TriageOutput = parse_structured(&raw)?;
        Ok(TriageDecision::from_questions(output.questions))
    }
}

#[async_trait]
impl ResearchPipeline for ResearchAgent {
    async fn research(&self, query: &str) -> Result<ReportData, AgentError> {
        info!("Planning searches");
        let plan = self.plan_searches(query).await?;

        info!("Gathering information");
        let summaries = self.perform_searches(&plan).await;

        info!("Compiling report");
        self.write_report(query, &summaries).await
    }
}
