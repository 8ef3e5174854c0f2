//! # Interactive Research CLI
//!
//! Runs one research session from the terminal:
//! 1. A triage agent decides whether the query needs clarifying questions
//! 2. You answer them (or type `/end` to stop)
//! 3. The agent plans searches, searches the web and writes a report
//! 4. The report is saved as markdown and, if fonts are available, as PDF
//!
//! ## Quick Start
//! ```bash
//! cargo run -- "Caribbean vacation spots in April"
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use interactive_research::agent::ResearchAgent;
use interactive_research::render::PdfRenderer;
use interactive_research::{
    Config, InteractiveResearchWorkflow, ResearchOutcome, ResearchResult, SessionError,
};

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
#[derive(Parser, Debug)]
#[command(
    name = "interactive-research",
    version,
    about = "An AI research assistant that asks clarifying questions before it researches",
    long_about = r#"
Interactive Research - clarify first, research second.

Before researching, the agent checks whether your query is ambiguous and, if so,
asks a few clarifying questions. Your answers are folded into the query, then it:
  1. Plans a set of web searches
  2. Runs and summarises them
  3. Writes a markdown report (and a PDF when fonts are available)

PREREQUISITES:
  1. Install Ollama: https://ollama.ai
  2. Pull a model: ollama pull llama3.2
  3. Start Ollama: ollama serve

EXAMPLES:
  # Interactive research with clarifying questions
  interactive-research "best pizza in Rome"

  # Skip clarifications and research the query as is
  interactive-research --direct "Rust web frameworks 2025"

  # Add a hero image to the PDF
  interactive-research --image cover.png "Caribbean vacation spots in April"

IMAGES:
  No image is generated for the report. The PDF only carries a hero image
  when you supply one with --image.
"#
)]
struct Args {
    /// The research topic or question to investigate
    #[arg(value_name = "QUERY")]
    query: String,

    /// The Ollama model to use (overrides OLLAMA_MODEL env var)
    #[arg(short = 'm', long = "model", env = "OLLAMA_MODEL")]
    model: Option<String>,

    /// Research the query directly, without clarifying questions
    #[arg(short = 'd', long = "direct", default_value = "false")]
    direct: bool,

    /// Do not render a PDF
    #[arg(long = "no-pdf", default_value = "false")]
    no_pdf: bool,

    /// Image to place under the PDF title (none is generated otherwise)
    #[arg(long = "image", value_name = "PATH")]
    image: Option<PathBuf>,

    /// Where to save the markdown report
    #[arg(short = 'o', long = "output", default_value = "research_report.md")]
    output: PathBuf,

    /// Enable verbose/debug logging
    #[arg(short = 'v', long = "verbose", default_value = "false")]
    verbose: bool,
}

// =============================================================================
// MAIN FUNCTION
// =============================================================================
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::from_env()?;
    init_logging(args.verbose, &config.log_level)?;

    info!("Interactive research agent starting up...");

    if let Some(model) = args.model.clone() {
        info!(model = %model, "Using model from command line");
        config.model = model;
    }
    config.validate()?;

    info!(
        model = %config.model,
        host = %config.ollama_host,
        "Configuration loaded"
    );

    let agent = Arc::new(ResearchAgent::new(config.clone())?);
    let mut workflow = InteractiveResearchWorkflow::new(agent.clone(), agent);
    if !args.no_pdf {
        workflow = workflow.with_renderer(Arc::new(PdfRenderer::from_config(&config)));
    }
    if let Some(image) = &args.image {
        workflow = workflow.with_hero_image(image);
    }
    let workflow = Arc::new(workflow);

    let outcome = if args.direct {
        info!("Running direct research mode");
        workflow
            .run_direct(&args.query)
            .await
            .map(ResearchOutcome::Completed)
            .map_err(anyhow::Error::from)
    } else {
        info!("Running interactive research mode");
        run_interactive(workflow, &args.query).await
    };

    match outcome {
        Ok(ResearchOutcome::Completed(result)) => {
            print_result(&result, &args.output)?;
            info!("Research completed successfully");
        }
        Ok(other) => println!("\n{}", other),
        Err(e) => {
            error!(error = %e, "Research failed");
            eprintln!("\nResearch failed: {}", e);

            if e.to_string().contains("connection refused") {
                eprintln!("\nTip: Make sure Ollama is running:");
                eprintln!("   ollama serve");
            } else if e.to_string().contains("model") {
                eprintln!("\nTip: Make sure the model is installed:");
                eprintln!("   ollama pull llama3.2");
            }
            return Err(e);
        }
    }

    Ok(())
}

// =============================================================================
// INTERACTIVE SESSION
// =============================================================================
/// Start a session, ask its questions on the terminal, and wait for the driver.
async fn run_interactive(
    workflow: Arc<InteractiveResearchWorkflow>,
    query: &str,
) -> Result<ResearchOutcome> {
    let driver = tokio::spawn({
        let workflow = workflow.clone();
        async move { workflow.run().await }
    });

    println!("Starting research: {}", query);
    let mut session = match workflow.start(query).await {
        Ok(session) => session,
        Err(e) => {
            driver.abort();
            return Err(e.into());
        }
    };

    if session.is_collecting() {
        println!(
            "\nI have {} clarifying question(s). Type /end to stop.",
            session.questions().len()
        );
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(question) = session.current_question().map(str::to_string) {
        let index = session.current_question_index;
        println!("\n[{}/{}] {}", index + 1, session.questions().len(), question);
        print!("> ");
        std::io::stdout().flush()?;

        let line = match lines.next_line().await? {
            Some(line) if line.trim() != "/end" => line,
            _ => {
                workflow.end();
                break;
            }
        };

        match workflow.answer_one(index, &line).await {
            Ok(updated) => session = updated,
            Err(SessionError::Validation(message)) => println!("{}", message),
            Err(e) => {
                driver.abort();
                return Err(e.into());
            }
        }
    }

    if !workflow.is_ended() {
        println!("\nResearch in progress...");
        println!("   Planning searches");
        println!("   Gathering information");
        println!("   Compiling report");
    }

    let outcome = driver.await.context("research driver task failed")??;
    Ok(outcome)
}

fn print_result(result: &ResearchResult, output: &Path) -> Result<()> {
    std::fs::write(output, &result.markdown_report)
        .with_context(|| format!("Failed to write report to {}", output.display()))?;

    println!("\n{}", "=".repeat(60));
    println!("RESEARCH RESULTS");
    println!("{}\n", "=".repeat(60));
    println!("Markdown report saved to: {}", output.display());
    match &result.pdf_file_path {
        Some(path) => println!("PDF report saved to: {}", path.display()),
        None => println!("PDF generation not available (continuing with markdown only)"),
    }

    println!("\nSummary: {}", result.short_summary);
    if !result.follow_up_questions.is_empty() {
        println!("\nFollow-up questions:");
        for (i, question) in result.follow_up_questions.iter().enumerate() {
            println!("   {}. {}", i + 1, question);
        }
    }

    println!("\n{}", "=".repeat(60));
    println!("{}", result.markdown_report);
    println!("{}", "=".repeat(60));
    Ok(())
}

// =============================================================================
// LOGGING INITIALIZATION
// =============================================================================
/// Install the global tracing subscriber.
fn init_logging(verbose: bool, log_level: &str) -> Result<()> {
    let filter = log_filter(verbose, log_level)?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}

/// `--verbose` forces DEBUG; otherwise the configured directive applies.
fn log_filter(verbose: bool, log_level: &str) -> Result<EnvFilter> {
    let directive = if verbose { "debug" } else { log_level };
    EnvFilter::try_new(directive)
        .with_context(|| format!("Invalid log level '{}'", directive))
}
