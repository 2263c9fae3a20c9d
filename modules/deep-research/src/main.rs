use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use deep_research::feedback::DEFAULT_MAX_QUESTIONS;
use deep_research::{
    combine_query, generate_feedback, Config, ProgressSink, ReportSynthesizer, ResearchOrchestrator,
    ResearchProgress, ResearchResult, WebSearch,
};

#[derive(Parser, Debug)]
#[command(name = "deep-research", about = "Iterative deep research on any topic")]
struct Args {
    /// What to research. Asked for interactively when omitted.
    #[arg(short, long)]
    query: Option<String>,

    /// Search queries per level; halves at each level down.
    #[arg(short, long, default_value_t = 4)]
    breadth: usize,

    /// Levels of follow-up research.
    #[arg(short, long, default_value_t = 2)]
    depth: usize,

    /// Where the final report is written.
    #[arg(short, long, default_value = "output.md")]
    output: PathBuf,

    /// Skip the clarifying questions.
    #[arg(long)]
    no_feedback: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let directive = if args.verbose {
        "deep_research=debug,ai_client=debug,firecrawl_client=debug"
    } else {
        "deep_research=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive)),
        )
        .init();

    let config = Config::from_env()?;
    config.log_redacted();

    let generator = config.generator()?;
    let searcher: Arc<dyn WebSearch> = Arc::new(config.searcher());
    let options = config.research_options();
    let report_budget = options.report_budget;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    let initial_query = match args.query {
        Some(q) if !q.trim().is_empty() => q,
        _ => ask(&mut stdin, "What would you like to research?").await?,
    };
    if initial_query.trim().is_empty() {
        bail!("No research query given");
    }

    let mut answers = Vec::new();
    if !args.no_feedback {
        match generate_feedback(generator.as_ref(), &initial_query, DEFAULT_MAX_QUESTIONS).await {
            Ok(questions) => {
                if !questions.is_empty() {
                    println!("\nTo better understand your research needs, please answer these follow-up questions:");
                }
                for question in questions {
                    let answer = ask(&mut stdin, &question).await?;
                    answers.push((question, answer));
                }
            }
            Err(e) => warn!(error = %e, "Could not generate follow-up questions"),
        }
    }
    let combined_query = combine_query(&initial_query, &answers);

    let cancel = CancellationToken::new();
    let research_done = CancellationToken::new();
    tokio::spawn(handle_interrupts(cancel.clone(), research_done.clone()));

    let on_progress: ProgressSink = Arc::new(|p: &ResearchProgress| {
        info!(
            depth = %format!("{}/{}", p.current_depth, p.total_depth),
            breadth = %format!("{}/{}", p.current_breadth, p.total_breadth),
            queries = %format!("{}/{}", p.completed_queries, p.total_queries),
            current = p.current_query.as_deref().unwrap_or(""),
            "Progress"
        );
    });

    let orchestrator = ResearchOrchestrator::new(generator.clone(), searcher, options);
    let result = orchestrator
        .research_from(
            &combined_query,
            args.breadth,
            args.depth,
            ResearchResult::new(),
            Some(on_progress),
            cancel,
        )
        .await;
    research_done.cancel();
    let result = result?;

    info!(
        learnings = result.learnings().len(),
        sources = result.visited().len(),
        "Writing final report"
    );
    let synthesizer = ReportSynthesizer::new(generator).with_learnings_budget(report_budget);
    let report = synthesizer
        .synthesize_result(&combined_query, &result)
        .await?;

    tokio::fs::write(&args.output, &report.markdown)
        .await
        .with_context(|| format!("writing report to {}", args.output.display()))?;

    println!("\n{}\n", report.markdown);
    info!(path = %args.output.display(), "Report saved");
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    CancelResearch,
    Exit,
}

/// The first Ctrl-C during research cancels it; any other Ctrl-C exits.
fn on_interrupt(cancel: &CancellationToken, research_done: &CancellationToken) -> Interrupt {
    if cancel.is_cancelled() || research_done.is_cancelled() {
        Interrupt::Exit
    } else {
        Interrupt::CancelResearch
    }
}

/// Installing the Ctrl-C handler replaces the default SIGINT exit, so this
/// loop owns every interrupt for the life of the process.
async fn handle_interrupts(cancel: CancellationToken, research_done: CancellationToken) {
    while tokio::signal::ctrl_c().await.is_ok() {
        match on_interrupt(&cancel, &research_done) {
            Interrupt::CancelResearch => {
                warn!("Interrupted, cancelling research");
                cancel.cancel();
            }
            Interrupt::Exit => {
                warn!("Interrupted");
                std::process::exit(130);
            }
        }
    }
}

async fn ask(stdin: &mut Lines<BufReader<Stdin>>, question: &str) -> Result<String> {
    print!("{question}\n> ");
    std::io::stdout().flush()?;
    let line = stdin.next_line().await?.unwrap_or_default();
    Ok(line.trim().to_string())
}
