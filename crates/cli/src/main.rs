mod markdown;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use engine::{
    EngineConfig, EngineError, MatchSummary, RecommendationOrchestrator, RecommendationRequest,
    StreamOutcome,
};
use markdown::MarkdownNormalizer;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::info;

/// CourseRecs - University Course Recommendation Engine
#[derive(Parser)]
#[command(name = "course-recs")]
#[command(about = "Course recommendations from a description of your interests", long_about = None)]
struct Cli {
    /// Path to the course catalog (.jsonl or .json); overrides COURSE_RECS_CATALOG_PATH
    #[arg(short, long)]
    catalog: Option<PathBuf>,

    /// Inference service address; overrides COURSE_RECS_INFERENCE_ADDR
    #[arg(long)]
    inference_addr: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend courses for a free-text description of your interests
    Recommend {
        /// What you want to study
        #[arg(long)]
        query: String,

        /// Accepted course level, e.g. 300 (repeat for several)
        #[arg(long = "level")]
        levels: Vec<i64>,

        /// Identity used for rate limiting
        #[arg(long, default_value = "cli")]
        identity: String,

        /// Print the ranked matches before the write-up
        #[arg(long)]
        show_matches: bool,
    },

    /// Show courses most similar to an existing course
    Similar {
        /// Course code, e.g. EECS445
        #[arg(long)]
        code: String,

        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Search courses by code, title or description
    Search {
        /// Text to search for (case-insensitive substring match)
        #[arg(long)]
        text: String,

        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Show catalog statistics
    Stats,

    /// Run benchmark to test ranking performance
    Benchmark {
        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,

        /// Number of concurrent requests
        #[arg(long, default_value = "10")]
        concurrent: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; stdout is reserved for the recommendation text
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = EngineConfig::from_env()?;
    if let Some(catalog) = cli.catalog {
        config.catalog_path = catalog;
    }
    if let Some(addr) = cli.inference_addr {
        config.inference_addr = addr;
    }

    info!(catalog = %config.catalog_path.display(), "Loading course catalog");
    let start = Instant::now();
    let orchestrator = match cli.command {
        Commands::Recommend { .. } => RecommendationOrchestrator::connect(&config).await?,
        _ => RecommendationOrchestrator::connect_lazy(&config).await?,
    };
    eprintln!(
        "{} Loaded {} courses in {:?}",
        "✓".green(),
        orchestrator.catalog().len(),
        start.elapsed()
    );

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Recommend {
            query,
            levels,
            identity,
            show_matches,
        } => handle_recommend(&orchestrator, query, levels, &identity, show_matches).await?,
        Commands::Similar { code, limit } => handle_similar(&orchestrator, &code, limit)?,
        Commands::Search { text, limit } => handle_search(&orchestrator, &text, limit),
        Commands::Stats => handle_stats(&orchestrator),
        Commands::Benchmark {
            requests,
            concurrent,
        } => handle_benchmark(orchestrator, requests, concurrent).await?,
    }

    Ok(())
}

/// Handle the 'recommend' command
async fn handle_recommend(
    orchestrator: &RecommendationOrchestrator,
    query: String,
    levels: Vec<i64>,
    identity: &str,
    show_matches: bool,
) -> Result<()> {
    let request = RecommendationRequest {
        query,
        levels: (!levels.is_empty()).then_some(levels),
    };

    let recommendation = match orchestrator.recommend(identity, &request).await {
        Ok(recommendation) => recommendation,
        Err(EngineError::RateLimited { retry_after }) => {
            eprintln!(
                "{} Rate limited; try again in {}s",
                "✗".yellow(),
                retry_after.as_secs().max(1)
            );
            bail!("rate limited");
        }
        Err(e) => return Err(e.into()),
    };

    if show_matches {
        print_matches("Matching courses:", &recommendation.matches);
        println!();
    }

    // Stream the write-up; Ctrl-C drops the stream, which cancels generation
    let mut stream = recommendation.stream;
    let mut normalizer = MarkdownNormalizer::new();
    let mut stdout = std::io::stdout();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                println!();
                eprintln!("{}", "Cancelled".yellow());
                return Ok(());
            }
            chunk = stream.next() => match chunk {
                Some(Ok(text)) => {
                    print!("{}", normalizer.push(&text));
                    stdout.flush()?;
                }
                Some(Err(e)) => {
                    println!();
                    eprintln!("{} Explanation incomplete: {}", "✗".red(), e);
                    break;
                }
                None => {
                    print!("{}", normalizer.finish());
                    break;
                }
            },
        }
    }

    if stream.outcome() == StreamOutcome::Truncated {
        bail!("explanation for request {} was truncated", recommendation.request_id);
    }
    Ok(())
}

/// Handle the 'similar' command
fn handle_similar(orchestrator: &RecommendationOrchestrator, code: &str, limit: usize) -> Result<()> {
    let similar = orchestrator.similar_courses(code, limit)?;
    print_matches(&format!("Courses similar to {}:", code), &similar);
    Ok(())
}

/// Handle the 'search' command
fn handle_search(orchestrator: &RecommendationOrchestrator, text: &str, limit: usize) {
    let found = orchestrator.search_courses(text, limit);

    println!("{}", format!("Search results for '{}':", text).bold().blue());
    if found.is_empty() {
        println!("  (no courses found)");
    }
    for course in found {
        println!(
            "{}: {} (level {}){}",
            course.code.green(),
            course.title,
            course.level,
            course
                .department
                .map(|d| format!(" [{}]", d))
                .unwrap_or_default()
        );
    }
}

/// Handle the 'stats' command
fn handle_stats(orchestrator: &RecommendationOrchestrator) {
    let stats = orchestrator.catalog_stats();

    println!("{}", "Catalog statistics:".bold().blue());
    println!("{}Courses: {}", "• ".green(), stats.total_courses);
    println!("{}Embedding dimension: {}", "• ".green(), stats.embedding_dimension);
    println!("{}Departments: {}", "• ".green(), stats.departments);
    println!("{}Courses per level:", "• ".cyan());
    for (level, count) in &stats.courses_per_level {
        println!("  - {}: {}", level, count);
    }
}

/// Handle the 'benchmark' command.
///
/// Measures ranking only: each request ranks the catalog against the
/// embedding of a randomly chosen course, so no external calls are made.
async fn handle_benchmark(
    orchestrator: RecommendationOrchestrator,
    requests: usize,
    concurrent: usize,
) -> Result<()> {
    if requests == 0 {
        bail!("--requests must be positive");
    }

    let catalog = orchestrator.catalog().clone();
    let codes: Vec<String> = (0..requests)
        .map(|_| {
            let position = rand::random_range(0..catalog.len());
            catalog.all()[position].code.clone()
        })
        .collect();

    let orchestrator = Arc::new(orchestrator);
    let permits = Arc::new(Semaphore::new(concurrent.max(1)));
    let top_k = orchestrator.top_k();

    // Use tokio::spawn to make concurrent requests
    let wall_start = Instant::now();
    let mut handles = vec![];
    for code in codes {
        let orchestrator = orchestrator.clone();
        let permits = permits.clone();
        let handle = tokio::spawn(async move {
            let _permit = permits.acquire_owned().await?;
            let elapsed = tokio::task::spawn_blocking(move || {
                let start = Instant::now();
                orchestrator.similar_courses(&code, top_k)?;
                Ok::<_, anyhow::Error>(start.elapsed())
            })
            .await??;
            Ok::<_, anyhow::Error>(elapsed)
        });
        handles.push(handle);
    }

    let mut timings = vec![];
    for handle in handles {
        let elapsed = handle.await??;
        timings.push(elapsed);
    }
    let wall_time = wall_start.elapsed();

    let total_latency: Duration = timings.iter().sum();
    let avg_latency = total_latency / (timings.len() as u32);
    timings.sort();
    let percentile = |p: f32| timings[((timings.len() as f32 * p) as usize).min(timings.len() - 1)];
    let throughput = requests as f32 / wall_time.as_secs_f32();

    println!("{}", "Benchmark results:".bold().blue());
    println!("Requests: {} ({} concurrent)", requests, concurrent.max(1));
    println!("Total time: {:?}", wall_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", percentile(0.50));
    println!("P95 latency: {:?}", percentile(0.95));
    println!("P99 latency: {:?}", percentile(0.99));
    println!("Throughput: {:.2} requests/second", throughput);

    Ok(())
}

/// Helper function to format and print ranked courses
fn print_matches(header: &str, matches: &[MatchSummary]) {
    println!("{}", header.bold().blue());
    if matches.is_empty() {
        println!("  (no matching courses)");
    }
    for (i, m) in matches.iter().enumerate() {
        println!(
            "{}. {}: {} (level {}) - Score: {:.3}",
            (i + 1).to_string().green(),
            m.course.code,
            m.course.title,
            m.course.level,
            m.score
        );
    }
}
