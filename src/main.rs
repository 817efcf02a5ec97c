//! Spindel command-line entry point
//!
//! Consumes enrichment jobs as JSON files (the queue broker's input
//! contract) and writes the result envelope as JSON.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use spindel::config::{load_settings, settings_fingerprint};
use spindel::crawler::{candidate_urls, CrawlContext};
use spindel::job::{JobInput, JobResult, Worker};
use tracing_subscriber::EnvFilter;

/// Spindel: a polite contact-enrichment crawler
///
/// Reads one or more job files, crawls each job's sites within the
/// configured politeness limits, and emits contact records as JSON.
#[derive(Parser, Debug)]
#[command(name = "spindel")]
#[command(version = "2.0.0")]
#[command(about = "A polite contact-enrichment crawler", long_about = None)]
struct Cli {
    /// Path(s) to job JSON files
    #[arg(value_name = "JOB", required = true)]
    jobs: Vec<PathBuf>,

    /// Write the result envelope(s) to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate jobs and show what would be crawled without any network
    #[arg(long)]
    dry_run: bool,

    /// Print the metrics registry after the run
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let settings = load_settings()?;
    setup_logging(cli.verbose, cli.quiet, &settings.log_level);

    tracing::info!(
        "Settings loaded (fingerprint: {})",
        settings_fingerprint(&settings)
    );

    let jobs = load_jobs(&cli.jobs)?;

    if cli.dry_run {
        for job in &jobs {
            print_dry_run(job);
        }
        return Ok(());
    }

    let ctx = Arc::new(CrawlContext::new(settings)?);
    let worker = Arc::new(Worker::new(Arc::clone(&ctx)));

    // Jobs fan out over the worker concurrency budget; results keep the
    // input order
    let semaphore = Arc::new(tokio::sync::Semaphore::new(ctx.settings.worker_concurrency));
    let mut handles = Vec::new();
    for job in jobs {
        let worker = Arc::clone(&worker);
        let semaphore = Arc::clone(&semaphore);
        let job_id = job.job_id;
        handles.push((
            job_id,
            tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                worker.run_job(job).await
            }),
        ));
    }

    let mut results = Vec::new();
    for (job_id, handle) in handles {
        let result = handle.await?;
        print_summary(job_id, &result);
        results.push(result);
    }

    write_results(&results, cli.output.as_deref())?;

    if cli.metrics {
        println!("{}", ctx.metrics.render());
    }

    Ok(())
}

/// Sets up the tracing subscriber from verbosity flags and LOG_LEVEL
fn setup_logging(verbose: u8, quiet: bool, default_level: &str) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new(format!("spindel={},warn", default_level)),
            1 => EnvFilter::new("spindel=debug,info"),
            2 => EnvFilter::new("spindel=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Reads and parses every job file
fn load_jobs(paths: &[PathBuf]) -> Result<Vec<JobInput>, Box<dyn std::error::Error>> {
    let mut jobs = Vec::new();
    for path in paths {
        let content = std::fs::read_to_string(path)?;
        let job: JobInput =
            serde_json::from_str(&content).map_err(|e| format!("{}: {}", path.display(), e))?;
        tracing::info!("Loaded job {} with {} sites", job.job_id, job.sites.len());
        jobs.push(job);
    }
    Ok(jobs)
}

/// Shows the crawl plan for one job without touching the network
fn print_dry_run(job: &JobInput) {
    let (config, warnings) = job.config.clamped();

    println!("=== Job {} (dry run) ===\n", job.job_id);
    println!("Sites: {}", job.sites.len());
    println!("Pages per site: {}", config.max_pages);
    println!("Concurrency: {}", config.concurrency);
    for warning in &warnings {
        println!("  ! {}", warning);
    }

    for site in &job.sites {
        println!("\n{} ({})", site.host, site.company_name);
        for url in candidate_urls(&site.root_url, config.max_pages) {
            println!("  - {}", url);
        }
    }

    println!("\n✓ Job is valid");
}

/// Prints a one-job summary after the run
fn print_summary(job_id: uuid::Uuid, result: &JobResult) {
    println!("=== Job {} ===", job_id);
    println!("Sites:   {}", result.stats.total_sites);
    println!("Records: {}", result.stats.total_records);
    println!("Errors:  {}", result.stats.total_errors);
    println!(
        "Average: {:.2} records/site",
        result.stats.avg_records_per_site
    );
}

/// Writes result envelopes to the output file or stdout
fn write_results(
    results: &[JobResult],
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = if results.len() == 1 {
        serde_json::to_string_pretty(&results[0])?
    } else {
        serde_json::to_string_pretty(results)?
    };

    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            tracing::info!("Results written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
