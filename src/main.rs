//! Shopfront CLI - batch image generation for product listings.
//!
//! Run `shopfront --help` for usage information.

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use shopfront::{
    Args, BatchOrchestrator, BatchResult, Config, CredentialStore, Pacer, RetryPolicy,
    ShopfrontError, parse_prompts, select_kind,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse_args();

    // Setup logging
    setup_logging(&args);

    // Load configuration
    let config = match Config::from_args(&args) {
        Ok(c) => c,
        Err(e) => fail("Configuration error", &e),
    };

    let credentials = Arc::new(CredentialStore::from_environment(args.env_files.clone()));

    // Dry run mode
    if args.dry_run {
        println!("\n{}", style("DRY RUN MODE").yellow().bold());
        print_plan(&config, &credentials);
        return Ok(());
    }

    let prompts = match collect_prompts(&args) {
        Ok(p) => p,
        Err(e) => fail("Input error", &e),
    };

    let orchestrator = BatchOrchestrator::new(config, credentials);

    info!(prompts = prompts.len(), output = ?args.output, "Starting generation");

    let progress = (!args.no_progress && !args.json_logs).then(|| progress_bar(prompts.len()));

    let result = orchestrator
        .generate_batch_with(&prompts, |_, outcome| {
            if let Some(pb) = &progress {
                let label = if outcome.is_success() { "ok" } else { "failed" };
                pb.set_message(format!("last: {label}"));
                pb.inc(1);
            }
        })
        .await;

    if let Some(pb) = &progress {
        pb.finish_with_message("Complete!");
    }

    let result = match result {
        Ok(r) => r,
        Err(e) => fail("Generation error", &e),
    };

    write_report(&args, &result).await?;

    if !args.json_logs {
        print_summary(&result);
    }

    // Exit with error code if no image was produced
    if result.all_failed() {
        std::process::exit(1);
    }

    Ok(())
}

fn fail(context: &str, e: &ShopfrontError) -> ! {
    error!("{}: {}", context, e);
    eprintln!("{} {}", style("Error:").red().bold(), e);
    std::process::exit(1);
}

fn setup_logging(args: &Args) {
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("shopfront={level}")));

    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    }
}

fn collect_prompts(args: &Args) -> shopfront::Result<Vec<String>> {
    let mut prompts = Vec::new();

    if let Some(path) = &args.input {
        let text =
            std::fs::read_to_string(path).map_err(|e| ShopfrontError::InputFileRead {
                path: path.clone(),
                source: e,
            })?;
        prompts.extend(parse_prompts(&text)?);
    }

    prompts.extend(
        args.prompts
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty()),
    );

    if prompts.is_empty() {
        return Err(ShopfrontError::EmptyBatch);
    }
    Ok(prompts)
}

fn progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    let template = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} | {msg}";
    let style = ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░");
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

async fn write_report(args: &Args, result: &BatchResult) -> Result<()> {
    let report = serde_json::json!({
        "success": true,
        "provider": result.provider,
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "elapsed_ms": result.stats.elapsed.as_millis() as u64,
        "data": result.outcomes,
    });
    let body = serde_json::to_string_pretty(&report).map_err(ShopfrontError::JsonSerialize)?;

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, body)
                .await
                .map_err(|e| ShopfrontError::OutputFileWrite {
                    path: path.clone(),
                    source: e,
                })
                .context("writing report")?;
        }
        None => println!("{body}"),
    }
    Ok(())
}

fn print_plan(config: &Config, credentials: &CredentialStore) {
    println!("{}", style("Plan:").bold());
    match select_kind(&credentials.snapshot()) {
        Ok(kind) => {
            let pacer = Pacer::for_provider(kind, &config.pacing);
            let retry = RetryPolicy::for_provider(kind, &config.retry);
            println!("  Provider:   {}", kind.display_name());
            println!("  Pacing:     {:?} between calls", pacer.delay());
            println!(
                "  Attempts:   {} (retry delay {:?})",
                retry.max_attempts(),
                retry.delay()
            );
        }
        Err(e) => println!("  {} {}", style("✗").red().bold(), e),
    }
    println!();
}

fn print_summary(result: &BatchResult) {
    let stats = &result.stats;
    eprintln!("\n{}", "═".repeat(60));
    eprintln!("                    GENERATION COMPLETE");
    eprintln!("{}", "═".repeat(60));
    eprintln!("  Provider:         {}", result.provider.display_name());
    eprintln!("  Prompts:          {}", stats.total_prompts);
    eprintln!(
        "  Images:           {} ({:.1}%)",
        stats.success_count,
        stats.success_rate()
    );
    eprintln!("  Failed:           {}", stats.failure_count);
    eprintln!("  Elapsed Time:     {:.2}s", stats.elapsed.as_secs_f64());
    eprintln!("  Avg Latency:      {:.1}ms", stats.avg_latency_ms);
    eprintln!("{}", "═".repeat(60));

    for (index, outcome) in result.outcomes.iter().enumerate() {
        if let Some(error) = &outcome.error {
            eprintln!("  {} #{} {}", style("⚠").yellow().bold(), index + 1, error);
        }
    }
}
