// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Extract reference groups (or read a flat URL list)
// 3. Associate originals with their archived snapshots
// 4. Run the concurrent batch over everything still checkable
// 5. Print results and exit with a proper code (0 = clean, 1 = dead
//    links found, 2 = error)
//
// Rust concepts used:
// - async/await: Because we need to make many network requests concurrently
// - Result<T, E>: For error handling (T = success type, E = error type)
// - match: Pattern matching to handle different subcommands
// =============================================================================

// Module declarations - tells Rust about our other source files
mod associate; // src/associate/ - archive association logic
mod checker; // src/checker/ - probing, retries, batching
mod classify; // src/classify/ - pure URL classification
mod cli; // src/cli.rs - command-line parsing
mod escalate; // src/escalate/ - optional browser-validator boundary
mod extract; // src/extract/ - HTML reference extraction

use associate::{AssociationOutcome, AssociatorConfig, RefLink, ReferenceGroup};
use checker::{LinkStatus, ProbeResult, Prober, Progress};
use cli::{Cli, Commands, Tuning};

use anyhow::{Context, Result};
use clap::Parser; // Parser trait enables the parse() method
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// The #[tokio::main] attribute transforms our async main into a real main
// function. It creates a tokio runtime and runs our async code inside it.
#[tokio::main]
async fn main() {
    // Run our application logic and capture the exit code
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // If an unexpected error occurred, print it and exit with code 2
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// This is the main application logic
// Returns:
//   Ok(0) = no dead links
//   Ok(1) = dead links found
//   Err = unexpected error (exit code 2)
async fn run() -> Result<i32> {
    // Parse command-line arguments into our Cli struct
    // This will automatically handle --help, --version, etc.
    let cli = Cli::parse();

    // Match on which subcommand was used
    match cli.command {
        Commands::Html {
            html_file,
            json,
            tuning,
        } => handle_html_scan(&html_file, json, &tuning).await,
        Commands::Urls {
            url_file,
            json,
            tuning,
        } => handle_url_list(&url_file, json, &tuning).await,
    }
}

// Handles the 'html' subcommand: triage every citation in one document
async fn handle_html_scan(path: &Path, json: bool, tuning: &Tuning) -> Result<i32> {
    println!("🔍 Scanning document: {}", path.display());

    let html = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let groups = extract::extract_reference_groups(&html);
    println!("📄 Found {} reference(s) with external links", groups.len());

    triage(&groups, json, tuning).await
}

// Handles the 'urls' subcommand: triage a flat list of URLs
//
// A flat list becomes one reference group ordered by line number, so an
// archive link listed right after its original still pairs up via the
// ordinal-proximity strategy.
async fn handle_url_list(path: &Path, json: bool, tuning: &Tuning) -> Result<i32> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let links: Vec<RefLink> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .enumerate()
        .map(|(index, line)| RefLink {
            href: line.to_string(),
            // Each line is its own element: distinct parent ids keep the
            // parent/sibling strategies out of play for flat input
            parent: index,
            grandparent: index,
            position: index,
        })
        .collect();

    println!("📄 Read {} URL(s) from {}", links.len(), path.display());

    let groups = vec![ReferenceGroup { links }];
    triage(&groups, json, tuning).await
}

// The shared pipeline: associate, then batch-check, then report
async fn triage(groups: &[ReferenceGroup], json: bool, tuning: &Tuning) -> Result<i32> {
    let outcome = associate::associate(groups, &AssociatorConfig::default());

    let with_archive = outcome
        .associations
        .values()
        .filter(|archives| !archives.is_empty())
        .count();
    println!(
        "📦 {} link(s) already covered by an archive, {} to check",
        with_archive,
        outcome.to_check.len()
    );

    // Every known original goes into the batch; the runner answers the
    // archived ones for free and probes the rest
    let urls: Vec<String> = outcome.associations.keys().cloned().collect();

    if urls.is_empty() {
        println!("✅ No links found to check");
        return Ok(0);
    }

    println!("\n🌐 Checking {} link(s)...\n", urls.len());

    // Failing to build the HTTP client means nothing can be probed -
    // abort loudly rather than report every link as dead
    let prober = Prober::new().context("failed to construct HTTP client")?;
    let config = tuning.to_batch_config();
    let cancel = CancellationToken::new();
    let progress = Arc::new(Progress::default());

    // Report progress from the side without blocking the worker pool
    let reporter = tokio::spawn({
        let progress = Arc::clone(&progress);
        async move {
            loop {
                tokio::time::sleep(Duration::from_secs(2)).await;
                let total = progress.total();
                let completed = progress.completed();
                if total == 0 || completed >= total {
                    break;
                }
                println!("   ⏳ {}/{} checked", completed, total);
            }
        }
    });

    let results = checker::run_batch(
        &prober,
        urls,
        &outcome,
        &config,
        &cancel,
        &progress,
        None, // no browser gateway wired into the CLI
    )
    .await;

    reporter.abort();

    // Print results and determine the exit code
    print_results(&results, &outcome, json)?;

    let dead_count = results
        .iter()
        .filter(|result| result.status == LinkStatus::Dead)
        .count();

    if dead_count > 0 {
        Ok(1) // Exit code 1 = dead links found
    } else {
        Ok(0) // Exit code 0 = all good
    }
}

// One row of the final report, for JSON output
#[derive(Serialize)]
struct ReportRow<'a> {
    url: &'a str,
    status: LinkStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    http_code: Option<u16>,
    archives: &'a [String],
}

// Prints the results either as a table or JSON
fn print_results(results: &[ProbeResult], outcome: &AssociationOutcome, json: bool) -> Result<()> {
    if json {
        let rows: Vec<ReportRow> = results
            .iter()
            .map(|result| ReportRow {
                url: &result.url,
                status: result.status,
                http_code: result.http_code,
                archives: outcome
                    .associations
                    .get(&result.url)
                    .map(|archives| archives.as_slice())
                    .unwrap_or(&[]),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print_table(results, outcome);
    }
    Ok(())
}

// Prints results as a human-readable table in the terminal
fn print_table(results: &[ProbeResult], outcome: &AssociationOutcome) {
    // Print table header
    println!("{:<60} {:<15} {:<6}", "URL", "STATUS", "CODE");
    println!("{}", "=".repeat(82));

    for result in results {
        let status_display = format_status(result.status);
        let code_display = result
            .http_code
            .map(|code| code.to_string())
            .unwrap_or_default();

        // Truncate URL if too long for display
        let url_display = if result.url.len() > 57 {
            format!("{}...", &result.url[..57])
        } else {
            result.url.clone()
        };

        println!("{:<60} {:<15} {:<6}", url_display, status_display, code_display);
    }

    println!();
    print_summary(results, outcome);
}

// Prints the category counts plus the dead/blocked link details
fn print_summary(results: &[ProbeResult], outcome: &AssociationOutcome) {
    let count = |status: LinkStatus| results.iter().filter(|r| r.status == status).count();

    let alive = count(LinkStatus::Alive);
    let dead = count(LinkStatus::Dead);
    let blocked = count(LinkStatus::Blocked);
    let archived = count(LinkStatus::Archived);
    let errors = count(LinkStatus::ConnectionError);

    println!("📊 Summary:");
    println!("   ✅ Alive: {}", alive);
    println!("   ❌ Dead: {}", dead);
    println!("   🚫 Blocked: {}", blocked);
    println!("   📦 Archived: {}", archived);
    println!("   🔌 Connection errors: {}", errors);
    println!("   📋 Total: {}", results.len());

    if dead > 0 {
        println!("\n❌ Dead links found:");
        for result in results.iter().filter(|r| r.status == LinkStatus::Dead) {
            match result.http_code {
                Some(code) => println!("   - {} (HTTP {})", result.url, code),
                None => println!("   - {}", result.url),
            }
        }
    }

    if blocked > 0 {
        println!("\n🚫 Blocked links (likely bot protection):");
        for result in results.iter().filter(|r| r.status == LinkStatus::Blocked) {
            println!("   - {}", result.url);
        }
    }

    if archived > 0 {
        println!("\n📦 Archived links:");
        for result in results.iter().filter(|r| r.status == LinkStatus::Archived) {
            let first_archive = outcome
                .associations
                .get(&result.url)
                .and_then(|archives| archives.first());
            match first_archive {
                Some(archive) => println!("   - {} -> {}", result.url, archive),
                None => println!("   - {}", result.url),
            }
        }
    }
}

// Formats the status enum as a short labeled string
fn format_status(status: LinkStatus) -> String {
    match status {
        LinkStatus::Alive => "✅ ALIVE".to_string(),
        LinkStatus::Dead => "❌ DEAD".to_string(),
        LinkStatus::Blocked => "🚫 BLOCKED".to_string(),
        LinkStatus::Archived => "📦 ARCHIVED".to_string(),
        LinkStatus::ConnectionError => "🔌 CONN ERROR".to_string(),
    }
}
