use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use mirror_bench::cli::{validate_label, Args, Command};
use mirror_bench::config::BenchConfig;
use mirror_bench::error::BenchResult;
use mirror_bench::logging::init_tracing;
use mirror_bench::orchestrator::{Orchestrator, RunProgress};
use mirror_bench::results::{RunContext, RunReport};
use mirror_bench::runner::probe::HttpProbe;
use mirror_bench::runner::warmup::ResolverWarmup;
use mirror_bench::runner::Estimator;
use mirror_bench::scheduler::Scheduler;
use mirror_bench::sites::{load_sites_or_default, SiteSource};
use mirror_bench::system::{host_name, sha256_file};

type HttpOrchestrator = Orchestrator<HttpProbe, ResolverWarmup>;

#[tokio::main]
async fn main() -> BenchResult<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    let config = args.bench_config()?;
    let source = load_sites_or_default(&args.sites, &config.provider_domain);
    if let Some(reason) = &source.fallback_reason {
        eprintln!("warning: using built-in default sites ({reason})");
    }

    match &args.command {
        Command::List => {
            println!("sites ({}):", if source.used_defaults() { "defaults" } else { "config" });
            for site in &source.sites {
                println!(
                    "- {} [{}] accelerated={} origin={}",
                    site.name,
                    site.description,
                    site.accelerated_url,
                    site.origin_target().unwrap_or("none")
                );
            }
        }
        Command::Run { label, json } => {
            validate_label(label)?;
            let orchestrator = build_orchestrator(&source, &config)?;
            let printer = spawn_progress_printer(orchestrator.subscribe_progress());
            let outcome = orchestrator.run().await?;
            printer.abort();

            let context = run_context(label, &args.sites, &source, &config);
            let report = RunReport::new(context, &outcome);
            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Command::Watch { label, .. } => {
            validate_label(label)?;
            let orchestrator = Arc::new(build_orchestrator(&source, &config)?);
            let mut results = orchestrator.subscribe_results();
            let printer = spawn_progress_printer(orchestrator.subscribe_progress());
            let mut scheduler = Scheduler::new(Arc::clone(&orchestrator), config.interval);
            scheduler.start();
            println!(
                "watching {} sites every {}s; press Ctrl-C to stop",
                source.sites.len(),
                config.interval.as_secs()
            );

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    changed = results.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let latest = results.borrow_and_update().clone();
                        if let Some(outcome) = latest {
                            let context = run_context(label, &args.sites, &source, &config);
                            print_report(&RunReport::new(context, &outcome));
                        }
                    }
                }
            }

            scheduler.dispose();
            printer.abort();
        }
        Command::Doctor => {
            println!("mirror-bench doctor");
            println!("sites_path={}", args.sites.display());
            println!("sites_source={}", if source.used_defaults() { "defaults" } else { "config" });
            println!("site_count={}", source.sites.len());
            println!(
                "site_list_sha256={}",
                sha256_file(&args.sites).unwrap_or_else(|| "unknown".to_string())
            );
            println!("provider_domain={}", config.provider_domain);
            println!("rounds={}", config.rounds);
            println!("round_pause_ms={}", config.round_pause.as_millis());
            println!("site_pause_ms={}", config.site_pause.as_millis());
            println!("warmup_settle_ms={}", config.warmup_settle.as_millis());
            println!("failure_penalty_ms={}", config.failure_penalty_ms);
            println!("probe_timeout_secs={}", config.probe_timeout.as_secs());
            println!("interval_secs={}", config.interval.as_secs());
            println!("host={}", host_name());
        }
    }

    Ok(())
}

fn build_orchestrator(source: &SiteSource, config: &BenchConfig) -> BenchResult<HttpOrchestrator> {
    let estimator = Estimator::new(
        HttpProbe::new(config.probe_timeout)?,
        ResolverWarmup::new(config.warmup_settle),
        config,
    );
    Ok(Orchestrator::new(source.sites.clone(), estimator, config))
}

fn run_context(
    label: &str,
    sites_path: &Path,
    source: &SiteSource,
    config: &BenchConfig,
) -> RunContext {
    RunContext {
        label: label.to_string(),
        created_at: Utc::now(),
        host: host_name(),
        provider_domain: config.provider_domain.clone(),
        rounds: config.rounds,
        failure_penalty_ms: config.failure_penalty_ms,
        used_default_sites: source.used_defaults(),
        site_list_sha256: if source.used_defaults() {
            None
        } else {
            sha256_file(sites_path)
        },
    }
}

fn spawn_progress_printer(mut progress: watch::Receiver<RunProgress>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let current = *progress.borrow_and_update();
            eprintln!(
                "progress: {:.0}% ({}/{} legs)",
                current.percent(),
                current.completed,
                current.total
            );
        }
    })
}

fn print_report(report: &RunReport) {
    println!(
        "run at {} ({} ms)",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.elapsed_ms
    );
    for site in &report.sites {
        match &site.comparison {
            Some(comparison) => println!(
                "- {}: accelerated {:.0} ms, origin {:.0} ms, {:.1}% faster",
                site.name,
                comparison.accelerated_ms,
                comparison.origin_ms,
                comparison.improvement_pct
            ),
            None => println!(
                "- {}: accelerated {:.0} ms, origin not measured",
                site.name, site.accelerated.trimmed_ms
            ),
        }
    }
    println!(
        "summary: {}/{} sites faster, average improvement {:.1}%",
        report.summary.improved_sites,
        report.summary.total_sites,
        report.summary.average_improvement_pct
    );
}
