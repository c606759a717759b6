use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::config::{BenchConfig, DEFAULT_FAILURE_PENALTY_MS, DEFAULT_PROVIDER_DOMAIN};
use crate::error::{BenchError, BenchResult};
use crate::sites::DEFAULT_SITES_PATH;

#[derive(Debug, Parser)]
#[command(
    name = "mirror-bench",
    about = "compare latency of accelerated mirrors against their origins"
)]
pub struct Args {
    #[arg(long, env = "MIRROR_BENCH_SITES", default_value = DEFAULT_SITES_PATH)]
    pub sites: PathBuf,
    #[arg(
        long,
        env = "MIRROR_BENCH_PROVIDER_DOMAIN",
        default_value = DEFAULT_PROVIDER_DOMAIN
    )]
    pub provider_domain: String,
    #[arg(long, env = "MIRROR_BENCH_PENALTY_MS", default_value_t = DEFAULT_FAILURE_PENALTY_MS)]
    pub penalty_ms: f64,
    #[arg(long, env = "MIRROR_BENCH_PROBE_TIMEOUT_SECS", default_value_t = 10)]
    pub probe_timeout_secs: u64,
    #[arg(long, short)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    List,
    Run {
        #[arg(long, env = "MIRROR_BENCH_LABEL", default_value = "local")]
        label: String,
        #[arg(long)]
        json: bool,
    },
    Watch {
        #[arg(long, env = "MIRROR_BENCH_LABEL", default_value = "local")]
        label: String,
        #[arg(long, env = "MIRROR_BENCH_INTERVAL_SECS", default_value_t = 300)]
        interval_secs: u64,
    },
    Doctor,
}

impl Args {
    pub fn bench_config(&self) -> BenchResult<BenchConfig> {
        let mut config = BenchConfig {
            provider_domain: self.provider_domain.clone(),
            failure_penalty_ms: self.penalty_ms,
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
            ..BenchConfig::default()
        };
        if self.probe_timeout_secs == 0 {
            return Err(BenchError::InvalidArgument(
                "probe timeout must be at least 1 second".to_string(),
            ));
        }
        if let Command::Watch { interval_secs, .. } = self.command {
            config.interval = Duration::from_secs(interval_secs);
        }
        config.validate()?;
        Ok(config)
    }
}

pub fn validate_label(label: &str) -> BenchResult<()> {
    if label.is_empty() {
        return Err(BenchError::InvalidArgument(
            "label must not be empty".to_string(),
        ));
    }
    if matches!(label, "." | "..") {
        return Err(BenchError::InvalidArgument(format!(
            "label '{label}' is not allowed"
        )));
    }
    if !label
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_'))
    {
        return Err(BenchError::InvalidArgument(
            "label contains invalid characters; allowed: [A-Za-z0-9._-]".to_string(),
        ));
    }
    Ok(())
}
