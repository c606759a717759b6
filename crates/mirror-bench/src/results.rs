use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::compare::{compare, summarize, Comparison, RunSummary};
use crate::orchestrator::RunOutcome;
use crate::runner::LegMeasurement;
use crate::stats::{compute_stats, SampleStats};

pub const REPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunContext {
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub host: String,
    pub provider_domain: String,
    pub rounds: u32,
    pub failure_penalty_ms: f64,
    pub used_default_sites: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_list_sha256: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LegReport {
    pub trimmed_ms: f64,
    pub samples_ms: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<SampleStats>,
}

impl From<&LegMeasurement> for LegReport {
    fn from(leg: &LegMeasurement) -> Self {
        Self {
            trimmed_ms: leg.trimmed_ms,
            samples_ms: leg.samples.clone(),
            stats: compute_stats(&leg.samples),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SiteReport {
    pub name: String,
    pub description: String,
    pub accelerated_url: String,
    pub origin_url: Option<String>,
    pub accelerated: LegReport,
    pub origin: Option<LegReport>,
    pub comparison: Option<Comparison>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub schema_version: u32,
    pub context: RunContext,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub sites: Vec<SiteReport>,
    pub summary: RunSummary,
}

impl RunReport {
    pub fn new(context: RunContext, outcome: &RunOutcome) -> Self {
        let sites = outcome
            .sites
            .iter()
            .map(|run| SiteReport {
                name: run.site.name.clone(),
                description: run.site.description.clone(),
                accelerated_url: run.site.accelerated_url.clone(),
                origin_url: run.site.origin_target().map(str::to_string),
                accelerated: LegReport::from(&run.accelerated),
                origin: run.origin.as_ref().map(LegReport::from),
                comparison: outcome.measurements.get(&run.site.name).and_then(compare),
            })
            .collect();

        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            context,
            started_at: outcome.started_at,
            elapsed_ms: outcome.elapsed.as_millis() as u64,
            sites,
            summary: summarize(&outcome.measurements),
        }
    }
}
