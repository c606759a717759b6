use std::fs;
use std::time::Duration;

use chrono::Utc;
use mirror_bench::results::{RunContext, RunReport, REPORT_SCHEMA_VERSION};
use mirror_bench::system::{host_name, sha256_file};

mod common;
use common::{assert_close, orchestrator, site, ScriptedProbe};

fn context() -> RunContext {
    RunContext {
        label: "local".to_string(),
        created_at: Utc::now(),
        host: "runner-01".to_string(),
        provider_domain: "fastly.8aka.cn".to_string(),
        rounds: 3,
        failure_penalty_ms: 1000.0,
        used_default_sites: false,
        site_list_sha256: Some("abc123".to_string()),
    }
}

#[tokio::test(start_paused = true)]
async fn report_carries_legs_comparisons_and_summary() {
    let probe = ScriptedProbe::new(Duration::from_millis(10))
        .with_host("paper.x", Duration::from_millis(80))
        .with_host("papermc.io", Duration::from_millis(200));
    let orchestrator = orchestrator(
        vec![
            site("Paper", "https://paper.x/", Some("https://papermc.io/")),
            site("Pumpkin", "https://pumpkin.x/", Some("#")),
        ],
        probe,
    );
    let outcome = orchestrator.run().await.expect("run completes");

    let report = RunReport::new(context(), &outcome);

    assert_eq!(report.schema_version, REPORT_SCHEMA_VERSION);
    let names = report.sites.iter().map(|s| s.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["Paper", "Pumpkin"]);

    let paper = &report.sites[0];
    let comparison = paper.comparison.expect("paper comparison");
    assert_close(comparison.improvement_pct, 60.0);
    let origin = paper.origin.as_ref().expect("origin leg");
    assert_eq!(origin.samples_ms.len(), 3);
    let stats = origin.stats.as_ref().expect("origin stats");
    assert_close(stats.median_ms, 200.0);

    let pumpkin = &report.sites[1];
    assert!(pumpkin.origin_url.is_none());
    assert!(pumpkin.origin.is_none());
    assert!(pumpkin.comparison.is_none());

    assert_eq!(report.summary.improved_sites, 1);
    assert_eq!(report.summary.total_sites, 2);
    assert_close(report.summary.average_improvement_pct, 60.0);
}

#[tokio::test(start_paused = true)]
async fn report_serializes_with_stable_keys() {
    let orchestrator = orchestrator(
        vec![site("Paper", "https://paper.x/", None)],
        ScriptedProbe::new(Duration::from_millis(10)),
    );
    let outcome = orchestrator.run().await.expect("run completes");
    let mut ctx = context();
    ctx.site_list_sha256 = None;

    let raw = serde_json::to_value(RunReport::new(ctx, &outcome)).expect("serialize report");
    let obj = raw.as_object().expect("json object");
    for key in ["schema_version", "context", "started_at", "elapsed_ms", "sites", "summary"] {
        assert!(obj.contains_key(key), "missing key: {key}");
    }
    let ctx = obj["context"].as_object().expect("context object");
    assert!(!ctx.contains_key("site_list_sha256"));
    assert_eq!(obj["sites"][0]["comparison"], serde_json::Value::Null);
    assert_eq!(obj["summary"]["improved_sites"], 0);
}

#[test]
fn sha256_file_hashes_contents() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("fastly.json");
    fs::write(&path, "abc").expect("write");
    assert_eq!(
        sha256_file(&path).as_deref(),
        Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
    );
    assert!(sha256_file(&tmp.path().join("absent.json")).is_none());
}

#[test]
fn host_name_is_never_empty() {
    assert!(!host_name().is_empty());
}
