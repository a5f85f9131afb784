use std::process::{Command, Output};

use anyhow::Context as _;
use serde_json::Value;
use skiload_testserver::TestServer;

const SMALL_RUN: &str = r#"
maxThreads: 8
skierCount: 200
requestTimeout: 5s
warmup:
  writesPerWorker: 5
  readsPerWorker: 2
peak:
  writesPerWorker: 5
  readsPerWorker: 2
cooldown:
  writesPerWorker: 5
  readsPerWorker: 5
"#;

// 2 * 7 + 8 * 7 + 2 * 10
const SMALL_RUN_REQUESTS: u64 = 90;

fn skiload() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_skiload"));
    cmd.env_remove("RUST_LOG");
    for (key, _) in std::env::vars_os() {
        if key.to_string_lossy().starts_with("SKILOAD_") {
            cmd.env_remove(key);
        }
    }
    cmd
}

fn json_lines(out: &Output) -> anyhow::Result<Vec<Value>> {
    String::from_utf8_lossy(&out.stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).with_context(|| format!("not json: {l}")))
        .collect()
}

fn ensure_success(out: &Output) -> anyhow::Result<()> {
    anyhow::ensure!(
        out.status.success(),
        "exit {:?}\nstdout:\n{}\nstderr:\n{}",
        out.status.code(),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    Ok(())
}

async fn run_blocking(mut cmd: Command) -> anyhow::Result<Output> {
    tokio::task::spawn_blocking(move || cmd.output())
        .await
        .context("spawn_blocking join")?
        .context("run skiload binary")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn json_run_then_report_from_samples() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let dir = tempfile::tempdir()?;
    let config = dir.path().join("load.yaml");
    std::fs::write(&config, SMALL_RUN)?;
    let samples = dir.path().join("out").join("samples.csv");

    let mut cmd = skiload();
    cmd.arg("run")
        .arg("--config")
        .arg(&config)
        .arg("--target")
        .arg(server.base_url())
        .args(["--output", "json"])
        .arg("--samples-out")
        .arg(&samples);
    let out = run_blocking(cmd).await?;
    ensure_success(&out)?;

    let lines = json_lines(&out)?;
    let events: Vec<(String, String)> = lines
        .iter()
        .filter(|v| v.get("kind").and_then(Value::as_str) == Some("phase"))
        .map(|v| {
            (
                v.get("phase").and_then(Value::as_str).unwrap_or_default().to_string(),
                v.get("event").and_then(Value::as_str).unwrap_or_default().to_string(),
            )
        })
        .collect();
    let position = |phase: &str, event: &str| {
        events
            .iter()
            .position(|(p, e)| p == phase && e == event)
            .unwrap_or_else(|| panic!("missing {phase} {event} in {events:?}"))
    };
    assert!(position("warmup", "start") < position("warmup", "trigger"));
    assert!(position("warmup", "trigger") < position("peak", "start"));
    assert!(position("peak", "trigger") < position("cooldown", "start"));
    position("cooldown", "finish");
    assert_eq!(events.iter().filter(|(_, e)| e == "finish").count(), 3);

    let summary = lines
        .last()
        .filter(|v| v.get("kind").and_then(Value::as_str) == Some("summary"))
        .context("last line should be the summary")?;
    assert_eq!(
        summary.pointer("/totals/requests_total").and_then(Value::as_u64),
        Some(SMALL_RUN_REQUESTS)
    );
    assert_eq!(
        summary.pointer("/totals/failed_requests_total").and_then(Value::as_u64),
        Some(0)
    );
    assert_eq!(
        summary
            .get("endpoints")
            .and_then(Value::as_array)
            .map(Vec::len),
        Some(2)
    );
    assert_eq!(server.stats().requests_total(), SMALL_RUN_REQUESTS);

    let csv = std::fs::read_to_string(&samples).context("read samples csv")?;
    let mut rows = csv.lines();
    assert_eq!(rows.next(), Some(skiload_core::CSV_HEADER));
    assert_eq!(rows.count() as u64, SMALL_RUN_REQUESTS);

    let mut cmd = skiload();
    cmd.arg("report").arg(&samples).args(["--output", "json"]);
    let out = run_blocking(cmd).await?;
    ensure_success(&out)?;
    let lines = json_lines(&out)?;
    let report = lines.first().context("report should print a summary")?;
    assert_eq!(report.get("kind").and_then(Value::as_str), Some("summary"));
    assert_eq!(
        report.pointer("/totals/requests_total").and_then(Value::as_u64),
        Some(SMALL_RUN_REQUESTS)
    );
    assert_eq!(
        report.get("phases").and_then(Value::as_array).map(Vec::len),
        Some(0)
    );
    for pointer in ["/endpoints/0/count", "/endpoints/1/count", "/endpoints/1/p99_ms"] {
        assert_eq!(report.pointer(pointer), summary.pointer(pointer), "{pointer}");
    }

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn human_run_prints_summary_and_honors_no_samples() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let dir = tempfile::tempdir()?;
    let config = dir.path().join("load.yaml");
    std::fs::write(&config, SMALL_RUN)?;

    let mut cmd = skiload();
    cmd.arg("run")
        .arg("--config")
        .arg(&config)
        .arg("--no-samples")
        .env("SKILOAD_TARGET", server.base_url())
        .current_dir(dir.path());
    let out = run_blocking(cmd).await?;
    ensure_success(&out)?;

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains(&format!("target: {}", server.base_url())), "{stdout}");
    assert!(stdout.contains("phase: peak threads=8 trigger=1"), "{stdout}");
    assert!(
        stdout.contains(&format!("requests: {SMALL_RUN_REQUESTS} (successful {SMALL_RUN_REQUESTS}, failed 0)")),
        "{stdout}"
    );
    assert!(stdout.contains("  POST /skiers/liftrides\n"), "{stdout}");
    assert!(!dir.path().join("samples.csv").exists());

    server.shutdown().await;
    Ok(())
}
