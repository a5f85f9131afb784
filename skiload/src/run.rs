use std::sync::Arc;

use anyhow::Context as _;
use skiload_core::{
    CsvSampleSink, HttpExecutor, RunController, SampleSink as _, StatisticsEngine,
};

use crate::cli::{ReportArgs, RunArgs};
use crate::config_file::{read_config_file, resolve_run_config};
use crate::exit_codes::ExitCode;
use crate::output;
use crate::run_error::RunError;

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let out = output::formatter(args.output);

    let file = match &args.config {
        Some(path) => Some(
            read_config_file(path)
                .await
                .map_err(RunError::InvalidInput)?,
        ),
        None => None,
    };
    let cfg = resolve_run_config(file.as_ref(), &args);
    let specs = cfg
        .phase_specs()
        .map_err(|err| RunError::from_core(err, "invalid run configuration"))?;

    tracing::info!(
        url = %cfg.target,
        max_threads = cfg.max_threads,
        skier_count = cfg.skier_count,
        "starting run"
    );
    out.print_header(&cfg, &specs);

    let executor = Arc::new(HttpExecutor::new(&cfg.target, cfg.request_timeout));
    let mut controller = RunController::new(cfg, executor);
    if let Some(progress) = out.progress() {
        controller = controller.with_progress(progress);
    }

    let report = controller
        .run()
        .await
        .map_err(|err| RunError::from_core(err, "run failed"))?;

    out.print_summary(&report.statistics, &report.phases)
        .map_err(RunError::RuntimeError)?;

    if args.no_samples {
        return Ok(ExitCode::Success);
    }

    let sink = CsvSampleSink::new(&args.samples_out);
    if let Err(err) = sink.write(&report.samples) {
        tracing::error!(path = %sink.path().display(), error = %err, "failed to write samples");
        return Err(RunError::SinkFailed(
            anyhow::Error::new(err)
                .context(format!("failed to write samples to {}", sink.path().display())),
        ));
    }
    tracing::info!(
        path = %sink.path().display(),
        samples = report.samples.len(),
        "samples written"
    );

    Ok(ExitCode::Success)
}

/// Recomputes statistics from a samples CSV written by an earlier run.
pub async fn report(args: ReportArgs) -> Result<ExitCode, RunError> {
    let out = output::formatter(args.output);

    let path = args.samples.clone();
    let statistics = tokio::task::spawn_blocking(move || {
        let samples = skiload_core::read_samples(&path)
            .with_context(|| format!("failed to read samples from {}", path.display()))
            .map_err(RunError::InvalidInput)?;
        StatisticsEngine
            .compute_recorded(&samples)
            .map_err(|err| RunError::from_core(err, "failed to compute statistics"))
    })
    .await
    .map_err(|err| RunError::RuntimeError(anyhow::Error::new(err)))??;

    out.print_summary(&statistics, &[])
        .map_err(RunError::RuntimeError)?;
    Ok(ExitCode::Success)
}
