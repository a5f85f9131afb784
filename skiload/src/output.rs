use crate::cli::OutputFormat;

mod human;
mod json;

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_header(&self, cfg: &skiload_core::RunConfig, specs: &[skiload_core::PhaseSpec]);
    fn progress(&self) -> Option<skiload_core::ProgressFn>;
    fn print_summary(
        &self,
        statistics: &skiload_core::RunStatistics,
        phases: &[skiload_core::PhaseTiming],
    ) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput::new()),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}
