use std::fmt::Write as _;

use super::format::*;

pub(crate) fn render(
    statistics: &skiload_core::RunStatistics,
    phases: &[skiload_core::PhaseTiming],
) -> String {
    let mut out = String::new();

    out.push_str("summary\n");
    writeln!(
        &mut out,
        "  requests: {} (successful {}, failed {})",
        statistics.total_requests,
        statistics.successful_requests(),
        statistics.failed_requests
    )
    .ok();
    writeln!(
        &mut out,
        "  wall time: {}",
        format_duration(statistics.wall_time)
    )
    .ok();
    writeln!(
        &mut out,
        "  throughput: {} req/s (successful {} req/s)",
        format_rate(statistics.throughput_per_sec()),
        format_rate(statistics.success_throughput_per_sec())
    )
    .ok();

    if !phases.is_empty() {
        out.push_str("\nphases\n");
        for p in phases {
            writeln!(&mut out, "  {}: {}", p.phase, format_duration(p.elapsed)).ok();
        }
    }

    if statistics.endpoints.is_empty() {
        out.push_str("\nendpoints: none\n");
        return out;
    }

    out.push_str("\nendpoints\n");
    for (key, s) in &statistics.endpoints {
        writeln!(&mut out, "  {key}").ok();
        writeln!(
            &mut out,
            "    latency = mean={} median={} p99={} max={} (n={})",
            format_mean_ms(s.mean_ms),
            format_ms_opt(s.median_ms),
            format_ms_opt(s.p99_ms),
            format_ms(s.max_ms),
            s.count
        )
        .ok();
    }

    out
}
