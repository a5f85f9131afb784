use std::time::Duration;

pub(crate) fn format_rate(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.1}")
    } else {
        "0".to_string()
    }
}

/// Single rounded component in `ms` or `s` (two decimals above one second).
pub(crate) fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms >= 1_000 {
        return format!("{:.2}s", d.as_secs_f64());
    }
    format!("{ms}ms")
}

pub(crate) fn format_ms(v: u64) -> String {
    format!("{v}ms")
}

pub(crate) fn format_ms_opt(v: Option<u64>) -> String {
    v.map_or_else(|| "n/a".to_string(), format_ms)
}

pub(crate) fn format_mean_ms(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.2}ms")
    } else {
        "n/a".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_switch_to_seconds_at_one_second() {
        assert_eq!(format_duration(Duration::from_millis(0)), "0ms");
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
        assert_eq!(format_duration(Duration::from_millis(1_000)), "1.00s");
        assert_eq!(format_duration(Duration::from_millis(12_346)), "12.35s");
    }

    #[test]
    fn non_finite_values_do_not_leak() {
        assert_eq!(format_rate(f64::NAN), "0");
        assert_eq!(format_rate(1234.56), "1234.6");
        assert_eq!(format_mean_ms(f64::INFINITY), "n/a");
        assert_eq!(format_mean_ms(50.5), "50.50ms");
    }
}
