//! Formatting utilities

use glam::Vec3;
use spark_sim::preset::{ScalarSpec, ValueSpec};

/// Format a count with thousands separators
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Format a duration in seconds; negative values mean the cycle has ended
pub fn format_seconds(seconds: f32) -> String {
    if seconds < 0.0 {
        "expired".to_string()
    } else {
        format!("{seconds:.2}s")
    }
}

pub fn format_vec3(v: Vec3) -> String {
    format!("({:.2}, {:.2}, {:.2})", v.x, v.y, v.z)
}

/// Short description of a preset scalar
pub fn format_scalar(spec: &ScalarSpec) -> String {
    match spec {
        ValueSpec::Constant(value) => format!("{value}"),
        ValueSpec::Jitter(jitter) => format!("{}±{}", jitter.value, jitter.spread),
        ValueSpec::Ramp(ramp) => format!("{}→{} over {}s", ramp.from, ramp.to, ramp.over),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spark_sim::preset::{Jitter, Ramp};

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(50_000), "50,000");
        assert_eq!(format_count(1_234_567), "1,234,567");
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(1.5), "1.50s");
        assert_eq!(format_seconds(0.0), "0.00s");
        assert_eq!(format_seconds(-0.1), "expired");
    }

    #[test]
    fn test_format_scalar() {
        assert_eq!(format_scalar(&ValueSpec::Constant(100.0)), "100");
        assert_eq!(
            format_scalar(&ValueSpec::Jitter(Jitter {
                value: 1.0,
                spread: 0.25
            })),
            "1±0.25"
        );
        assert_eq!(
            format_scalar(&ValueSpec::Ramp(Ramp {
                from: 0.0,
                to: 2.0,
                over: 5.0
            })),
            "0→2 over 5s"
        );
    }
}
