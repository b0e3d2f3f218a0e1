use anyhow::{bail, Result};

/// A numeric range expression used by bucket tables.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeOp {
    LessThan(f64),
    LessEqual(f64),
    GreaterThan(f64),
    GreaterEqual(f64),
    Equal(f64),
    Between(f64, f64), // Inclusive range: N-M
}

impl RangeOp {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(val) = s.strip_prefix(">=") {
            Ok(RangeOp::GreaterEqual(val.trim().parse()?))
        } else if let Some(val) = s.strip_prefix("<=") {
            Ok(RangeOp::LessEqual(val.trim().parse()?))
        } else if let Some(val) = s.strip_prefix('>') {
            Ok(RangeOp::GreaterThan(val.trim().parse()?))
        } else if let Some(val) = s.strip_prefix('<') {
            Ok(RangeOp::LessThan(val.trim().parse()?))
        } else if s.contains('-') && !s.starts_with('-') {
            // Range format: "3-5"
            let parts: Vec<&str> = s.split('-').collect();
            if parts.len() == 2 {
                let low: f64 = parts[0].trim().parse()?;
                let high: f64 = parts[1].trim().parse()?;
                if low > high {
                    bail!("Range lower bound exceeds upper bound: {}", s)
                }
                Ok(RangeOp::Between(low, high))
            } else {
                bail!("Invalid range format: {}", s)
            }
        } else {
            Ok(RangeOp::Equal(s.parse()?))
        }
    }

    pub fn matches(&self, value: f64) -> bool {
        match self {
            RangeOp::LessThan(n) => value < *n,
            RangeOp::LessEqual(n) => value <= *n,
            RangeOp::GreaterThan(n) => value > *n,
            RangeOp::GreaterEqual(n) => value >= *n,
            RangeOp::Equal(n) => value == *n,
            RangeOp::Between(low, high) => value >= *low && value <= *high,
        }
    }
}

const UNIT_SUFFIXES: &[&str] = &[
    "percent", "points", "times", "pts", "pt", "ea", "%", "점", "회", "건", "번", "퍼센트",
];

/// Strip thousands separators and trailing unit words ("85%", "12 times",
/// "3 pts") so the remainder can be parsed as a number. Returns the cleaned
/// text and whether a percent marker was present.
pub fn strip_units(raw: &str) -> (String, bool) {
    let mut s = raw.trim().to_lowercase().replace(',', "");
    let mut percent = false;
    loop {
        let before = s.len();
        for suffix in UNIT_SUFFIXES {
            if let Some(rest) = s.strip_suffix(suffix) {
                if matches!(*suffix, "%" | "percent" | "퍼센트") {
                    percent = true;
                }
                s = rest.trim_end().to_string();
                break;
            }
        }
        if s.len() == before {
            break;
        }
    }
    (s, percent)
}

/// Parse a raw value into a number after stripping units.
pub fn parse_number(raw: &str) -> Option<(f64, bool)> {
    let (cleaned, percent) = strip_units(raw);
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| (v, percent))
}

/// Rescale a number to 0-100 by the range it falls in:
/// 0-1 → ×100, 0-5 → (x−1)×25, 0-10 → ×10, 0-100 → as-is, then clamp.
pub fn rescale_by_range(value: f64) -> f64 {
    let scaled = if (0.0..=1.0).contains(&value) {
        value * 100.0
    } else if (0.0..=5.0).contains(&value) {
        (value - 1.0) * 25.0
    } else if (0.0..=10.0).contains(&value) {
        value * 10.0
    } else {
        value
    };
    scaled.clamp(0.0, 100.0)
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
