//! Human-readable size strings as printed by `zfs list` (e.g. `9.07T`)

/// Convert a size string to bytes (binary units, case-insensitive)
///
/// A bare number is bytes. Unparseable input yields 0; an unknown unit
/// yields the bare number.
pub fn parse_size(size: &str) -> u64 {
    let size = size.trim();
    if size.is_empty() {
        return 0;
    }

    let split = size
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(size.len());
    let (number, unit) = size.split_at(split);

    let value: f64 = match number.trim().parse() {
        Ok(v) if v >= 0.0 => v,
        _ => return 0,
    };

    let multiplier: f64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1.0,
        "k" | "kb" => 1024.0,
        "m" | "mb" => 1024.0 * 1024.0,
        "g" | "gb" => 1024.0 * 1024.0 * 1024.0,
        "t" | "tb" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        "p" | "pb" => 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => 1.0,
    };

    (value * multiplier) as u64
}

/// Percentage of `used` within `used + avail`
///
/// None unless both sizes parse to non-zero values.
pub fn usage_percent(used: &str, avail: &str) -> Option<f64> {
    let used = parse_size(used);
    let avail = parse_size(avail);
    if used == 0 || avail == 0 {
        return None;
    }
    Some(used as f64 / (used + avail) as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size(""), 0);
        assert_eq!(parse_size("512"), 512);
        assert_eq!(parse_size("100B"), 100);
        assert_eq!(parse_size("1K"), 1024);
        assert_eq!(parse_size("1kb"), 1024);
        assert_eq!(parse_size("1.5M"), 1_572_864);
        assert_eq!(parse_size("2G"), 2 * 1024 * 1024 * 1024);
        assert_eq!(parse_size("1T"), 1024_u64.pow(4));
        assert_eq!(parse_size("1P"), 1024_u64.pow(5));
        assert_eq!(parse_size("9.07T"), (9.07 * 1024_f64.powi(4)) as u64);
    }

    #[test]
    fn test_parse_size_degenerate() {
        assert_eq!(parse_size("abc"), 0);
        assert_eq!(parse_size("-5G"), 0);
        assert_eq!(parse_size("7X"), 7);
    }

    #[test]
    fn test_usage_percent() {
        let pct = usage_percent("1T", "3T").unwrap();
        assert!((pct - 25.0).abs() < 0.001);
        assert_eq!(usage_percent("0", "3T"), None);
        assert_eq!(usage_percent("", ""), None);
    }
}
