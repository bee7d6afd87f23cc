//! Ban-length grammar: one or more `<int><unit>` terms, units `s` (seconds),
//! `m` (minutes), `h` (hours), `d` (days, 24h) and `w` (weeks, 7d).
//! Examples: `90s`, `1h30m`, `2d`, `3w`. The `perma` sentinel is handled by
//! the ban command, not here.

use std::time::Duration;

const UNITS: &[(char, u64)] = &[
    ('w', 7 * 24 * 60 * 60),
    ('d', 24 * 60 * 60),
    ('h', 60 * 60),
    ('m', 60),
    ('s', 1),
];

pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("empty duration");
    }

    let mut total: u64 = 0;
    let mut digits = String::new();
    for c in s.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let Some((_, secs)) = UNITS.iter().find(|(u, _)| *u == c) else {
            anyhow::bail!("bad duration unit {c:?} in {s:?}");
        };
        if digits.is_empty() {
            anyhow::bail!("missing count before {c:?} in {s:?}");
        }
        let n: u64 = digits.parse()?;
        digits.clear();
        total = total
            .checked_add(n.checked_mul(*secs).ok_or_else(|| {
                anyhow::anyhow!("duration overflow in {s:?}")
            })?)
            .ok_or_else(|| anyhow::anyhow!("duration overflow in {s:?}"))?;
    }
    if !digits.is_empty() {
        anyhow::bail!("trailing count without unit in {s:?}");
    }
    Ok(Duration::from_secs(total))
}

/// Renders the canonical compound form, largest unit first, zero terms
/// skipped. `parse_duration(format_duration(d)) == d` for any whole-second
/// duration.
pub fn format_duration(d: Duration) -> String {
    let mut left = d.as_secs();
    if left == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    for (unit, secs) in UNITS {
        let n = left / secs;
        if n > 0 {
            out.push_str(&format!("{n}{unit}"));
            left -= n * secs;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_terms() {
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86400));
        assert_eq!(parse_duration("3w").unwrap(), Duration::from_secs(3 * 604800));
    }

    #[test]
    fn parses_compound_terms() {
        assert_eq!(
            parse_duration("1h30m").unwrap(),
            Duration::from_secs(3600 + 1800)
        );
        assert_eq!(
            parse_duration("2d12h").unwrap(),
            Duration::from_secs(2 * 86400 + 12 * 3600)
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("h").is_err());
        assert!(parse_duration("12").is_err());
        assert!(parse_duration("5x").is_err());
        assert!(parse_duration("perma").is_err());
    }

    #[test]
    fn round_trips() {
        for s in ["90s", "1h30m", "2d", "3w", "1w2d3h4m5s"] {
            let d = parse_duration(s).unwrap();
            assert_eq!(parse_duration(&format_duration(d)).unwrap(), d);
        }
        assert_eq!(format_duration(Duration::from_secs(0)), "0s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
    }
}
