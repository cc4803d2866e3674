//! Parsing of monitor intervals given on the command line.

use std::time::Duration;

/// Parses `90`, `90s`, `30m`, `1h`, `2d`, or `hh:mm:ss`.
///
/// Zero intervals are rejected.
pub(crate) fn parse_interval(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    let secs = if input.contains(':') {
        parse_clock(input)?
    } else {
        parse_with_unit(input)?
    };

    if secs == 0 {
        return Err("interval must be greater than zero".to_string());
    }
    Ok(Duration::from_secs(secs))
}

fn parse_with_unit(input: &str) -> Result<u64, String> {
    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let (digits, unit) = input.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid interval '{input}'"))?;
    let scale = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "s" | "sec" | "secs" => 1,
        "m" | "min" | "mins" => 60,
        "h" | "hr" | "hrs" => 60 * 60,
        "d" | "day" | "days" => 24 * 60 * 60,
        other => return Err(format!("unknown interval unit '{other}' (use s, m, h or d)")),
    };

    value
        .checked_mul(scale)
        .ok_or_else(|| format!("interval '{input}' is too large"))
}

fn parse_clock(input: &str) -> Result<u64, String> {
    let parts: Vec<&str> = input.split(':').collect();
    if parts.len() != 3 {
        return Err(format!("invalid interval '{input}' (expected hh:mm:ss)"));
    }

    let mut fields = [0u64; 3];
    for (field, part) in fields.iter_mut().zip(&parts) {
        *field = part
            .parse()
            .map_err(|_| format!("invalid interval '{input}' (expected hh:mm:ss)"))?;
    }

    let [hours, minutes, seconds] = fields;
    if minutes >= 60 || seconds >= 60 {
        return Err(format!("invalid interval '{input}' (minutes and seconds must be below 60)"));
    }
    Ok(hours * 3600 + minutes * 60 + seconds)
}
