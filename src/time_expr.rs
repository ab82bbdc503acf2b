//! Start-time expressions accepted on the command line.
use chrono::{DateTime, Duration, Utc};

/// Parse `now`, an RFC 3339 instant, or an offset from `now`.
///
/// Accepted forms:
/// - `now`
/// - `T+2h`, `T-30m` (humantime durations relative to `now`)
/// - `2026-01-12T10:00:00Z`
/// - `2026-01-12T10:00:00Z + 90m`
pub fn parse_start(s: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, String> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("now") {
        return Ok(now);
    }

    if let Some(rest) = s.strip_prefix(['t', 'T']) {
        return Ok(now + signed_duration(rest)?);
    }

    if let Some(idx) = s.rfind(['+', '-']) {
        if idx > 19 {
            if let Ok(base) = DateTime::parse_from_rfc3339(s[..idx].trim()) {
                return Ok(base.with_timezone(&Utc) + signed_duration(&s[idx..])?);
            }
        }
    }

    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("invalid start time '{}': {}", s, e))
}

fn signed_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let (neg, rest) = match s.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let dur = parse_duration(rest)?;
    Ok(if neg { -dur } else { dur })
}

pub fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime::parse_duration(s.trim())
        .map_err(|e| e.to_string())
        .and_then(|d| Duration::from_std(d).map_err(|e| e.to_string()))
}
