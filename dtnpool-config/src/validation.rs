//! Custom validation and parsing helpers shared by the configuration sections.

use validator::ValidationError;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a tracing level name.
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    if LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}

/// Parse a count such as "4096", "64k" or "1m" (binary multiples).
pub fn parse_count(raw: &str) -> Result<usize, String> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let number: usize = digits
        .parse()
        .map_err(|e| format!("invalid count {raw:?}: {e}"))?;
    let multiplier = match unit.trim().to_lowercase().as_str() {
        "" => 1,
        "k" | "ki" => 1024,
        "m" | "mi" => 1024 * 1024,
        other => return Err(format!("unknown count suffix {other:?}")),
    };
    number
        .checked_mul(multiplier)
        .ok_or_else(|| format!("count {raw:?} overflows"))
}
