//! Interpretation of raw command output.

use serde_json::Value;

use crate::error::RebalancerError;
use crate::validation::is_address;

fn parse_error(message: &str, raw: &str) -> RebalancerError {
    RebalancerError::ResponseParse {
        message: message.to_string(),
        raw_output: raw.to_string(),
    }
}

/// An address printed by `cast call`. The zero address is a valid result.
pub fn address_output(stdout: &str) -> Result<String, RebalancerError> {
    let trimmed = stdout.trim();
    if is_address(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(parse_error("Unexpected address output", stdout))
    }
}

/// A uint printed by `cast call`. Newer cast versions append a scientific
/// annotation (`1000000 [1e6]`), which is dropped.
pub fn uint_output(stdout: &str) -> Result<String, RebalancerError> {
    let first = stdout.split_whitespace().next().unwrap_or_default();
    if !first.is_empty() && first.bytes().all(|b| b.is_ascii_digit()) {
        Ok(first.to_string())
    } else {
        Err(parse_error("Unexpected numeric output", stdout))
    }
}

/// A `uint16[]` printed by `cast call`, e.g. `[6000, 4000]`.
pub fn uint16_array_output(stdout: &str) -> Result<Vec<u16>, RebalancerError> {
    let trimmed = stdout.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| parse_error("Unexpected array output", stdout))?;
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    inner
        .split(',')
        .map(|item| {
            item.split_whitespace()
                .next()
                .and_then(|n| n.parse::<u16>().ok())
                .ok_or_else(|| parse_error("Unexpected array output", stdout))
        })
        .collect()
}

/// JSON printed by `cdpcurl`. Anything before the first `{` (status lines,
/// banners) is skipped.
pub fn json_output(stdout: &str, what: &str) -> Result<Value, RebalancerError> {
    let trimmed = stdout.trim();
    let body = match trimmed.find('{') {
        Some(start) => &trimmed[start..],
        None => trimmed,
    };
    serde_json::from_str(body)
        .map_err(|_| parse_error(&format!("Failed to parse {what} response"), stdout))
}
