//! Input checks applied before any external command is built.
//!
//! Every value that ends up on a `cast`/`cdpcurl` command line passes through
//! one of these functions first.

use std::str::FromStr;

use alloy::primitives::U256;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RebalancerError;

/// Sum that a complete allocation must reach (100%).
pub const BPS_TOTAL: u64 = 10_000;

/// Largest decimals value accepted for unit conversion.
pub const MAX_DECIMALS: i64 = 36;

/// A user-supplied amount: either a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(serde_json::Number),
    Text(String),
}

impl From<u64> for Amount {
    fn from(n: u64) -> Self {
        Amount::Number(n.into())
    }
}

impl From<&str> for Amount {
    fn from(s: &str) -> Self {
        Amount::Text(s.to_string())
    }
}

/// `true` iff `value` is `0x` followed by exactly 40 hex digits.
pub fn is_address(value: &str) -> bool {
    value.len() == 42
        && value.starts_with("0x")
        && value[2..].bytes().all(|b| b.is_ascii_hexdigit())
}

/// Convert a human amount into integer base units.
///
/// Strings that are already all digits are taken as pre-scaled units and
/// returned unchanged. Anything else is multiplied by `10^decimals` and
/// truncated toward zero. Returns `None` for out-of-range decimals, empty or
/// non-numeric input, negative amounts, or results that do not fit a uint256.
pub fn parse_decimal_to_units(amount: &Amount, decimals: i64) -> Option<String> {
    if !(0..=MAX_DECIMALS).contains(&decimals) {
        return None;
    }
    match amount {
        Amount::Number(n) => scale_decimal(&n.to_string(), decimals as usize),
        Amount::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            if trimmed.bytes().all(|b| b.is_ascii_digit()) {
                U256::from_str_radix(trimmed, 10).ok()?;
                return Some(trimmed.to_string());
            }
            scale_decimal(trimmed, decimals as usize)
        }
    }
}

/// Exact decimal shift of `text` by `decimals` places, truncated.
fn scale_decimal(text: &str, decimals: usize) -> Option<String> {
    let text = text.strip_prefix('+').unwrap_or(text);
    let (mantissa, exponent) = match text.find(['e', 'E']) {
        Some(idx) => (&text[..idx], text[idx + 1..].parse::<i64>().ok()?),
        None => (text, 0),
    };

    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, f),
        None => (mantissa, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let digits: String = format!("{int_part}{frac_part}");
    let point = (int_part.len() as i64)
        .checked_add(exponent)?
        .checked_add(decimals as i64)?;
    // uint256 has 78 decimal digits; anything longer cannot fit.
    if point > digits.len() as i64 + 80 {
        return None;
    }

    let whole = if point <= 0 {
        String::from("0")
    } else if point as usize >= digits.len() {
        let mut padded = digits.clone();
        padded.extend(std::iter::repeat_n('0', point as usize - digits.len()));
        padded
    } else {
        digits[..point as usize].to_string()
    };

    let units = U256::from_str_radix(&whole, 10).ok()?;
    Some(units.to_string())
}

/// Integer reading of a JSON value the way a lenient client would send it:
/// integral numbers, or strings holding one.
pub fn integer_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<i64>().ok().or_else(|| {
                let d = parse_decimal(trimmed)?;
                if d.fract().is_zero() { i64::try_from(d).ok() } else { None }
            })
        }
        _ => None,
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Payment amounts are sent with two decimals; non-positive or unparseable
/// values yield `None` so the caller can fall back to its default.
pub fn format_payment_amount(amount: &Amount) -> Option<String> {
    let parsed = match amount {
        Amount::Number(n) => parse_decimal(&n.to_string()),
        Amount::Text(s) => parse_decimal(s.trim()),
    }?;
    if parsed <= Decimal::ZERO {
        return None;
    }
    let rounded = parsed.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    Some(format!("{rounded:.2}"))
}

/// Chain identifiers go into a URL path segment; keep them to a slug.
pub fn is_chain_slug(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

/// RPC endpoints must be absolute http(s) or ws(s) URLs, the transports
/// `cast --rpc-url` accepts over the network.
pub fn is_rpc_url(value: &str) -> bool {
    url::Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https" | "ws" | "wss") && u.has_host())
        .unwrap_or(false)
}

/// Raw allocation arrays as received from a request.
#[derive(Debug, Clone, Default)]
pub struct AllocationInput {
    pub tokens: Vec<String>,
    pub bps: Vec<Value>,
    pub decimals: Vec<Value>,
    pub price_feeds: Vec<String>,
}

/// An allocation that passed every shape and sum check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub tokens: Vec<String>,
    pub bps: Vec<u16>,
    pub decimals: Vec<u8>,
    pub price_feeds: Vec<String>,
}

pub fn validate_allocation(input: &AllocationInput) -> Result<Allocation, RebalancerError> {
    let n = input.tokens.len();
    if n == 0
        || input.bps.len() != n
        || input.decimals.len() != n
        || input.price_feeds.len() != n
    {
        return Err(RebalancerError::validation(
            "tokens, bps, decimals, priceFeeds must be equal-length arrays",
        ));
    }
    if !input.tokens.iter().all(|t| is_address(t)) {
        return Err(RebalancerError::validation("Invalid token address in tokens"));
    }
    if !input.price_feeds.iter().all(|f| is_address(f)) {
        return Err(RebalancerError::validation("Invalid address in priceFeeds"));
    }

    let mut bps_raw = Vec::with_capacity(n);
    for entry in &input.bps {
        match integer_value(entry) {
            Some(v) if v >= 0 => bps_raw.push(v as u64),
            _ => return Err(RebalancerError::validation("Invalid bps entries")),
        }
    }
    let total = bps_raw.iter().fold(0u64, |acc, v| acc.saturating_add(*v));
    if total != BPS_TOTAL {
        return Err(RebalancerError::validation("bps must sum to 10000"));
    }

    let mut decimals = Vec::with_capacity(n);
    for entry in &input.decimals {
        match integer_value(entry).and_then(|v| u8::try_from(v).ok()) {
            Some(d) => decimals.push(d),
            None => return Err(RebalancerError::validation("Invalid decimals entries")),
        }
    }

    Ok(Allocation {
        tokens: input.tokens.clone(),
        // each entry is <= BPS_TOTAL after the sum check
        bps: bps_raw.into_iter().map(|v| v as u16).collect(),
        decimals,
        price_feeds: input.price_feeds.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const USDC: &str = "0x036CbD53842c5426634e7929541eC2318f3dCF7c";
    const WETH: &str = "0x4200000000000000000000000000000000000006";
    const FEED_A: &str = "0xd30e2101a97dcbAeBCBC04F14C3f624E67A35165";
    const FEED_B: &str = "0x4aDC67696bA383F43DD60A9e78F2C97Fbbfc7cb1";

    fn allocation(bps: Value) -> AllocationInput {
        AllocationInput {
            tokens: vec![USDC.into(), WETH.into()],
            bps: serde_json::from_value(bps).unwrap(),
            decimals: vec![json!(6), json!(18)],
            price_feeds: vec![FEED_A.into(), FEED_B.into()],
        }
    }

    #[test]
    fn test_is_address() {
        assert!(is_address(USDC));
        assert!(is_address("0x0000000000000000000000000000000000000000"));
        assert!(is_address("0xABCDEFabcdef0123456789ABCDEFabcdef012345"));
        assert!(!is_address("0x036CbD53842c5426634e7929541eC2318f3dCF7"));
        assert!(!is_address("0x036CbD53842c5426634e7929541eC2318f3dCF7c0"));
        assert!(!is_address("036CbD53842c5426634e7929541eC2318f3dCF7c00"));
        assert!(!is_address("0X036CbD53842c5426634e7929541eC2318f3dCF7c"));
        assert!(!is_address("0x036CbD53842c5426634e7929541eC2318f3dCF7g"));
        assert!(!is_address(""));
        assert!(!is_address("0x036CbD53842c5426634e7929541eC2318f3dCF7c; rm"));
    }

    #[test]
    fn test_parse_units_scales_decimal_strings() {
        assert_eq!(parse_decimal_to_units(&"5.0".into(), 6).as_deref(), Some("5000000"));
        assert_eq!(parse_decimal_to_units(&"1.5".into(), 18).as_deref(), Some("1500000000000000000"));
        assert_eq!(parse_decimal_to_units(&"0.1234567".into(), 6).as_deref(), Some("123456"));
        assert_eq!(parse_decimal_to_units(&".5".into(), 2).as_deref(), Some("50"));
        assert_eq!(parse_decimal_to_units(&" 2.25 ".into(), 0).as_deref(), Some("2"));
        assert_eq!(parse_decimal_to_units(&"1e3".into(), 6).as_deref(), Some("1000000000"));
    }

    #[test]
    fn test_parse_units_passes_scaled_integers_through() {
        assert_eq!(parse_decimal_to_units(&"5000000".into(), 6).as_deref(), Some("5000000"));
        assert_eq!(parse_decimal_to_units(&"0".into(), 6).as_deref(), Some("0"));
    }

    #[test]
    fn test_parse_units_scales_json_numbers() {
        assert_eq!(parse_decimal_to_units(&Amount::from(5), 6).as_deref(), Some("5000000"));
        let amount: Amount = serde_json::from_value(json!(2.5)).unwrap();
        assert_eq!(parse_decimal_to_units(&amount, 6).as_deref(), Some("2500000"));
    }

    #[test]
    fn test_parse_units_rejects_bad_input() {
        assert_eq!(parse_decimal_to_units(&"abc".into(), 6), None);
        assert_eq!(parse_decimal_to_units(&"".into(), 6), None);
        assert_eq!(parse_decimal_to_units(&"   ".into(), 6), None);
        assert_eq!(parse_decimal_to_units(&"-1.5".into(), 6), None);
        assert_eq!(parse_decimal_to_units(&"1.2.3".into(), 6), None);
        assert_eq!(parse_decimal_to_units(&"NaN".into(), 6), None);
        assert_eq!(parse_decimal_to_units(&Amount::from(5), 37), None);
        assert_eq!(parse_decimal_to_units(&Amount::from(5), -1), None);
        assert_eq!(parse_decimal_to_units(&"1e90".into(), 6), None);
    }

    #[test]
    fn test_integer_value() {
        assert_eq!(integer_value(&json!(6000)), Some(6000));
        assert_eq!(integer_value(&json!("4000")), Some(4000));
        assert_eq!(integer_value(&json!(18.0)), Some(18));
        assert_eq!(integer_value(&json!(-3)), Some(-3));
        assert_eq!(integer_value(&json!(1.5)), None);
        assert_eq!(integer_value(&json!("")), None);
        assert_eq!(integer_value(&json!(true)), None);
        assert_eq!(integer_value(&Value::Null), None);
    }

    #[test]
    fn test_valid_allocation() {
        let alloc = validate_allocation(&allocation(json!([6000, 4000]))).unwrap();
        assert_eq!(alloc.bps, vec![6000, 4000]);
        assert_eq!(alloc.decimals, vec![6, 18]);
        assert_eq!(alloc.tokens.len(), 2);
    }

    #[test]
    fn test_allocation_sum_must_be_exact() {
        let err = validate_allocation(&allocation(json!([6000, 3999]))).unwrap_err();
        assert_eq!(err, RebalancerError::validation("bps must sum to 10000"));
        let err = validate_allocation(&allocation(json!([6000, 4001]))).unwrap_err();
        assert!(err.to_string().contains("sum to 10000"));
    }

    #[test]
    fn test_allocation_rejects_negative_and_fractional_bps() {
        let err = validate_allocation(&allocation(json!([10001, -1]))).unwrap_err();
        assert_eq!(err.to_string(), "Invalid bps entries");
        let err = validate_allocation(&allocation(json!([5000.5, 4999.5]))).unwrap_err();
        assert_eq!(err.to_string(), "Invalid bps entries");
    }

    #[test]
    fn test_allocation_length_mismatch() {
        let mut input = allocation(json!([6000, 4000]));
        input.price_feeds.pop();
        let err = validate_allocation(&input).unwrap_err();
        assert!(err.to_string().contains("equal-length"));

        let err = validate_allocation(&AllocationInput::default()).unwrap_err();
        assert!(err.to_string().contains("equal-length"));
    }

    #[test]
    fn test_allocation_rejects_bad_addresses() {
        let mut input = allocation(json!([6000, 4000]));
        input.tokens[1] = "0xnotanaddress".into();
        assert_eq!(
            validate_allocation(&input).unwrap_err().to_string(),
            "Invalid token address in tokens"
        );

        let mut input = allocation(json!([6000, 4000]));
        input.price_feeds[0] = "feed".into();
        assert_eq!(
            validate_allocation(&input).unwrap_err().to_string(),
            "Invalid address in priceFeeds"
        );
    }

    #[test]
    fn test_allocation_rejects_out_of_range_decimals() {
        let mut input = allocation(json!([6000, 4000]));
        input.decimals[1] = json!(256);
        assert_eq!(
            validate_allocation(&input).unwrap_err().to_string(),
            "Invalid decimals entries"
        );
    }

    #[test]
    fn test_format_payment_amount() {
        assert_eq!(format_payment_amount(&"10".into()).as_deref(), Some("10.00"));
        assert_eq!(format_payment_amount(&"12.345".into()).as_deref(), Some("12.35"));
        assert_eq!(format_payment_amount(&Amount::from(7)).as_deref(), Some("7.00"));
        assert_eq!(format_payment_amount(&"0".into()), None);
        assert_eq!(format_payment_amount(&"-4".into()), None);
        assert_eq!(format_payment_amount(&"lots".into()), None);
    }

    #[test]
    fn test_chain_slug_and_rpc_url() {
        assert!(is_chain_slug("base-sepolia"));
        assert!(!is_chain_slug("base/../x"));
        assert!(!is_chain_slug(""));
        assert!(is_rpc_url("https://sepolia.base.org"));
        assert!(is_rpc_url("http://localhost:8545"));
        assert!(is_rpc_url("wss://base-sepolia.example/ws"));
        assert!(is_rpc_url("ws://127.0.0.1:8546"));
        assert!(!is_rpc_url("wss://"));
        assert!(!is_rpc_url("--private-key"));
        assert!(!is_rpc_url("file:///etc/passwd"));
    }
}
