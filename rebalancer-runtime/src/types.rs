use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::Amount;

// ── Requests ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioLookupRequest {
    #[serde(default)]
    pub user_address: String,
    pub rpc_url: Option<String>,
    pub factory: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePortfolioRequest {
    pub rpc_url: Option<String>,
    pub factory: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveRequest {
    #[serde(default)]
    pub user_contract: String,
    pub usdc_address: Option<String>,
    pub rpc_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    #[serde(default)]
    pub user_contract: String,
    pub amount: Option<Amount>,
    /// Token decimals; 6 (USDC) when omitted.
    pub decimals: Option<Value>,
    pub rpc_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocateRequest {
    #[serde(default)]
    pub user_contract: String,
    pub tokens: Option<Vec<String>>,
    pub bps: Option<Vec<Value>>,
    pub decimals: Option<Vec<Value>>,
    pub price_feeds: Option<Vec<String>>,
    pub rpc_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckBalanceRequest {
    #[serde(default)]
    pub user_contract: String,
    pub token_address: Option<String>,
    pub rpc_url: Option<String>,
}

/// Read-only queries against a user portfolio contract.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioViewRequest {
    #[serde(default)]
    pub user_contract: String,
    pub rpc_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteRequest {
    pub destination_address: Option<String>,
    pub payment_amount: Option<Amount>,
    pub payment_currency: Option<String>,
    pub payment_method: Option<String>,
    pub country: Option<String>,
    pub purchase_currency: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BalanceQuery {
    pub chain: Option<String>,
    pub address: Option<String>,
}

// ── Results ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioLookup {
    /// Zero address means the user has no portfolio yet.
    pub portfolio_address: String,
}

/// Raw `cast send` output for a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxOutput {
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenBalance {
    /// Base units, unformatted.
    pub balance: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortfolioValue {
    /// USDC base units.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetAllocation {
    pub bps: Vec<u16>,
}

/// Signed bearer token for the onramp token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedJwt {
    pub jwt: String,
}

/// Body sent to the onramp quote API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotePayload {
    pub purchase_currency: String,
    pub payment_amount: String,
    pub payment_currency: String,
    pub payment_method: String,
    pub country: String,
    pub destination_address: String,
}

/// External API responses are passed through untouched.
pub type ExternalJson = Value;
