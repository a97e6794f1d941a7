//! Process-wide configuration, assembled once at startup.

use std::fmt;

use crate::error::RebalancerError;
use crate::validation::is_address;

pub const DEFAULT_PORT: u16 = 3007;
pub const DEFAULT_QUOTE_URL: &str = "https://api.developer.coinbase.com/onramp/v1/buy/quote";
pub const DEFAULT_BALANCES_URL: &str =
    "https://api.cdp.coinbase.com/platform/v2/data/evm/token-balances";

#[derive(Clone)]
pub struct RebalancerConfig {
    /// Default chain RPC endpoint; requests may override it.
    pub rpc_url: Option<String>,
    /// Signing key for write transactions. Configuration-only.
    pub private_key: Option<String>,
    pub factory_address: Option<String>,
    pub usdc_address: Option<String>,
    pub weth_address: Option<String>,
    pub usdc_price_feed: Option<String>,
    pub weth_price_feed: Option<String>,
    /// Credential file handed to `cdpcurl -k`.
    pub cdp_key_path: String,
    /// CDP API key id, used as `kid` and `sub` of issued JWTs.
    pub cdp_api_key_name: Option<String>,
    /// Base64 Ed25519 key (32-byte seed or 64-byte keypair) that signs JWTs.
    pub cdp_api_key_secret: Option<String>,
    pub cast_bin: String,
    pub cdpcurl_bin: String,
    pub quote_url: String,
    pub balances_base_url: String,
    pub port: u16,
    /// Empty means permissive CORS.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for RebalancerConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            private_key: None,
            factory_address: None,
            usdc_address: None,
            weth_address: None,
            usdc_price_feed: None,
            weth_price_feed: None,
            cdp_key_path: "cdp_api_key.json".to_string(),
            cdp_api_key_name: None,
            cdp_api_key_secret: None,
            cast_bin: "cast".to_string(),
            cdpcurl_bin: "cdpcurl".to_string(),
            quote_url: DEFAULT_QUOTE_URL.to_string(),
            balances_base_url: DEFAULT_BALANCES_URL.to_string(),
            port: DEFAULT_PORT,
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl RebalancerConfig {
    /// Read configuration from the process environment.
    ///
    /// Env vars:
    /// - `BASE_SEPOLIA_RPC_URL` (fallback `RPC_URL`)
    /// - `PRIVATE_KEY`
    /// - `FACTORY` (fallback `FACTORY_CONTRACT`)
    /// - `USDC_ADDRESS`, `WETH_ADDRESS`, `USDC_PRICE_FEED`, `WETH_PRICE_FEED`
    /// - `CDP_KEY_PATH` (default: `$HOME/Downloads/cdp_api_key.json`)
    /// - `CDP_API_KEY_NAME`, `CDP_API_KEY_SECRET` (JWT signing)
    /// - `CAST_BIN`, `CDPCURL_BIN`, `CDP_QUOTE_URL`, `CDP_BALANCES_URL`
    /// - `PORT` (default: 3007), `CORS_ALLOWED_ORIGINS` (comma-separated)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let cdp_key_path = get("CDP_KEY_PATH").unwrap_or_else(|| match get("HOME") {
            Some(home) => format!("{home}/Downloads/cdp_api_key.json"),
            None => defaults.cdp_key_path.clone(),
        });

        Self {
            rpc_url: get("BASE_SEPOLIA_RPC_URL").or_else(|| get("RPC_URL")),
            private_key: get("PRIVATE_KEY"),
            factory_address: get("FACTORY").or_else(|| get("FACTORY_CONTRACT")),
            usdc_address: get("USDC_ADDRESS"),
            weth_address: get("WETH_ADDRESS"),
            usdc_price_feed: get("USDC_PRICE_FEED"),
            weth_price_feed: get("WETH_PRICE_FEED"),
            cdp_key_path,
            cdp_api_key_name: get("CDP_API_KEY_NAME"),
            cdp_api_key_secret: get("CDP_API_KEY_SECRET"),
            cast_bin: get("CAST_BIN").unwrap_or(defaults.cast_bin),
            cdpcurl_bin: get("CDPCURL_BIN").unwrap_or(defaults.cdpcurl_bin),
            quote_url: get("CDP_QUOTE_URL").unwrap_or(defaults.quote_url),
            balances_base_url: get("CDP_BALANCES_URL").unwrap_or(defaults.balances_base_url),
            port: get("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            cors_allowed_origins: get("CORS_ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Token list used when an allocation request omits `tokens`.
    pub fn default_tokens(&self) -> Result<Vec<String>, RebalancerError> {
        configured_addresses([
            ("USDC_ADDRESS", &self.usdc_address),
            ("WETH_ADDRESS", &self.weth_address),
        ])
    }

    /// Price feed list used when an allocation request omits `priceFeeds`.
    pub fn default_price_feeds(&self) -> Result<Vec<String>, RebalancerError> {
        configured_addresses([
            ("USDC_PRICE_FEED", &self.usdc_price_feed),
            ("WETH_PRICE_FEED", &self.weth_price_feed),
        ])
    }

    /// Values that must never leave the process in logs or responses.
    pub fn secrets(&self) -> Vec<&str> {
        let mut out = vec![self.cdp_key_path.as_str()];
        if let Some(key) = &self.private_key {
            out.push(key.as_str());
        }
        if let Some(secret) = &self.cdp_api_key_secret {
            out.push(secret.as_str());
        }
        out
    }
}

/// Defaults stand in for the caller, so a missing or malformed entry is a
/// deployment problem rather than a bad request.
fn configured_addresses<const N: usize>(
    entries: [(&str, &Option<String>); N],
) -> Result<Vec<String>, RebalancerError> {
    entries
        .into_iter()
        .map(|(env, value)| match value.as_deref() {
            Some(addr) if is_address(addr) => Ok(addr.to_string()),
            Some(_) => Err(RebalancerError::configuration(format!(
                "{env} env var is not a valid address"
            ))),
            None => Err(RebalancerError::configuration(format!(
                "{env} env var is required for the default allocation"
            ))),
        })
        .collect()
}

impl fmt::Debug for RebalancerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RebalancerConfig")
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &self.private_key.as_ref().map(|_| "[REDACTED]"))
            .field("factory_address", &self.factory_address)
            .field("usdc_address", &self.usdc_address)
            .field("weth_address", &self.weth_address)
            .field("usdc_price_feed", &self.usdc_price_feed)
            .field("weth_price_feed", &self.weth_price_feed)
            .field("cdp_key_path", &"[REDACTED]")
            .field("cdp_api_key_name", &self.cdp_api_key_name)
            .field(
                "cdp_api_key_secret",
                &self.cdp_api_key_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("cast_bin", &self.cast_bin)
            .field("cdpcurl_bin", &self.cdpcurl_bin)
            .field("quote_url", &self.quote_url)
            .field("balances_base_url", &self.balances_base_url)
            .field("port", &self.port)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = RebalancerConfig::from_lookup(lookup(&[]));
        assert_eq!(config.rpc_url, None);
        assert_eq!(config.private_key, None);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.cast_bin, "cast");
        assert_eq!(config.cdpcurl_bin, "cdpcurl");
        assert_eq!(config.quote_url, DEFAULT_QUOTE_URL);
        assert!(config.cors_allowed_origins.is_empty());
    }

    #[test]
    fn test_fallback_variables() {
        let config = RebalancerConfig::from_lookup(lookup(&[
            ("RPC_URL", "http://localhost:8545"),
            ("FACTORY_CONTRACT", "0x1111111111111111111111111111111111111111"),
            ("HOME", "/home/dev"),
        ]));
        assert_eq!(config.rpc_url.as_deref(), Some("http://localhost:8545"));
        assert_eq!(
            config.factory_address.as_deref(),
            Some("0x1111111111111111111111111111111111111111")
        );
        assert_eq!(config.cdp_key_path, "/home/dev/Downloads/cdp_api_key.json");
    }

    #[test]
    fn test_primary_variables_win_and_blanks_are_unset() {
        let config = RebalancerConfig::from_lookup(lookup(&[
            ("BASE_SEPOLIA_RPC_URL", "https://sepolia.base.org"),
            ("RPC_URL", "http://localhost:8545"),
            ("PRIVATE_KEY", "   "),
            ("PORT", "not-a-port"),
            ("CORS_ALLOWED_ORIGINS", "http://localhost:3000, https://app.example"),
        ]));
        assert_eq!(config.rpc_url.as_deref(), Some("https://sepolia.base.org"));
        assert_eq!(config.private_key, None);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(
            config.cors_allowed_origins,
            vec!["http://localhost:3000".to_string(), "https://app.example".to_string()]
        );
    }

    #[test]
    fn test_default_lists_require_every_entry() {
        let config = RebalancerConfig {
            usdc_address: Some("0x036CbD53842c5426634e7929541eC2318f3dCF7c".into()),
            weth_address: Some("0x4200000000000000000000000000000000000006".into()),
            weth_price_feed: Some("0x4aDC67696bA383F43DD60A9e78F2C97Fbbfc7cb1".into()),
            ..Default::default()
        };
        assert_eq!(config.default_tokens().unwrap().len(), 2);
        assert_eq!(
            config.default_price_feeds().unwrap_err(),
            RebalancerError::configuration(
                "USDC_PRICE_FEED env var is required for the default allocation"
            )
        );
    }

    #[test]
    fn test_malformed_default_is_configuration_error() {
        let config = RebalancerConfig {
            usdc_address: Some("0x036CbD53842c5426634e7929541eC2318f3dCF7c".into()),
            weth_address: Some("weth".into()),
            ..Default::default()
        };
        assert_eq!(
            config.default_tokens().unwrap_err(),
            RebalancerError::configuration("WETH_ADDRESS env var is not a valid address")
        );
    }

    #[test]
    fn test_debug_masks_private_key() {
        let config = RebalancerConfig {
            private_key: Some("0xdeadbeef".into()),
            cdp_api_key_name: Some("key-id".into()),
            cdp_api_key_secret: Some("c2VjcmV0LXNlZWQ=".into()),
            ..Default::default()
        };
        let shown = format!("{config:?}");
        assert!(!shown.contains("deadbeef"));
        assert!(!shown.contains("c2VjcmV0LXNlZWQ="));
        assert!(shown.contains("key-id"));
        assert!(shown.contains("[REDACTED]"));
    }
}
