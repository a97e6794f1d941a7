//! Portfolio action orchestration.
//!
//! Each operation resolves its connection parameters, validates every value
//! that will be placed on the command line, runs one external command through
//! the injected [`CommandRunner`], and interprets the output.
//!
//! Nothing here serializes concurrent writes: two deposits for the same user
//! contract submitted at once both run, each signing its own transaction.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{Value, json};

use crate::config::RebalancerConfig;
use crate::contracts::{self, IERC20, IPortfolioFactory, IUserPortfolio, cast_signature};
use crate::error::RebalancerError;
use crate::jwt::{CdpJwtSigner, ONRAMP_TOKEN_URI};
use crate::output;
use crate::shell::{CommandOutput, CommandRunner, CommandSpec};
use crate::types::*;
use crate::validation::{self, AllocationInput, is_address};

/// Chain used for wallet balance lookups when the caller names none.
pub const DEFAULT_BALANCES_CHAIN: &str = "base-sepolia";

/// Decimals of USDC, the deposit asset.
pub const DEFAULT_DEPOSIT_DECIMALS: i64 = 6;

const DEFAULT_BPS: [u64; 2] = [6000, 4000];
const DEFAULT_DECIMALS: [u64; 2] = [6, 18];

pub struct PortfolioActions {
    config: Arc<RebalancerConfig>,
    runner: Arc<dyn CommandRunner>,
}

impl PortfolioActions {
    pub fn new(config: Arc<RebalancerConfig>, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &RebalancerConfig {
        &self.config
    }

    // ── Operations ──────────────────────────────────────────────────────────

    /// Portfolio contract registered for `user_address` in the factory.
    pub async fn lookup_portfolio(
        &self,
        request: &PortfolioLookupRequest,
    ) -> Result<PortfolioLookup, RebalancerError> {
        tracing::info!(op = "by-user", user = %request.user_address, "request");
        let rpc_url = self.rpc_url(request.rpc_url.as_deref())?;
        let factory = resolve_address(
            request.factory.as_deref(),
            self.config.factory_address.as_deref(),
            "factory",
            "FACTORY",
        )?;
        require_address(&request.user_address, "Invalid user address")?;

        let cmd = self
            .cast("call", &factory)
            .arg(cast_signature::<IPortfolioFactory::getUserPortfolioCall>(Some("address")))
            .arg(&request.user_address)
            .args(["--rpc-url", rpc_url.as_str()]);

        let out = self.execute("by-user", "Failed to fetch user portfolio", cmd).await?;
        let portfolio_address = self.scrub_parse(output::address_output(&out.stdout))?;
        tracing::info!(op = "by-user", portfolio = %portfolio_address, "resolved");
        Ok(PortfolioLookup { portfolio_address })
    }

    /// Create a portfolio for the signing account through the factory.
    pub async fn create_portfolio(
        &self,
        request: &CreatePortfolioRequest,
    ) -> Result<TxOutput, RebalancerError> {
        tracing::info!(op = "create", "request");
        let rpc_url = self.rpc_url(request.rpc_url.as_deref())?;
        let private_key = self.private_key()?;
        let factory = resolve_address(
            request.factory.as_deref(),
            self.config.factory_address.as_deref(),
            "factory",
            "FACTORY",
        )?;

        let cmd = self
            .cast("send", &factory)
            .arg(cast_signature::<IPortfolioFactory::createUserPortfolioCall>(None))
            .args(["--rpc-url", rpc_url.as_str(), "--private-key", private_key]);

        let out = self.execute("create", "Portfolio creation failed", cmd).await?;
        Ok(TxOutput { output: out.stdout })
    }

    /// Grant the user contract an unlimited USDC allowance.
    pub async fn approve_max_allowance(
        &self,
        request: &ApproveRequest,
    ) -> Result<TxOutput, RebalancerError> {
        tracing::info!(op = "approve", user_contract = %request.user_contract, "request");
        let rpc_url = self.rpc_url(request.rpc_url.as_deref())?;
        let private_key = self.private_key()?;
        require_address(&request.user_contract, "Invalid userContract address")?;
        let usdc = resolve_address(
            request.usdc_address.as_deref(),
            self.config.usdc_address.as_deref(),
            "usdcAddress",
            "USDC_ADDRESS",
        )?;

        let cmd = self
            .cast("send", &usdc)
            .arg(cast_signature::<IERC20::approveCall>(None))
            .arg(&request.user_contract)
            .arg(contracts::max_allowance())
            .args(["--rpc-url", rpc_url.as_str(), "--private-key", private_key]);

        let out = self.execute("approve", "Approval failed", cmd).await?;
        Ok(TxOutput { output: out.stdout })
    }

    /// Deposit USDC into the user contract.
    pub async fn deposit(&self, request: &DepositRequest) -> Result<TxOutput, RebalancerError> {
        tracing::info!(
            op = "deposit",
            user_contract = %request.user_contract,
            amount = ?request.amount,
            decimals = ?request.decimals,
            "request"
        );
        let rpc_url = self.rpc_url(request.rpc_url.as_deref())?;
        let private_key = self.private_key()?;
        require_address(&request.user_contract, "Invalid userContract address")?;

        let decimals = match &request.decimals {
            None | Some(Value::Null) => Some(DEFAULT_DEPOSIT_DECIMALS),
            Some(v) => validation::integer_value(v),
        };
        let units = request
            .amount
            .as_ref()
            .zip(decimals)
            .and_then(|(amount, decimals)| validation::parse_decimal_to_units(amount, decimals))
            .ok_or_else(|| RebalancerError::validation("Invalid amount"))?;

        let cmd = self
            .cast("send", &request.user_contract)
            .arg(cast_signature::<IUserPortfolio::depositUsdcCall>(None))
            .arg(units)
            .args(["--rpc-url", rpc_url.as_str(), "--private-key", private_key]);

        let out = self.execute("deposit", "Deposit failed", cmd).await?;
        Ok(TxOutput { output: out.stdout })
    }

    /// Set the target allocation of the user contract.
    pub async fn set_allocation(
        &self,
        request: &AllocateRequest,
    ) -> Result<TxOutput, RebalancerError> {
        tracing::info!(
            op = "allocate",
            user_contract = %request.user_contract,
            tokens = ?request.tokens,
            bps = ?request.bps,
            "request"
        );
        let rpc_url = self.rpc_url(request.rpc_url.as_deref())?;
        let private_key = self.private_key()?;
        require_address(&request.user_contract, "Invalid userContract address")?;

        let input = AllocationInput {
            tokens: match &request.tokens {
                Some(tokens) => tokens.clone(),
                None => self.config.default_tokens()?,
            },
            bps: request
                .bps
                .clone()
                .unwrap_or_else(|| DEFAULT_BPS.iter().map(|b| json!(b)).collect()),
            decimals: request
                .decimals
                .clone()
                .unwrap_or_else(|| DEFAULT_DECIMALS.iter().map(|d| json!(d)).collect()),
            price_feeds: match &request.price_feeds {
                Some(feeds) => feeds.clone(),
                None => self.config.default_price_feeds()?,
            },
        };
        let allocation = validation::validate_allocation(&input)?;

        let cmd = self
            .cast("send", &request.user_contract)
            .arg(cast_signature::<IUserPortfolio::setPortfolioAllocationCall>(None))
            .arg(contracts::cast_array(&allocation.tokens))
            .arg(contracts::cast_array(&allocation.bps))
            .arg(contracts::cast_array(&allocation.decimals))
            .arg(contracts::cast_array(&allocation.price_feeds))
            .args(["--rpc-url", rpc_url.as_str(), "--private-key", private_key]);

        let out = self.execute("allocate", "Allocation failed", cmd).await?;
        Ok(TxOutput { output: out.stdout })
    }

    /// ERC-20 `balanceOf(userContract)`, USDC unless another token is named.
    pub async fn check_token_balance(
        &self,
        request: &CheckBalanceRequest,
    ) -> Result<TokenBalance, RebalancerError> {
        tracing::info!(op = "check", user_contract = %request.user_contract, "request");
        let rpc_url = self.rpc_url(request.rpc_url.as_deref())?;
        require_address(&request.user_contract, "Invalid userContract address")?;
        let token = resolve_address(
            request.token_address.as_deref(),
            self.config.usdc_address.as_deref(),
            "tokenAddress",
            "USDC_ADDRESS",
        )?;

        let cmd = self
            .cast("call", &token)
            .arg(cast_signature::<IERC20::balanceOfCall>(Some("uint256")))
            .arg(&request.user_contract)
            .args(["--rpc-url", rpc_url.as_str()]);

        let out = self.execute("check", "Check failed", cmd).await?;
        let balance = self.scrub_parse(output::uint_output(&out.stdout))?;
        Ok(TokenBalance { balance })
    }

    /// Portfolio value in USDC base units, as quoted by the contract.
    pub async fn portfolio_value(
        &self,
        request: &PortfolioViewRequest,
    ) -> Result<PortfolioValue, RebalancerError> {
        tracing::info!(op = "value", user_contract = %request.user_contract, "request");
        let rpc_url = self.rpc_url(request.rpc_url.as_deref())?;
        require_address(&request.user_contract, "Invalid userContract address")?;

        let cmd = self
            .cast("call", &request.user_contract)
            .arg(cast_signature::<IUserPortfolio::quotePortfolioValueUsdcCall>(Some("uint256")))
            .args(["--rpc-url", rpc_url.as_str()]);

        let out = self.execute("value", "Failed to fetch portfolio value", cmd).await?;
        let value = self.scrub_parse(output::uint_output(&out.stdout))?;
        Ok(PortfolioValue { value })
    }

    /// Target allocation currently stored in the user contract.
    pub async fn target_allocation(
        &self,
        request: &PortfolioViewRequest,
    ) -> Result<TargetAllocation, RebalancerError> {
        tracing::info!(op = "allocation", user_contract = %request.user_contract, "request");
        let rpc_url = self.rpc_url(request.rpc_url.as_deref())?;
        require_address(&request.user_contract, "Invalid userContract address")?;

        let cmd = self
            .cast("call", &request.user_contract)
            .arg(cast_signature::<IUserPortfolio::getUserAllocationBpsCall>(Some("uint16[]")))
            .args(["--rpc-url", rpc_url.as_str()]);

        let out = self.execute("allocation", "Failed to fetch allocation", cmd).await?;
        let bps = self.scrub_parse(output::uint16_array_output(&out.stdout))?;
        Ok(TargetAllocation { bps })
    }

    /// Onramp buy quote from the payments API.
    pub async fn buy_quote(&self, request: &QuoteRequest) -> Result<ExternalJson, RebalancerError> {
        let destination = request
            .destination_address
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| RebalancerError::validation("destination_address is required"))?;
        require_address(destination, "Invalid destination_address")?;

        let payload = build_quote_payload(request, destination);
        tracing::info!(op = "quote", payload = ?payload, "request");
        let body = serde_json::to_string(&payload)
            .map_err(|e| RebalancerError::validation(format!("Invalid quote payload: {e}")))?;

        let cmd = CommandSpec::new(&self.config.cdpcurl_bin)
            .args(["-X", "POST", self.config.quote_url.as_str()])
            .args(["-k", self.config.cdp_key_path.as_str()])
            .args(["-d", body.as_str()]);

        let out = self.execute("quote", "Failed to execute quote command", cmd).await?;
        self.scrub_parse(output::json_output(&out.stdout, "quote"))
    }

    /// Token balances held by a wallet, from the payments platform API.
    pub async fn wallet_balances(&self, query: &BalanceQuery) -> Result<ExternalJson, RebalancerError> {
        let chain = query
            .chain
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_BALANCES_CHAIN);
        let address = query
            .address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| RebalancerError::validation("address is required"))?;
        tracing::info!(op = "balances", chain, address, "request");

        if !validation::is_chain_slug(chain) {
            return Err(RebalancerError::validation("Invalid chain"));
        }
        require_address(address, "Invalid address")?;

        let url = self.balances_url(chain, address)?;
        let cmd = CommandSpec::new(&self.config.cdpcurl_bin)
            .args(["-k", self.config.cdp_key_path.as_str()])
            .arg(url);

        let out = self.execute("balances", "Failed to execute balances command", cmd).await?;
        self.scrub_parse(output::json_output(&out.stdout, "balances"))
    }

    /// Bearer token for the onramp token endpoint, signed with the CDP API key.
    pub fn issue_jwt(&self) -> Result<IssuedJwt, RebalancerError> {
        let (Some(key_name), Some(secret)) = (
            self.config.cdp_api_key_name.as_deref(),
            self.config.cdp_api_key_secret.as_deref(),
        ) else {
            tracing::warn!("missing CDP_API_KEY_NAME or CDP_API_KEY_SECRET");
            return Err(RebalancerError::configuration(
                "CDP_API_KEY_NAME and CDP_API_KEY_SECRET env vars are required",
            ));
        };
        let signer = CdpJwtSigner::new(key_name, secret)?;
        let jwt = signer.sign(ONRAMP_TOKEN_URI, chrono::Utc::now().timestamp())?;
        tracing::info!(op = "jwt", kid = %key_name, uri = ONRAMP_TOKEN_URI, "issued");
        Ok(IssuedJwt { jwt })
    }

    // ── Helpers ─────────────────────────────────────────────────────────────

    fn cast(&self, subcommand: &str, target: &str) -> CommandSpec {
        CommandSpec::new(&self.config.cast_bin).args([subcommand, target])
    }

    /// Request override first, then configuration.
    fn rpc_url(&self, requested: Option<&str>) -> Result<String, RebalancerError> {
        if let Some(url) = requested.map(str::trim).filter(|u| !u.is_empty()) {
            if !validation::is_rpc_url(url) {
                tracing::warn!("rejected rpcUrl override");
                return Err(RebalancerError::validation("Invalid rpcUrl"));
            }
            return Ok(url.to_string());
        }
        match self.config.rpc_url.as_deref() {
            Some(url) if validation::is_rpc_url(url) => Ok(url.to_string()),
            Some(_) => Err(RebalancerError::configuration(
                "BASE_SEPOLIA_RPC_URL is not a valid RPC URL",
            )),
            None => {
                tracing::warn!("missing rpcUrl and BASE_SEPOLIA_RPC_URL");
                Err(RebalancerError::configuration(
                    "rpcUrl (or BASE_SEPOLIA_RPC_URL env) is required",
                ))
            }
        }
    }

    fn private_key(&self) -> Result<&str, RebalancerError> {
        self.config.private_key.as_deref().ok_or_else(|| {
            tracing::warn!("missing PRIVATE_KEY");
            RebalancerError::configuration("PRIVATE_KEY env var is required")
        })
    }

    fn balances_url(&self, chain: &str, address: &str) -> Result<String, RebalancerError> {
        let invalid = || RebalancerError::configuration("CDP_BALANCES_URL is not a valid base URL");
        let mut url = url::Url::parse(&self.config.balances_base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .push(chain)
            .push(address);
        Ok(url.to_string())
    }

    /// Replace configured secrets in text bound for logs or responses.
    fn scrub(&self, text: &str) -> String {
        self.config
            .secrets()
            .into_iter()
            .filter(|s| !s.is_empty())
            .fold(text.to_string(), |acc, secret| acc.replace(secret, "[REDACTED]"))
    }

    /// Parse failures echo raw stdout back to the caller; mask secrets in it.
    fn scrub_parse<T>(&self, parsed: Result<T, RebalancerError>) -> Result<T, RebalancerError> {
        parsed.map_err(|e| match e {
            RebalancerError::ResponseParse {
                message,
                raw_output,
            } => {
                let raw_output = self.scrub(&raw_output);
                tracing::warn!(message = %message, raw_output = %raw_output, "unexpected command output");
                RebalancerError::ResponseParse {
                    message,
                    raw_output,
                }
            }
            other => other,
        })
    }

    async fn execute(
        &self,
        op: &'static str,
        failure: &str,
        command: CommandSpec,
    ) -> Result<CommandOutput, RebalancerError> {
        let started = Instant::now();
        let result = self.runner.run(&command).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(out) => {
                if !out.stderr.trim().is_empty() {
                    tracing::warn!(op, stderr = %self.scrub(out.stderr.trim()), "command wrote to stderr");
                }
                tracing::info!(op, duration_ms, "completed");
                Ok(out)
            }
            Err(e) => {
                let details = self.scrub(e.diagnostic());
                tracing::error!(op, duration_ms, error = %self.scrub(&e.error), details = %details, "{failure}");
                Err(RebalancerError::Execution {
                    message: failure.to_string(),
                    details,
                })
            }
        }
    }
}

fn require_address(value: &str, message: &str) -> Result<(), RebalancerError> {
    if is_address(value) {
        Ok(())
    } else {
        tracing::warn!("{message}");
        Err(RebalancerError::validation(message))
    }
}

/// Request value first, then configuration. A bad request value is the
/// caller's fault; a missing or bad configured value is the deployment's.
fn resolve_address(
    requested: Option<&str>,
    configured: Option<&str>,
    field: &str,
    env: &str,
) -> Result<String, RebalancerError> {
    if let Some(addr) = requested.map(str::trim).filter(|a| !a.is_empty()) {
        require_address(addr, &format!("Invalid {field}"))?;
        return Ok(addr.to_string());
    }
    match configured {
        Some(addr) if is_address(addr) => Ok(addr.to_string()),
        Some(_) => Err(RebalancerError::configuration(format!(
            "{env} env var is not a valid address"
        ))),
        None => Err(RebalancerError::configuration(format!(
            "{field} (or {env} env) is required"
        ))),
    }
}

fn build_quote_payload(request: &QuoteRequest, destination: &str) -> QuotePayload {
    let or_default = |value: &Option<String>, default: &str| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(default)
            .to_string()
    };
    QuotePayload {
        purchase_currency: or_default(&request.purchase_currency, "USDC"),
        payment_amount: request
            .payment_amount
            .as_ref()
            .and_then(validation::format_payment_amount)
            .unwrap_or_else(|| "5.00".to_string()),
        payment_currency: or_default(&request.payment_currency, "USD"),
        payment_method: or_default(&request.payment_method, "CARD"),
        country: or_default(&request.country, "US"),
        destination_address: destination.to_string(),
    }
}
