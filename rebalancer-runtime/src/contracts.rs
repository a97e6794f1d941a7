//! Contract bindings for the on-chain calls issued through `cast`.
//!
//! Uses alloy's `sol!` macro so the function signatures handed to `cast` are
//! derived from one declaration instead of hand-written strings.

use alloy::primitives::U256;
use alloy::sol;
use alloy::sol_types::SolCall;

sol! {
    interface IPortfolioFactory {
        function createUserPortfolio() external;
        function getUserPortfolio(address user) external view returns (address);
    }

    interface IUserPortfolio {
        function depositUsdc(uint256 usdcIn) external;
        function setPortfolioAllocation(
            address[] calldata tokens, uint16[] calldata bps,
            uint8[] calldata decimals, address[] calldata priceFeeds
        ) external;
        function quotePortfolioValueUsdc() external view returns (uint256);
        function getUserAllocationBps() external view returns (uint16[] memory bps);
    }

    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
    }
}

/// `cast` signature for a call: `name(args)` plus `(returns)` when the
/// output should be decoded.
pub fn cast_signature<C: SolCall>(returns: Option<&str>) -> String {
    match returns {
        Some(ret) => format!("{}({ret})", C::SIGNATURE),
        None => C::SIGNATURE.to_string(),
    }
}

/// uint256 max as 0x-prefixed hex, the "unlimited" ERC-20 allowance.
pub fn max_allowance() -> String {
    format!("0x{:x}", U256::MAX)
}

/// `cast` array literal: `[a,b,c]`.
pub fn cast_array<T: ToString>(items: &[T]) -> String {
    let joined: Vec<String> = items.iter().map(ToString::to_string).collect();
    format!("[{}]", joined.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signatures() {
        assert_eq!(
            cast_signature::<IPortfolioFactory::getUserPortfolioCall>(Some("address")),
            "getUserPortfolio(address)(address)"
        );
        assert_eq!(
            cast_signature::<IPortfolioFactory::createUserPortfolioCall>(None),
            "createUserPortfolio()"
        );
        assert_eq!(
            cast_signature::<IUserPortfolio::depositUsdcCall>(None),
            "depositUsdc(uint256)"
        );
        assert_eq!(
            cast_signature::<IUserPortfolio::setPortfolioAllocationCall>(None),
            "setPortfolioAllocation(address[],uint16[],uint8[],address[])"
        );
        assert_eq!(
            cast_signature::<IUserPortfolio::getUserAllocationBpsCall>(Some("uint16[]")),
            "getUserAllocationBps()(uint16[])"
        );
        assert_eq!(cast_signature::<IERC20::approveCall>(None), "approve(address,uint256)");
        assert_eq!(
            cast_signature::<IERC20::balanceOfCall>(Some("uint256")),
            "balanceOf(address)(uint256)"
        );
    }

    #[test]
    fn test_max_allowance() {
        let max = max_allowance();
        assert_eq!(max.len(), 66);
        assert!(max.starts_with("0x"));
        assert!(max[2..].chars().all(|c| c == 'f'));
    }

    #[test]
    fn test_cast_array() {
        assert_eq!(cast_array(&[6000u16, 4000]), "[6000,4000]");
        assert_eq!(cast_array::<u8>(&[]), "[]");
    }
}
