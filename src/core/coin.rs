use crate::core::abi::ContractCall;
use crate::core::transport::IMulticall3;
use crate::errors::CurveError;
use crate::math::{Amount, ToDecimal, format_units, parse_units};
use alloy_primitives::{Address, U256, address};
use alloy_sol_types::sol;
use serde::{Deserialize, Serialize};
use std::fmt;

sol! {
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function totalSupply() external view returns (uint256);
    }
}

/// Placeholder address pools use for the chain's native asset.
pub const NATIVE_COIN: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// A coin as a pool sees it. Balances and allowances are never cached here;
/// every read goes through one multicall snapshot of the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

impl Coin {
    pub fn new(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            decimals,
        }
    }

    pub fn is_native(&self) -> bool {
        self.address == NATIVE_COIN
    }

    /// Native balances are read through Multicall3 so they land in the same
    /// snapshot as the ERC-20 reads.
    pub fn balance_call(&self, owner: Address, multicall: Address) -> ContractCall {
        if self.is_native() {
            ContractCall::from_sol(multicall, &IMulticall3::getEthBalanceCall { addr: owner })
        } else {
            ContractCall::from_sol(self.address, &IERC20::balanceOfCall { owner })
        }
    }

    pub fn allowance_call(&self, owner: Address, spender: Address) -> ContractCall {
        ContractCall::from_sol(self.address, &IERC20::allowanceCall { owner, spender })
    }

    pub fn approve_call(&self, spender: Address, amount: U256) -> ContractCall {
        ContractCall::from_sol(self.address, &IERC20::approveCall { spender, amount })
    }

    pub fn total_supply_call(&self) -> ContractCall {
        ContractCall::from_sol(self.address, &IERC20::totalSupplyCall {})
    }

    pub fn parse<T: ToDecimal + ?Sized>(&self, value: &T) -> Result<U256, CurveError> {
        parse_units(value, self.decimals)
    }

    pub fn format(&self, raw: U256) -> String {
        format_units(raw, self.decimals)
    }

    pub fn amount(&self, raw: U256) -> Amount {
        Amount::from_raw(raw, self.decimals)
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.address)
    }
}
