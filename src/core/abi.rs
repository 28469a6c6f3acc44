use crate::errors::CurveError;
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, Bytes, I256, U256, keccak256};
use alloy_sol_types::SolCall;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Solidity type of the coin-index arguments. Early pools take `int128`,
/// later ones `uint256`; the selector differs between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    Int128,
    Uint256,
}

/// A single argument of a shape-dependent pool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallArg {
    Uint(U256),
    Index(usize, IndexType),
    Bool(bool),
    Address(Address),
    /// `uint256[N]` when `dynamic` is false, `uint256[]` otherwise.
    Amounts { values: Vec<U256>, dynamic: bool },
}

impl CallArg {
    pub fn amounts(values: &[U256], dynamic: bool) -> Self {
        CallArg::Amounts {
            values: values.to_vec(),
            dynamic,
        }
    }

    fn type_name(&self) -> String {
        match self {
            CallArg::Uint(_) => "uint256".to_string(),
            CallArg::Index(_, IndexType::Int128) => "int128".to_string(),
            CallArg::Index(_, IndexType::Uint256) => "uint256".to_string(),
            CallArg::Bool(_) => "bool".to_string(),
            CallArg::Address(_) => "address".to_string(),
            CallArg::Amounts { dynamic: true, .. } => "uint256[]".to_string(),
            CallArg::Amounts { values, .. } => format!("uint256[{}]", values.len()),
        }
    }

    fn to_sol_value(&self) -> DynSolValue {
        match self {
            CallArg::Uint(v) => DynSolValue::Uint(*v, 256),
            CallArg::Index(i, IndexType::Int128) => {
                DynSolValue::Int(I256::from_raw(U256::from(*i)), 128)
            }
            CallArg::Index(i, IndexType::Uint256) => DynSolValue::Uint(U256::from(*i), 256),
            CallArg::Bool(b) => DynSolValue::Bool(*b),
            CallArg::Address(a) => DynSolValue::Address(*a),
            CallArg::Amounts { values, dynamic } => {
                let items = values.iter().map(|v| DynSolValue::Uint(*v, 256)).collect();
                if *dynamic {
                    DynSolValue::Array(items)
                } else {
                    DynSolValue::FixedArray(items)
                }
            }
        }
    }
}

/// A fully encoded contract call: target, human-readable signature, calldata
/// and attached native value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub signature: String,
    pub calldata: Bytes,
    pub value: U256,
}

impl ContractCall {
    pub fn new(to: Address, function: &str, args: Vec<CallArg>) -> Self {
        let signature = format!(
            "{}({})",
            function,
            args.iter()
                .map(CallArg::type_name)
                .collect::<Vec<_>>()
                .join(",")
        );
        let selector = keccak256(signature.as_bytes());
        let params =
            DynSolValue::Tuple(args.iter().map(CallArg::to_sol_value).collect()).abi_encode_params();
        let mut calldata = Vec::with_capacity(4 + params.len());
        calldata.extend_from_slice(&selector[..4]);
        calldata.extend_from_slice(&params);
        Self {
            to,
            signature,
            calldata: calldata.into(),
            value: U256::ZERO,
        }
    }

    pub fn from_sol<C: SolCall>(to: Address, call: &C) -> Self {
        Self {
            to,
            signature: C::SIGNATURE.to_string(),
            calldata: call.abi_encode().into(),
            value: U256::ZERO,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn selector(&self) -> [u8; 4] {
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&self.calldata[..4]);
        selector
    }
}

impl fmt::Display for ContractCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.signature, self.to)
    }
}

pub fn decode_u256(bytes: &Bytes) -> Result<U256, CurveError> {
    if bytes.len() < 32 {
        return Err(CurveError::AbiDecodeError(format!(
            "expected a 32-byte word, got {} bytes",
            bytes.len()
        )));
    }
    Ok(U256::from_be_slice(&bytes[..32]))
}

pub fn encode_u256(value: U256) -> Bytes {
    Bytes::from(value.to_be_bytes::<32>().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, hex};

    const POOL: Address = address!("bEbc44782C7dB0a1A60Cb6fe97d0b483032FF1C7");

    #[test]
    fn fixed_array_signature_and_selector() {
        let call = ContractCall::new(
            POOL,
            "add_liquidity",
            vec![
                CallArg::amounts(&[U256::from(1), U256::from(2), U256::from(3)], false),
                CallArg::Uint(U256::from(4)),
            ],
        );
        assert_eq!(call.signature, "add_liquidity(uint256[3],uint256)");
        // 3pool add_liquidity selector
        assert_eq!(call.selector(), hex!("4515cef3"));
        assert_eq!(call.calldata.len(), 4 + 4 * 32);
    }

    #[test]
    fn int128_indices_change_the_selector() {
        let old = ContractCall::new(
            POOL,
            "exchange",
            vec![
                CallArg::Index(0, IndexType::Int128),
                CallArg::Index(1, IndexType::Int128),
                CallArg::Uint(U256::from(1)),
                CallArg::Uint(U256::ZERO),
            ],
        );
        assert_eq!(old.signature, "exchange(int128,int128,uint256,uint256)");
        assert_eq!(old.selector(), hex!("3df02124"));
    }

    #[test]
    fn dynamic_arrays_use_unsized_type() {
        let call = ContractCall::new(
            POOL,
            "calc_token_amount",
            vec![
                CallArg::amounts(&[U256::from(1), U256::from(2)], true),
                CallArg::Bool(true),
            ],
        );
        assert_eq!(call.signature, "calc_token_amount(uint256[],bool)");
    }

    #[test]
    fn decode_u256_rejects_short_words() {
        assert!(decode_u256(&Bytes::from(vec![0u8; 31])).is_err());
        assert_eq!(decode_u256(&encode_u256(U256::from(7))).unwrap(), U256::from(7));
    }
}
