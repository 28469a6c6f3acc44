use crate::curve::strategies::OperationFamily;
use alloy_primitives::{Address, U256, address};

pub const PRECISION: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]); // 10^18

/// Shared 3pool zap used by factory metapools before the factory tracked
/// zaps itself. Pools pointing at it are treated as meta-factory pools.
pub const KNOWN_HISTORICAL_ZAP: Address = address!("A79828DF1850E8a3A3064576f380D90aECDD3359");

/// The sUSD pool lists a zap, but its swap contract handles underlying
/// coins directly.
pub const LEGACY_ZAP_EXCLUDED_POOL: &str = "susd";

// Gas multipliers for legacy pool/network/operation combinations whose node
// estimates are known to undershoot. Basis points.
const GAS_MULTIPLIER_OVERRIDES: &[(u64, &str, OperationFamily, u32)] = &[
    (1, "compound", OperationFamily::WithdrawOneCoin, 20_000),
    (1, "usdt", OperationFamily::WithdrawOneCoin, 20_000),
    (1, "y", OperationFamily::WithdrawOneCoin, 16_000),
    (1, "busd", OperationFamily::WithdrawOneCoin, 16_000),
    (1, "pax", OperationFamily::WithdrawOneCoin, 16_000),
    (137, "ren", OperationFamily::Swap, 16_000),
    (137, "ren", OperationFamily::Deposit, 16_000),
    (250, "ib", OperationFamily::Swap, 16_000),
];

pub fn gas_multiplier_override(chain_id: u64, pool_id: &str, family: OperationFamily) -> Option<u32> {
    GAS_MULTIPLIER_OVERRIDES
        .iter()
        .find(|(chain, id, f, _)| *chain == chain_id && *id == pool_id && *f == family)
        .map(|(.., bp)| *bp)
}
