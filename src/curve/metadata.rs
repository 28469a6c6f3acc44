use crate::curve::capabilities::Capabilities;
use crate::curve::constants::KNOWN_HISTORICAL_ZAP;
use crate::curve::descriptor::PoolDescriptor;
use crate::errors::CurveError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Archetype flags of a pool, derived once from its descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PoolFlags {
    /// Underlying and wrapped coins coincide; there are no wrapped operations.
    pub is_plain: bool,
    pub is_lending: bool,
    pub is_meta: bool,
    pub is_crypto: bool,
    pub is_fake: bool,
    pub is_factory: bool,
    pub is_meta_factory: bool,
    pub is_ng: bool,
    /// Tracked apart from `is_meta`: legacy lending pools have zaps too.
    pub has_zap: bool,
}

/// Everything the strategy selection needs to know about a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolMetadata {
    pub flags: PoolFlags,
    pub base_flags: Option<PoolFlags>,
    pub capabilities: Capabilities,
}

impl PoolMetadata {
    pub fn base_is_lending(&self) -> bool {
        self.base_flags.is_some_and(|f| f.is_lending)
    }

    pub fn base_is_fake(&self) -> bool {
        self.base_flags.is_some_and(|f| f.is_fake)
    }
}

pub struct PoolMetadataResolver;

impl PoolMetadataResolver {
    pub fn flags(descriptor: &PoolDescriptor) -> PoolFlags {
        let is_lending = match &descriptor.use_lending {
            Some(per_coin) => per_coin.iter().any(|&lending| lending),
            None => descriptor.is_lending,
        };
        let same_coins = descriptor.underlying_coins.len() == descriptor.wrapped_coins.len()
            && descriptor
                .underlying_coins
                .iter()
                .zip(&descriptor.wrapped_coins)
                .all(|(u, w)| u.address == w.address);

        PoolFlags {
            is_plain: !descriptor.is_meta && !is_lending && same_coins,
            is_lending,
            is_meta: descriptor.is_meta,
            is_crypto: descriptor.is_crypto,
            is_fake: descriptor.is_fake,
            is_factory: descriptor.is_factory,
            is_meta_factory: (descriptor.is_meta && descriptor.is_factory)
                || descriptor.deposit_address == Some(KNOWN_HISTORICAL_ZAP),
            is_ng: descriptor.is_ng,
            has_zap: descriptor.deposit_address.is_some(),
        }
    }

    /// `base` must be the descriptor of the base pool when `descriptor` is a
    /// metapool.
    pub fn resolve(
        descriptor: &PoolDescriptor,
        base: Option<&PoolDescriptor>,
    ) -> Result<PoolMetadata, CurveError> {
        let flags = Self::flags(descriptor);
        let base_flags = match (&descriptor.base_pool, base) {
            (Some(expected), Some(base)) if *expected == base.id => Some(Self::flags(base)),
            (Some(expected), Some(base)) => {
                return Err(CurveError::ConfigError(format!(
                    "{}: base pool is {expected}, got {}",
                    descriptor.id, base.id
                )));
            }
            (Some(expected), None) => {
                return Err(CurveError::PoolNotFound(format!(
                    "{expected} (base pool of {})",
                    descriptor.id
                )));
            }
            (None, _) => None,
        };
        let capabilities = Capabilities::resolve(descriptor);
        debug!(pool = %descriptor.id, ?flags, "resolved pool metadata");
        Ok(PoolMetadata {
            flags,
            base_flags,
            capabilities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coin::Coin;
    use crate::curve::descriptor::LendingRate;
    use alloy_primitives::{Address, address};

    const DAI: Address = address!("6B175474E89094C44Da98b954EedeAC495271d0F");
    const ADAI: Address = address!("028171bCA77440897B824Ca71D1c56caC55b68A3");

    fn descriptor(id: &str, underlying: Vec<Coin>, wrapped: Vec<Coin>) -> PoolDescriptor {
        PoolDescriptor {
            id: id.to_string(),
            name: id.to_string(),
            swap_address: Address::repeat_byte(0x11),
            token_address: Address::repeat_byte(0x12),
            gauge_address: None,
            deposit_address: None,
            underlying_coins: underlying,
            wrapped_coins: wrapped,
            base_pool: None,
            use_lending: None,
            lending_rate: LendingRate::OneToOne,
            reward_tokens: Vec::new(),
            is_lending: false,
            is_meta: false,
            is_crypto: false,
            is_fake: false,
            is_factory: false,
            is_ng: false,
            implementation: None,
            abi: None,
        }
    }

    #[test]
    fn all_false_lending_flags_are_not_lending() {
        let dai = Coin::new(DAI, "DAI", 18);
        let mut d = descriptor("plainish", vec![dai.clone()], vec![dai]);
        d.is_lending = true;
        d.use_lending = Some(vec![false]);

        let flags = PoolMetadataResolver::flags(&d);
        assert!(!flags.is_lending);
        assert!(flags.is_plain);
    }

    #[test]
    fn lending_pool_is_not_plain() {
        let mut d = descriptor(
            "aave",
            vec![Coin::new(DAI, "DAI", 18)],
            vec![Coin::new(ADAI, "aDAI", 18)],
        );
        d.use_lending = Some(vec![true]);

        let flags = PoolMetadataResolver::flags(&d);
        assert!(flags.is_lending);
        assert!(!flags.is_plain);
        assert!(!flags.has_zap);
    }

    #[test]
    fn historical_zap_marks_meta_factory() {
        let dai = Coin::new(DAI, "DAI", 18);
        let mut d = descriptor("legacy", vec![dai.clone()], vec![dai]);
        d.deposit_address = Some(KNOWN_HISTORICAL_ZAP);

        let flags = PoolMetadataResolver::flags(&d);
        assert!(flags.is_meta_factory);
        assert!(flags.has_zap);
        assert!(!flags.is_meta);
    }

    #[test]
    fn meta_and_factory_mark_meta_factory() {
        let dai = Coin::new(DAI, "DAI", 18);
        let mut d = descriptor("factory-v2-1", vec![dai.clone()], vec![dai]);
        d.is_meta = true;
        assert!(!PoolMetadataResolver::flags(&d).is_meta_factory);

        d.is_factory = true;
        assert!(PoolMetadataResolver::flags(&d).is_meta_factory);
    }

    #[test]
    fn missing_base_descriptor_is_reported() {
        let dai = Coin::new(DAI, "DAI", 18);
        let mut d = descriptor("factory-v2-1", vec![dai.clone()], vec![dai]);
        d.is_meta = true;
        d.base_pool = Some("3pool".to_string());

        let err = PoolMetadataResolver::resolve(&d, None).unwrap_err();
        assert!(matches!(err, CurveError::PoolNotFound(_)));

        let other = descriptor("aave", Vec::new(), Vec::new());
        let err = PoolMetadataResolver::resolve(&d, Some(&other)).unwrap_err();
        assert!(matches!(err, CurveError::ConfigError(_)));
    }
}
