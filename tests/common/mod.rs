#![allow(dead_code)]

use alloy_primitives::{Address, Bytes, TxHash, U256, address, keccak256};
use async_trait::async_trait;
use curvelib::core::abi::{ContractCall, encode_u256};
use curvelib::core::coin::{Coin, NATIVE_COIN};
use curvelib::curve::capabilities::ImplementationId;
use curvelib::curve::descriptor::{LendingRate, PoolDescriptor};
use curvelib::{ChainTransport, CurveContext, CurveError, PoolRegistry, StaticDescriptors, StaticPrices};
use dashmap::DashMap;
use std::sync::{Arc, Mutex, Once};

pub const SIGNER: Address = address!("d8dA6BF26964aF9D7eEd9e03E53415D37aA96045");
pub const MULTICALL: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

pub const DAI: Address = address!("6B175474E89094C44Da98b954EedeAC495271d0F");
pub const USDC: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
pub const USDT: Address = address!("dAC17F958D2ee523a2206206994597C13D831ec7");
pub const WBTC: Address = address!("2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599");
pub const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
pub const MIM: Address = address!("99D8a9C45b2ecA8864373A26D1459e3Dff1e17F3");

pub const THREE_POOL: Address = address!("bEbc44782C7dB0a1A60Cb6fe97d0b483032FF1C7");
pub const THREE_POOL_LP: Address = address!("6c3F90f043a72FA612cbac8115EE7e52BDe6E490");
pub const THREE_POOL_GAUGE: Address = address!("bFcF63294aD7105dEa65aA58F8AE5BE2D9d0952A");

pub const AAVE: Address = address!("DeBF20617708857ebe4F679508E7b7863a8A8EeE");
pub const AAVE_LP: Address = address!("FD2a8fA60Abd58Efe3EeE34dd494cD491dC14900");
pub const ADAI: Address = address!("028171bCA77440897B824Ca71D1c56caC55b68A3");
pub const AUSDC: Address = address!("Bcca60bB61934080951369a648Fb03DF4F96263C");
pub const AUSDT: Address = address!("3Ed3B47Dd13EC9a98b44e6204A523E766B225811");

pub const COMPOUND: Address = address!("A2B47E3D5c44877cca798226B7B8118F9BFb7A56");
pub const COMPOUND_LP: Address = address!("845838DF265Dcd2c412A1Dc9e959c7d08537f8a2");
pub const COMPOUND_ZAP: Address = address!("eB21209ae4C2c9FF2a86ACA31E123764A3B6Bc06");
pub const CDAI: Address = address!("5d3a536E4D6DbD6114cc1Ead35777bAB948E3643");
pub const CUSDC: Address = address!("39AA39c021dfbaE8faC545936693aC917d5E7563");

pub const MIM_POOL: Address = address!("5a6A4D54456819380173272A5E8E9B9904BdF41B");
pub const META_ZAP: Address = address!("A79828DF1850E8a3A3064576f380D90aECDD3359");

pub const TRICRYPTO: Address = address!("D51a44d3FaE010294C616388b506AcdA1bfAAE46");
pub const TRICRYPTO_LP: Address = address!("c4AD29ba4B3c580e6D59105FFf484999997675Ff");

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

pub fn units(value: u64, decimals: u8) -> U256 {
    U256::from(value) * U256::from(10u64).pow(U256::from(decimals))
}

/// A transaction handed to [`FakeTransport::send`].
#[derive(Debug, Clone)]
pub struct SentTx {
    pub from: Address,
    pub call: ContractCall,
    pub gas_limit: u64,
}

/// In-memory chain. Reads are answered from canned values, matched first on
/// the exact calldata and then on the function signature; writes are
/// recorded and always confirm.
#[derive(Default)]
pub struct FakeTransport {
    exact: DashMap<(Address, Bytes), U256>,
    by_signature: DashMap<(Address, String), U256>,
    gas: DashMap<String, u64>,
    failing_estimates: DashMap<Bytes, ()>,
    l1_data_gas: Mutex<u64>,
    sent: Mutex<Vec<SentTx>>,
    read_batches: Mutex<Vec<usize>>,
    read_limit: Mutex<Option<usize>>,
}

impl FakeTransport {
    pub const DEFAULT_GAS: u64 = 100_000;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, call: &ContractCall, value: U256) {
        self.exact.insert((call.to, call.calldata.clone()), value);
    }

    pub fn respond_any(&self, to: Address, signature: &str, value: U256) {
        self.by_signature.insert((to, signature.to_string()), value);
    }

    pub fn set_gas(&self, signature: &str, gas: u64) {
        self.gas.insert(signature.to_string(), gas);
    }

    pub fn fail_estimate(&self, call: &ContractCall) {
        self.failing_estimates.insert(call.calldata.clone(), ());
    }

    pub fn set_l1_data_gas(&self, gas: u64) {
        *self.l1_data_gas.lock().unwrap() = gas;
    }

    /// Every coin of `coins` reports `balance` for the signer and `allowance`
    /// for any spender.
    pub fn fund(&self, coins: &[Coin], balance: U256, allowance: U256) {
        for coin in coins {
            if coin.is_native() {
                self.respond_any(MULTICALL, "getEthBalance(address)", balance);
            } else {
                self.respond_any(coin.address, "balanceOf(address)", balance);
                self.respond_any(coin.address, "allowance(address,address)", allowance);
            }
        }
    }

    /// Answer at most `limit` calls of every batch, like a node that drops
    /// results.
    pub fn truncate_reads(&self, limit: usize) {
        *self.read_limit.lock().unwrap() = Some(limit);
    }

    /// Size of every `read` batch so far.
    pub fn read_batches(&self) -> Vec<usize> {
        self.read_batches.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<SentTx> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_signatures(&self) -> Vec<String> {
        self.sent().into_iter().map(|tx| tx.call.signature).collect()
    }

    fn lookup(&self, call: &ContractCall) -> Option<U256> {
        self.exact
            .get(&(call.to, call.calldata.clone()))
            .map(|v| *v)
            .or_else(|| {
                self.by_signature
                    .get(&(call.to, call.signature.clone()))
                    .map(|v| *v)
            })
    }
}

#[async_trait]
impl ChainTransport for FakeTransport {
    async fn read(&self, calls: &[ContractCall]) -> Result<Vec<Bytes>, CurveError> {
        self.read_batches.lock().unwrap().push(calls.len());
        let limit = self.read_limit.lock().unwrap().unwrap_or(calls.len());
        calls
            .iter()
            .take(limit)
            .map(|call| {
                self.lookup(call)
                    .map(encode_u256)
                    .ok_or_else(|| CurveError::ProviderError(format!("no canned response for {call}")))
            })
            .collect()
    }

    async fn estimate_gas(&self, _from: Address, call: &ContractCall) -> Result<u64, CurveError> {
        if self.failing_estimates.contains_key(&call.calldata) {
            return Err(CurveError::ProviderError(format!("execution reverted: {call}")));
        }
        Ok(self
            .gas
            .get(&call.signature)
            .map(|g| *g)
            .unwrap_or(Self::DEFAULT_GAS))
    }

    async fn estimate_l1_data_gas(&self, _call: &ContractCall) -> Result<u64, CurveError> {
        Ok(*self.l1_data_gas.lock().unwrap())
    }

    async fn send(&self, from: Address, call: &ContractCall, gas_limit: u64) -> Result<TxHash, CurveError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(SentTx {
            from,
            call: call.clone(),
            gas_limit,
        });
        Ok(keccak256(sent.len().to_be_bytes()))
    }

    async fn wait_for_confirmation(&self, _hash: TxHash) -> Result<(), CurveError> {
        Ok(())
    }
}

fn descriptor(id: &str, swap: Address, lp: Address, underlying: Vec<Coin>, wrapped: Vec<Coin>) -> PoolDescriptor {
    PoolDescriptor {
        id: id.to_string(),
        name: id.to_string(),
        swap_address: swap,
        token_address: lp,
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

pub fn stables() -> Vec<Coin> {
    vec![
        Coin::new(DAI, "DAI", 18),
        Coin::new(USDC, "USDC", 6),
        Coin::new(USDT, "USDT", 6),
    ]
}

pub fn three_pool() -> PoolDescriptor {
    PoolDescriptor {
        gauge_address: Some(THREE_POOL_GAUGE),
        implementation: Some(ImplementationId::StableSwapV2),
        ..descriptor("3pool", THREE_POOL, THREE_POOL_LP, stables(), stables())
    }
}

pub fn aave() -> PoolDescriptor {
    let wrapped = vec![
        Coin::new(ADAI, "aDAI", 18),
        Coin::new(AUSDC, "aUSDC", 6),
        Coin::new(AUSDT, "aUSDT", 6),
    ];
    PoolDescriptor {
        use_lending: Some(vec![true; 3]),
        is_lending: true,
        implementation: Some(ImplementationId::AaveLending),
        ..descriptor("aave", AAVE, AAVE_LP, stables(), wrapped)
    }
}

pub fn compound() -> PoolDescriptor {
    let underlying = vec![Coin::new(DAI, "DAI", 18), Coin::new(USDC, "USDC", 6)];
    let wrapped = vec![Coin::new(CDAI, "cDAI", 8), Coin::new(CUSDC, "cUSDC", 8)];
    PoolDescriptor {
        deposit_address: Some(COMPOUND_ZAP),
        use_lending: Some(vec![true; 2]),
        lending_rate: LendingRate::ExchangeRateStored,
        is_lending: true,
        implementation: Some(ImplementationId::LegacyLending),
        ..descriptor("compound", COMPOUND, COMPOUND_LP, underlying, wrapped)
    }
}

/// Factory metapool on top of the aave pool, served by the shared zap.
pub fn mim_over_aave() -> PoolDescriptor {
    let mut underlying = vec![Coin::new(MIM, "MIM", 18)];
    underlying.extend(stables());
    let wrapped = vec![Coin::new(MIM, "MIM", 18), Coin::new(AAVE_LP, "a3CRV", 18)];
    PoolDescriptor {
        deposit_address: Some(META_ZAP),
        base_pool: Some("aave".to_string()),
        is_meta: true,
        is_factory: true,
        implementation: Some(ImplementationId::FactoryMeta),
        ..descriptor("factory-v2-11", MIM_POOL, MIM_POOL, underlying, wrapped)
    }
}

pub fn tricrypto() -> PoolDescriptor {
    let underlying = vec![
        Coin::new(USDT, "USDT", 6),
        Coin::new(WBTC, "WBTC", 8),
        Coin::new(NATIVE_COIN, "ETH", 18),
    ];
    let wrapped = vec![
        Coin::new(USDT, "USDT", 6),
        Coin::new(WBTC, "WBTC", 8),
        Coin::new(WETH, "WETH", 18),
    ];
    PoolDescriptor {
        is_crypto: true,
        implementation: Some(ImplementationId::CryptoV1),
        ..descriptor("tricrypto2", TRICRYPTO, TRICRYPTO_LP, underlying, wrapped)
    }
}

pub fn descriptors() -> StaticDescriptors {
    let source = StaticDescriptors::new();
    for d in [three_pool(), aave(), compound(), mim_over_aave(), tricrypto()] {
        source.insert(d).unwrap();
    }
    source
}

pub fn registry_on(
    chain_id: u64,
    transport: Arc<FakeTransport>,
) -> PoolRegistry<FakeTransport, StaticDescriptors> {
    registry_with(chain_id, transport, StaticPrices::new())
}

pub fn registry_with(
    chain_id: u64,
    transport: Arc<FakeTransport>,
    prices: StaticPrices,
) -> PoolRegistry<FakeTransport, StaticDescriptors> {
    init_tracing();
    let ctx = Arc::new(CurveContext::for_chain(chain_id, SIGNER).unwrap());
    PoolRegistry::new(ctx, transport, Arc::new(prices), Arc::new(descriptors()))
}

pub fn registry(transport: Arc<FakeTransport>) -> PoolRegistry<FakeTransport, StaticDescriptors> {
    registry_on(1, transport)
}

/// Last 32-byte word of the calldata, as a `uint256`.
pub fn last_word(call: &ContractCall) -> U256 {
    let data = &call.calldata;
    U256::from_be_slice(&data[data.len() - 32..])
}

/// Argument `index` of the calldata, as a `uint256`.
pub fn word(call: &ContractCall, index: usize) -> U256 {
    let start = 4 + 32 * index;
    U256::from_be_slice(&call.calldata[start..start + 32])
}
