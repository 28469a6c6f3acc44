use crate::context::CurveContext;
use crate::core::prices::PriceOracle;
use crate::core::transport::ChainTransport;
use crate::curve::descriptor::PoolDescriptor;
use crate::curve::pool::CurvePool;
use crate::errors::CurveError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use tracing::debug;

/// Source of pool descriptors, keyed by pool id.
#[async_trait]
pub trait DescriptorSource: Send + Sync {
    async fn descriptor(&self, pool_id: &str) -> Result<Arc<PoolDescriptor>, CurveError>;
}

/// In-memory descriptors, typically loaded from a JSON list.
#[derive(Debug, Default)]
pub struct StaticDescriptors {
    descriptors: DashMap<String, Arc<PoolDescriptor>>,
}

impl StaticDescriptors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, CurveError> {
        let list: Vec<PoolDescriptor> = serde_json::from_str(json)?;
        let source = Self::new();
        for descriptor in list {
            source.insert(descriptor)?;
        }
        Ok(source)
    }

    pub fn insert(&self, descriptor: PoolDescriptor) -> Result<(), CurveError> {
        descriptor.validate()?;
        self.descriptors
            .insert(descriptor.id.clone(), Arc::new(descriptor));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[async_trait]
impl DescriptorSource for StaticDescriptors {
    async fn descriptor(&self, pool_id: &str) -> Result<Arc<PoolDescriptor>, CurveError> {
        self.descriptors
            .get(pool_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CurveError::PoolNotFound(pool_id.to_string()))
    }
}

/// Assembles pools from their descriptors and keeps each one for the life of
/// the registry.
pub struct PoolRegistry<T: ?Sized, D: ?Sized> {
    ctx: Arc<CurveContext>,
    transport: Arc<T>,
    prices: Arc<dyn PriceOracle>,
    source: Arc<D>,
    pools: DashMap<String, Arc<CurvePool<T>>>,
}

impl<T: ?Sized, D: ?Sized> Debug for PoolRegistry<T, D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("PoolRegistry")
            .field("chain_id", &self.ctx.network.chain_id)
            .field("cached_pools", &self.pools.len())
            .finish_non_exhaustive()
    }
}

impl<T, D> PoolRegistry<T, D>
where
    T: ChainTransport + ?Sized,
    D: DescriptorSource + ?Sized,
{
    pub fn new(
        ctx: Arc<CurveContext>,
        transport: Arc<T>,
        prices: Arc<dyn PriceOracle>,
        source: Arc<D>,
    ) -> Self {
        Self {
            ctx,
            transport,
            prices,
            source,
            pools: DashMap::new(),
        }
    }

    pub fn context(&self) -> &Arc<CurveContext> {
        &self.ctx
    }

    pub async fn get_pool(&self, pool_id: &str) -> Result<Arc<CurvePool<T>>, CurveError> {
        if let Some(pool) = self.pools.get(pool_id) {
            return Ok(pool.clone());
        }

        debug!(pool = pool_id, "assembling pool from descriptor");
        let descriptor = self.source.descriptor(pool_id).await?;
        let base = match &descriptor.base_pool {
            Some(base_id) => Some(self.source.descriptor(base_id).await?),
            None => None,
        };
        let pool = Arc::new(CurvePool::new(
            descriptor,
            base,
            self.ctx.clone(),
            self.transport.clone(),
            self.prices.clone(),
        )?);

        // A concurrent caller may have won the race; keep the first pool.
        Ok(self
            .pools
            .entry(pool_id.to_string())
            .or_insert(pool)
            .clone())
    }

    pub fn cached(&self, pool_id: &str) -> Option<Arc<CurvePool<T>>> {
        self.pools.get(pool_id).map(|entry| entry.value().clone())
    }
}
